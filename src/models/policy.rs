//! Resolved adapter configuration.

use crate::{
    errors::{AdapterError, AdapterResult},
    models::options::{AdapterOptions, FilenameStrategy, HashAlgorithm},
    services::sanitize::{SanitizeOptions, sanitize},
};
use chrono::{TimeDelta, Utc};

pub const DEFAULT_HOST: &str = "storage.googleapis.com";
pub const DEFAULT_PROTOCOL: &str = "https";
pub const DEFAULT_TYPE: &str = "images";
pub const DEFAULT_CONTENT_PATH: &str = "content";
pub const DEFAULT_HASH_LENGTH: usize = 16;
/// 24 hours.
pub const DEFAULT_EXPIRES_MS: i64 = 24 * 60 * 60 * 1000;

/// Content types the host exposes below its content path.
pub const CONTENT_TYPES: [&str; 9] = [
    "images", "media", "files", "themes", "adapters", "logs", "data", "settings", "public",
];

/// Immutable, validated configuration shared by every [`crate::models::file_ref::FileRef`]
/// an adapter creates.
#[derive(Debug, Clone)]
pub struct PathPolicy {
    pub bucket: String,
    pub protocol: String,
    /// Object-store host; `bucket.storage.googleapis.com` when virtual-hosted.
    pub host: String,
    pub prefix: String,
    pub asset_type: String,
    pub virtual_hosted: bool,
    /// The bucket is rendered as the first path segment of absolute URLs.
    pub add_bucket_to_path: bool,
    /// The prefix is rendered in URLs; object keys always carry it.
    pub add_prefix_to_url: bool,
    pub passthrough: bool,
    pub signed: bool,
    pub expires_ms: i64,
    pub filename_strategy: FilenameStrategy,
    pub template: Option<String>,
    pub hash_algorithm: HashAlgorithm,
    pub hash_length: usize,
    pub sanitize_options: SanitizeOptions,
    pub content_path: String,
}

impl PathPolicy {
    /// Apply defaults to `opts`, derive the addressing flags and validate.
    pub fn new(opts: AdapterOptions) -> AdapterResult<Self> {
        let bucket = opts
            .bucket
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .ok_or_else(|| AdapterError::configuration("bucket is required"))?;

        let filename_strategy = match opts.filename_strategy {
            Some(strategy) => strategy,
            None if opts.hash.unwrap_or(false) => FilenameStrategy::Hash,
            None => FilenameStrategy::Original,
        };
        let template = opts.template.filter(|t| !t.is_empty());
        if filename_strategy == FilenameStrategy::Custom && template.is_none() {
            return Err(AdapterError::configuration(
                "template is required for the custom filename strategy",
            ));
        }

        let hash_algorithm = opts
            .hash_algorithm
            .as_deref()
            .unwrap_or("md5")
            .parse::<HashAlgorithm>()
            .map_err(AdapterError::Configuration)?;
        let hash_length = opts.hash_length.unwrap_or(DEFAULT_HASH_LENGTH);
        if hash_length == 0 {
            return Err(AdapterError::configuration("hashLength must be greater than 0"));
        }
        let expires_ms = opts.expires_ms.unwrap_or(DEFAULT_EXPIRES_MS);
        if expires_ms <= 0 {
            return Err(AdapterError::configuration("expires must be greater than 0"));
        }
        if TimeDelta::try_milliseconds(expires_ms)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .is_none()
        {
            return Err(AdapterError::configuration(format!(
                "expires of {expires_ms}ms is out of range"
            )));
        }

        let asset_type = opts
            .asset_type
            .map(|t| trim_slashes(&t).to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TYPE.to_string());
        if !CONTENT_TYPES.contains(&asset_type.as_str()) {
            return Err(AdapterError::configuration(format!(
                "invalid content type `{asset_type}`"
            )));
        }

        let virtual_hosted = opts.virtual_hosted.unwrap_or(true);
        let signed = opts.signed.unwrap_or(false);
        let mut host = opts
            .host
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let mut add_prefix_to_url = opts.add_prefix_to_url.unwrap_or(false);
        let mut add_bucket_to_path = false;

        if host == DEFAULT_HOST {
            add_prefix_to_url = true;
            if virtual_hosted {
                host = format!("{bucket}.{DEFAULT_HOST}");
            } else {
                add_bucket_to_path = true;
            }
        }
        if signed {
            add_prefix_to_url = true;
            if !virtual_hosted {
                add_bucket_to_path = true;
            }
        }

        Ok(Self {
            bucket,
            protocol: opts
                .protocol
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| DEFAULT_PROTOCOL.to_string()),
            host,
            prefix: opts
                .prefix
                .map(|p| trim_slashes(&p).to_string())
                .unwrap_or_default(),
            asset_type,
            virtual_hosted,
            add_bucket_to_path,
            add_prefix_to_url,
            passthrough: opts.passthrough.unwrap_or(true),
            signed,
            expires_ms,
            filename_strategy,
            template,
            hash_algorithm,
            hash_length,
            sanitize_options: SanitizeOptions {
                lowercase: opts.lowercase.unwrap_or(true),
                strip_diacritics: opts.strip_diacritics.unwrap_or(true),
            },
            content_path: opts
                .content_path
                .map(|c| trim_slashes(&c).to_string())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_CONTENT_PATH.to_string()),
        })
    }

    pub fn sanitize(&self, input: &str) -> String {
        sanitize(input, self.sanitize_options)
    }

    /// Prefix segment as rendered in URLs, if any.
    pub fn url_prefix(&self) -> Option<&str> {
        (self.add_prefix_to_url && !self.prefix.is_empty()).then_some(self.prefix.as_str())
    }

    /// `/{content_path}/{type}/`, the host route passthrough URLs live under.
    pub fn content_route(&self) -> String {
        format!("/{}/{}/", self.content_path, self.asset_type)
    }
}

fn trim_slashes(s: &str) -> &str {
    s.trim_matches(|c| c == '/' || c == '\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(f: impl FnOnce(&mut AdapterOptions)) -> AdapterResult<PathPolicy> {
        let mut opts = AdapterOptions::with_bucket("bucket");
        f(&mut opts);
        PathPolicy::new(opts)
    }

    #[test]
    fn applies_defaults() {
        let p = policy(|_| {}).unwrap();
        assert_eq!(p.protocol, "https");
        assert_eq!(p.host, "bucket.storage.googleapis.com");
        assert_eq!(p.prefix, "");
        assert_eq!(p.asset_type, "images");
        assert!(p.virtual_hosted);
        assert!(p.passthrough);
        assert!(!p.signed);
        assert_eq!(p.expires_ms, DEFAULT_EXPIRES_MS);
        assert_eq!(p.filename_strategy, FilenameStrategy::Original);
        assert_eq!(p.hash_algorithm, HashAlgorithm::Md5);
        assert_eq!(p.hash_length, 16);
        assert_eq!(p.content_path, "content");
        assert_eq!(p.content_route(), "/content/images/");
    }

    #[test]
    fn hash_flag_selects_hash_strategy() {
        let p = policy(|o| o.hash = Some(true)).unwrap();
        assert_eq!(p.filename_strategy, FilenameStrategy::Hash);

        let p = policy(|o| {
            o.hash = Some(true);
            o.filename_strategy = Some(FilenameStrategy::Unique);
        })
        .unwrap();
        assert_eq!(p.filename_strategy, FilenameStrategy::Unique);
    }

    #[test]
    fn default_host_shows_prefix_and_embeds_bucket() {
        let p = policy(|o| o.prefix = Some("/ghost/".into())).unwrap();
        assert_eq!(p.prefix, "ghost");
        assert!(p.add_prefix_to_url);
        assert!(!p.add_bucket_to_path);
        assert_eq!(p.url_prefix(), Some("ghost"));
    }

    #[test]
    fn path_style_puts_bucket_in_path() {
        let p = policy(|o| o.virtual_hosted = Some(false)).unwrap();
        assert_eq!(p.host, DEFAULT_HOST);
        assert!(p.add_bucket_to_path);
        assert!(p.add_prefix_to_url);
    }

    #[test]
    fn custom_host_hides_prefix_unless_asked() {
        let p = policy(|o| {
            o.host = Some("cdn.example.com".into());
            o.prefix = Some("ghost".into());
        })
        .unwrap();
        assert_eq!(p.host, "cdn.example.com");
        assert!(!p.add_prefix_to_url);
        assert!(!p.add_bucket_to_path);
        assert_eq!(p.url_prefix(), None);
    }

    #[test]
    fn signed_forces_prefix_and_path_style_bucket() {
        let p = policy(|o| {
            o.host = Some("cdn.example.com".into());
            o.signed = Some(true);
            o.virtual_hosted = Some(false);
        })
        .unwrap();
        assert!(p.add_prefix_to_url);
        assert!(p.add_bucket_to_path);
    }

    #[test]
    fn rejects_invalid_configuration() {
        assert!(matches!(
            PathPolicy::new(AdapterOptions::default()),
            Err(AdapterError::Configuration(_))
        ));
        assert!(matches!(
            policy(|o| o.bucket = Some("  ".into())),
            Err(AdapterError::Configuration(_))
        ));
        assert!(matches!(
            policy(|o| o.filename_strategy = Some(FilenameStrategy::Custom)),
            Err(AdapterError::Configuration(_))
        ));
        assert!(matches!(
            policy(|o| o.hash_length = Some(0)),
            Err(AdapterError::Configuration(_))
        ));
        assert!(matches!(
            policy(|o| o.expires_ms = Some(0)),
            Err(AdapterError::Configuration(_))
        ));
        assert!(matches!(
            policy(|o| o.hash_algorithm = Some("crc32".into())),
            Err(AdapterError::Configuration(_))
        ));
        assert!(matches!(
            policy(|o| o.asset_type = Some("videos".into())),
            Err(AdapterError::Configuration(_))
        ));
    }

    #[test]
    fn expiry_beyond_the_calendar_is_rejected() {
        assert!(matches!(
            policy(|o| {
                o.signed = Some(true);
                o.expires_ms = Some(10_000_000_000_000_000);
            }),
            Err(AdapterError::Configuration(_))
        ));
        assert!(matches!(
            policy(|o| o.expires_ms = Some(i64::MAX)),
            Err(AdapterError::Configuration(_))
        ));
        // a century is long but representable
        let p = policy(|o| o.expires_ms = Some(100 * 365 * 24 * 60 * 60 * 1000)).unwrap();
        assert_eq!(p.expires_ms, 3_153_600_000_000);
    }
}
