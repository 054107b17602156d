//! Adapter configuration as the host supplies it.
//!
//! Every field is optional; [`crate::models::policy::PathPolicy::new`] applies
//! defaults and validates the combination.

use serde::Deserialize;
use std::{fmt, str::FromStr};

/// How the stored file name is derived from an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilenameStrategy {
    /// Keep the uploaded name.
    Original,
    /// `name-<hash>ext`
    #[serde(alias = "originalHash")]
    OriginalHash,
    /// `<hash>ext`
    Hash,
    /// `name-<random>ext`
    Unique,
    /// `<salted hash>ext`
    #[serde(alias = "hashUnique")]
    HashUnique,
    /// `<random>ext`
    Random,
    /// Let the host pick a unique path.
    #[serde(alias = "ghost")]
    Delegate,
    /// Expand the configured template.
    Custom,
}

/// Digest used by the hash-based strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            other => Err(format!("unsupported hash algorithm `{other}`")),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        };
        f.write_str(name)
    }
}

/// Raw option bag, deserializable from the host's adapter config block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdapterOptions {
    pub bucket: Option<String>,
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub prefix: Option<String>,
    #[serde(rename = "type")]
    pub asset_type: Option<String>,
    #[serde(alias = "virtual")]
    pub virtual_hosted: Option<bool>,
    #[serde(alias = "addPrefixToUrl")]
    pub add_prefix_to_url: Option<bool>,
    pub passthrough: Option<bool>,
    pub signed: Option<bool>,
    /// Signed URL lifetime in milliseconds.
    #[serde(alias = "expires")]
    pub expires_ms: Option<i64>,
    /// Selects a hash-based default when `filename` is unset.
    pub hash: Option<bool>,
    #[serde(alias = "filename")]
    pub filename_strategy: Option<FilenameStrategy>,
    pub template: Option<String>,
    pub hash_algorithm: Option<String>,
    pub hash_length: Option<usize>,
    pub lowercase: Option<bool>,
    #[serde(alias = "deburr", alias = "asciiFolding")]
    pub strip_diacritics: Option<bool>,
    pub content_path: Option<String>,
}

impl AdapterOptions {
    pub fn with_bucket(bucket: impl Into<String>) -> Self {
        Self {
            bucket: Some(bucket.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_host_config_block() {
        let opts: AdapterOptions = serde_json::from_str(
            r#"{
                "bucket": "my-bucket",
                "prefix": "ghost",
                "virtual": false,
                "filename": "ghost",
                "deburr": false,
                "expires": 3600000,
                "hashAlgorithm": "sha256",
                "type": "media"
            }"#,
        )
        .unwrap();

        assert_eq!(opts.bucket.as_deref(), Some("my-bucket"));
        assert_eq!(opts.virtual_hosted, Some(false));
        assert_eq!(opts.filename_strategy, Some(FilenameStrategy::Delegate));
        assert_eq!(opts.strip_diacritics, Some(false));
        assert_eq!(opts.expires_ms, Some(3_600_000));
        assert_eq!(opts.asset_type.as_deref(), Some("media"));
        assert_eq!(opts.hash_algorithm.as_deref(), Some("sha256"));
    }

    #[test]
    fn parses_strategy_names() {
        let parsed: Vec<FilenameStrategy> = serde_json::from_str(
            r#"["original","originalhash","hash","unique","hashunique","random","delegate","custom"]"#,
        )
        .unwrap();
        assert_eq!(parsed.len(), 8);
        assert_eq!(parsed[1], FilenameStrategy::OriginalHash);
        assert_eq!(parsed[4], FilenameStrategy::HashUnique);
    }

    #[test]
    fn parses_hash_algorithms() {
        assert_eq!("MD5".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Md5));
        assert_eq!("sha-256".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha256));
        assert!("crc32".parse::<HashAlgorithm>().is_err());
    }
}
