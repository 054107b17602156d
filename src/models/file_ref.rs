//! Per-operation file reference.
//!
//! A [`FileRef`] maps one host-side input (a path, an uploaded file or a
//! served URL) onto `{dir, base}` below the policy's fixed segments, and
//! renders it back out as an object key or one of the served URL shapes.
//!
//! Rendered shapes, with `[..]` optional per policy flags:
//!
//! ```text
//! relative     prefix/type/dir/base
//! absolute     protocol://host/[bucket]/[prefix]/type/dir/base
//! passthrough  /content/type/[prefix]/dir/base
//! ```
//!
//! Parsing strips exactly the leading segments the matching renderer adds.

use crate::{
    errors::{AdapterError, AdapterResult},
    models::policy::PathPolicy,
    services::host::{FileRecord, HostContext},
};
use serde::Deserialize;
use std::{collections::BTreeMap, path::PathBuf};

/// An uploaded file as handed over by the host.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileDescriptor {
    /// Original file name, e.g. `logo.png`.
    pub name: String,
    /// Local temp file holding the bytes.
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub ext: Option<String>,
    /// Any further fields (`mimetype`, `originalname`, ...), usable in templates.
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl FileDescriptor {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: Some(path.into()),
            ..Self::default()
        }
    }
}

/// How a [`FileRef`] was built; selects the segment-stripping rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Path,
    File,
    Url,
}

#[derive(Debug, Clone)]
pub struct FileRef<'a> {
    pub(crate) policy: &'a PathPolicy,
    pub(crate) name: String,
    pub(crate) ext: String,
    pub(crate) base: String,
    pub(crate) dir: Vec<String>,
    pub(crate) local_path: Option<PathBuf>,
    pub(crate) computed: Option<String>,
    pub(crate) fields: BTreeMap<String, String>,
}

/// `{dir, base, name, ext}` of a `/`-separated path.
#[derive(Debug, PartialEq, Eq)]
struct PathParts<'p> {
    dir: &'p str,
    base: &'p str,
    name: &'p str,
    ext: &'p str,
}

fn parse_path(path: &str) -> PathParts<'_> {
    let trimmed = path.trim_end_matches('/');
    let (dir, base) = match trimmed.rfind('/') {
        Some(0) => ("/", &trimmed[1..]),
        Some(idx) => (&trimmed[..idx], &trimmed[idx + 1..]),
        None => ("", trimmed),
    };
    let ext = extension(base);
    PathParts {
        dir,
        base,
        name: &base[..base.len() - ext.len()],
        ext,
    }
}

/// Extension including the dot; empty for dotfiles and names without one.
fn extension(base: &str) -> &str {
    match base.rfind('.') {
        Some(idx) if idx > 0 => &base[idx..],
        _ => "",
    }
}

fn split_segments(path: &str) -> Vec<String> {
    path.split(['/', '\\'])
        .filter(|seg| !seg.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join path pieces with single slashes, dropping empty segments.
pub(crate) fn join<'s>(parts: impl IntoIterator<Item = &'s str>) -> String {
    parts
        .into_iter()
        .flat_map(|part| part.split(['/', '\\']))
        .filter(|seg| !seg.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

impl<'a> FileRef<'a> {
    fn build(
        policy: &'a PathPolicy,
        host: &dyn HostContext,
        name: &str,
        ext: Option<&str>,
        base: Option<&str>,
        dir: &str,
        source: Source,
    ) -> Self {
        let ext = ext
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| extension(name).to_string());
        let (name, base) = match base {
            Some(base) => (name.to_string(), base.to_string()),
            None => (
                name.strip_suffix(ext.as_str()).unwrap_or(name).to_string(),
                name.to_string(),
            ),
        };
        let dir = if dir.is_empty() {
            split_segments(&host.target_dir())
        } else {
            strip_known_segments(policy, split_segments(dir), source)
        };

        Self {
            policy,
            name,
            ext,
            base,
            dir,
            local_path: None,
            computed: None,
            fields: BTreeMap::new(),
        }
    }

    /// Reference an existing object by path, e.g. `/size/w1000/2025/05/logo.png`.
    ///
    /// `dir` overrides the directory parsed out of `path`.
    pub fn from_path(
        policy: &'a PathPolicy,
        host: &dyn HostContext,
        path: &str,
        dir: Option<&str>,
    ) -> AdapterResult<Self> {
        if path.trim().is_empty() {
            return Err(AdapterError::invalid_input("path is required"));
        }
        let parts = parse_path(path);
        if parts.base.is_empty() {
            return Err(AdapterError::invalid_input(format!("path `{path}` names no file")));
        }
        let dir = dir.filter(|d| !d.is_empty()).unwrap_or(parts.dir);
        Ok(Self::build(
            policy,
            host,
            parts.name,
            Some(parts.ext),
            Some(parts.base),
            dir,
            Source::Path,
        ))
    }

    /// Reference an upload, e.g. `{ name: "logo.png", path: "/tmp/1dcfb587..." }`.
    ///
    /// Without `dir` the host's current target directory is used.
    pub fn from_file(
        policy: &'a PathPolicy,
        host: &dyn HostContext,
        file: &FileDescriptor,
        dir: Option<&str>,
    ) -> AdapterResult<Self> {
        if file.name.trim().is_empty() {
            return Err(AdapterError::invalid_input("file name is required"));
        }
        let mut file_ref = Self::build(
            policy,
            host,
            &file.name,
            file.ext.as_deref(),
            None,
            dir.unwrap_or_default(),
            Source::File,
        );
        file_ref.local_path = file.path.clone();
        file_ref.fields = file
            .fields
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), value)
            })
            .collect();
        Ok(file_ref)
    }

    /// Reference an object by a URL previously returned from `serve()`.
    ///
    /// Accepts absolute URLs (`https://bucket.storage.googleapis.com/...`,
    /// `http://localhost:2368/content/images/...`) and bare serve paths
    /// (`/content/images/2025/05/logo.png`).
    pub fn from_url(
        policy: &'a PathPolicy,
        host: &dyn HostContext,
        url: &str,
    ) -> AdapterResult<Self> {
        if url.trim().is_empty() {
            return Err(AdapterError::invalid_input("url is required"));
        }
        let without_query = url.split(['?', '#']).next().unwrap_or_default();
        let path = match without_query.split_once("://") {
            Some((_, rest)) => rest.find('/').map(|idx| &rest[idx..]).unwrap_or("/"),
            None => without_query,
        };
        let parts = parse_path(path);
        if parts.base.is_empty() {
            return Err(AdapterError::invalid_input(format!("url `{url}` names no file")));
        }
        // Serve URLs always carry a directory; never fall back to the target dir.
        let dir = if parts.dir.is_empty() { "/" } else { parts.dir };
        Ok(Self::build(
            policy,
            host,
            parts.name,
            Some(parts.ext),
            Some(parts.base),
            dir,
            Source::Url,
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ext(&self) -> &str {
        &self.ext
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn dir(&self) -> String {
        self.dir.join("/")
    }

    pub fn local_path(&self) -> Option<&PathBuf> {
        self.local_path.as_ref()
    }

    pub fn computed(&self) -> Option<&str> {
        self.computed.as_deref()
    }

    /// Final base name: the computed name once resolved, else the original.
    pub fn file_name(&self) -> &str {
        self.computed.as_deref().unwrap_or(&self.base)
    }

    /// Fields exposed to templates and to the host's unique-path hook.
    pub fn record(&self) -> FileRecord {
        FileRecord {
            name: self.name.clone(),
            base: self.base.clone(),
            ext: self.ext.clone(),
            dir: self.dir(),
            path: self.local_path.clone(),
            fields: self.fields.clone(),
        }
    }

    /// Object key: `prefix/type/dir/name`. The prefix is always present.
    pub fn relative(&self) -> String {
        let p = self.policy;
        let dir = self.dir();
        p.sanitize(&join([
            p.prefix.as_str(),
            p.asset_type.as_str(),
            dir.as_str(),
            self.file_name(),
        ]))
    }

    /// Direct object-store URL.
    pub fn absolute(&self) -> String {
        let p = self.policy;
        let dir = self.dir();
        let mut parts = vec![p.host.as_str()];
        if p.add_bucket_to_path {
            parts.push(&p.bucket);
        }
        if let Some(prefix) = p.url_prefix() {
            parts.push(prefix);
        }
        parts.extend([p.asset_type.as_str(), dir.as_str(), self.file_name()]);
        p.sanitize(&format!("{}://{}", p.protocol, join(parts)))
    }

    /// Host-relative URL below the host's content route.
    pub fn passthrough(&self) -> String {
        let p = self.policy;
        let dir = self.dir();
        let mut parts = vec![p.content_path.as_str(), p.asset_type.as_str()];
        if let Some(prefix) = p.url_prefix() {
            parts.push(prefix);
        }
        parts.extend([dir.as_str(), self.file_name()]);
        p.sanitize(&format!("/{}", join(parts)))
    }
}

/// Drop leading segments that the renderers add around `dir`.
///
/// Passthrough-shaped input (content root first, or any non-URL input while
/// passthrough is on) strips `content`, `type`, `prefix`; object-store shaped
/// input strips `bucket`, `prefix`, `type`. Each step applies only when the
/// segment is present.
fn strip_known_segments(policy: &PathPolicy, mut dir: Vec<String>, source: Source) -> Vec<String> {
    let url_prefix = policy.url_prefix();
    let passthrough_shape = starts_with(policy, &dir, &policy.content_path)
        || (policy.passthrough && source != Source::Url);

    if passthrough_shape {
        strip_leading(policy, &mut dir, &policy.content_path);
        strip_leading(policy, &mut dir, &policy.asset_type);
        if let Some(prefix) = url_prefix {
            strip_leading(policy, &mut dir, prefix);
        }
    } else {
        if policy.add_bucket_to_path {
            strip_leading(policy, &mut dir, &policy.bucket);
        }
        if let Some(prefix) = url_prefix {
            strip_leading(policy, &mut dir, prefix);
        }
        strip_leading(policy, &mut dir, &policy.asset_type);
    }
    dir
}

/// `dir` begins with the (possibly multi-segment) `value`, raw or sanitized.
fn starts_with(policy: &PathPolicy, dir: &[String], value: &str) -> bool {
    leading_len(policy, dir, value).is_some()
}

fn leading_len(policy: &PathPolicy, dir: &[String], value: &str) -> Option<usize> {
    let raw = split_segments(value);
    let clean = split_segments(&policy.sanitize(value));
    [raw, clean].into_iter().find_map(|segs| {
        let matches = !segs.is_empty()
            && dir.len() >= segs.len()
            && dir.iter().zip(&segs).all(|(a, b)| a == b);
        matches.then_some(segs.len())
    })
}

fn strip_leading(policy: &PathPolicy, dir: &mut Vec<String>, value: &str) {
    if let Some(len) = leading_len(policy, dir, value) {
        dir.drain(..len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::options::AdapterOptions;

    struct FixedHost;

    impl HostContext for FixedHost {
        fn target_dir(&self) -> String {
            "2025/05".into()
        }

        fn unique_file_path(&self, file: &FileRecord, dir: &str) -> String {
            format!("{dir}/{}", file.name)
        }
    }

    fn policy(f: impl FnOnce(&mut AdapterOptions)) -> PathPolicy {
        let mut opts = AdapterOptions::with_bucket("bucket");
        f(&mut opts);
        PathPolicy::new(opts).unwrap()
    }

    #[test]
    fn parses_paths_like_posix() {
        assert_eq!(
            parse_path("/size/w1000/2025/05/logo.png"),
            PathParts {
                dir: "/size/w1000/2025/05",
                base: "logo.png",
                name: "logo",
                ext: ".png"
            }
        );
        assert_eq!(parse_path("archive.tar.gz").ext, ".gz");
        assert_eq!(parse_path("/.htaccess").ext, "");
        assert_eq!(parse_path("/.htaccess").dir, "/");
        assert_eq!(parse_path("README").name, "README");
    }

    #[test]
    fn from_path_uses_parsed_dir() {
        let p = policy(|_| {});
        let file = FileRef::from_path(&p, &FixedHost, "2024/01/logo.png", None).unwrap();
        assert_eq!(file.dir(), "2024/01");
        assert_eq!(file.relative(), "images/2024/01/logo.png");
    }

    #[test]
    fn from_path_explicit_dir_and_target_dir_fallback() {
        let p = policy(|_| {});
        let file = FileRef::from_path(&p, &FixedHost, "logo.png", Some("2023/12")).unwrap();
        assert_eq!(file.relative(), "images/2023/12/logo.png");

        let file = FileRef::from_path(&p, &FixedHost, "logo.png", None).unwrap();
        assert_eq!(file.relative(), "images/2025/05/logo.png");
    }

    #[test]
    fn from_path_strips_passthrough_segments() {
        let p = policy(|_| {});
        let file =
            FileRef::from_path(&p, &FixedHost, "/content/images/2025/05/logo.png", None).unwrap();
        assert_eq!(file.relative(), "images/2025/05/logo.png");
    }

    #[test]
    fn from_file_defaults_to_target_dir() {
        let p = policy(|_| {});
        let upload = FileDescriptor::new("Team Photo.JPG", "/tmp/1dcfb587");
        let file = FileRef::from_file(&p, &FixedHost, &upload, None).unwrap();
        assert_eq!(file.name(), "Team Photo");
        assert_eq!(file.ext(), ".JPG");
        assert_eq!(file.base(), "Team Photo.JPG");
        assert_eq!(file.local_path(), Some(&PathBuf::from("/tmp/1dcfb587")));
        assert_eq!(file.relative(), "images/2025/05/team-photo.jpg");
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let p = policy(|_| {});
        assert!(matches!(
            FileRef::from_path(&p, &FixedHost, "", None),
            Err(AdapterError::InvalidInput(_))
        ));
        assert!(matches!(
            FileRef::from_url(&p, &FixedHost, "  "),
            Err(AdapterError::InvalidInput(_))
        ));
        assert!(matches!(
            FileRef::from_file(&p, &FixedHost, &FileDescriptor::default(), None),
            Err(AdapterError::InvalidInput(_))
        ));
        assert!(matches!(
            FileRef::from_url(&p, &FixedHost, "https://bucket.storage.googleapis.com/"),
            Err(AdapterError::InvalidInput(_))
        ));
    }

    #[test]
    fn renders_default_policy() {
        let p = policy(|_| {});
        let file = FileRef::from_path(&p, &FixedHost, "2025/05/logo.png", None).unwrap();
        assert_eq!(file.relative(), "images/2025/05/logo.png");
        assert_eq!(
            file.absolute(),
            "https://bucket.storage.googleapis.com/images/2025/05/logo.png"
        );
        assert_eq!(file.passthrough(), "/content/images/2025/05/logo.png");
    }

    #[test]
    fn renders_prefix_and_path_style_bucket() {
        let p = policy(|o| {
            o.prefix = Some("ghost".into());
            o.virtual_hosted = Some(false);
        });
        let file = FileRef::from_path(&p, &FixedHost, "2025/05/logo.png", None).unwrap();
        assert_eq!(file.relative(), "ghost/images/2025/05/logo.png");
        assert_eq!(
            file.absolute(),
            "https://storage.googleapis.com/bucket/ghost/images/2025/05/logo.png"
        );
        assert_eq!(file.passthrough(), "/content/images/ghost/2025/05/logo.png");
    }

    #[test]
    fn passthrough_urls_resolve_to_keys() {
        let p = policy(|o| o.bucket = Some("BUCKET".into()));
        for url in [
            "http://localhost:2368/content/images/2025/05/logo.png",
            "/content/images/2025/05/logo.png",
        ] {
            let file = FileRef::from_url(&p, &FixedHost, url).unwrap();
            assert_eq!(file.relative(), "images/2025/05/logo.png", "url {url}");
        }
    }

    #[test]
    fn virtual_and_path_style_urls_resolve_to_same_key() {
        let bucket = "BUCKET";
        let p = policy(|o| {
            o.bucket = Some(bucket.into());
            o.prefix = Some("ghost".into());
            o.add_prefix_to_url = Some(true);
        });
        let file = FileRef::from_url(
            &p,
            &FixedHost,
            &format!("https://{bucket}.storage.googleapis.com/ghost/2025/05/logo.png"),
        )
        .unwrap();
        assert_eq!(file.relative(), "ghost/images/2025/05/logo.png");

        let p = policy(|o| {
            o.bucket = Some(bucket.into());
            o.prefix = Some("ghost".into());
            o.add_prefix_to_url = Some(true);
            o.virtual_hosted = Some(false);
        });
        let file = FileRef::from_url(
            &p,
            &FixedHost,
            &format!("https://storage.googleapis.com/{bucket}/ghost/images/2025/05/logo.png"),
        )
        .unwrap();
        assert_eq!(file.relative(), "ghost/images/2025/05/logo.png");
    }

    #[test]
    fn query_and_fragment_are_ignored() {
        let p = policy(|_| {});
        let file = FileRef::from_url(
            &p,
            &FixedHost,
            "https://bucket.storage.googleapis.com/images/2025/05/logo.png?X-Goog-Expires=60#top",
        )
        .unwrap();
        assert_eq!(file.relative(), "images/2025/05/logo.png");
    }

    #[test]
    fn bare_serve_paths_drop_query_and_fragment() {
        let p = policy(|_| {});
        for url in [
            "/content/images/2025/05/logo.png?v=1",
            "/content/images/2025/05/logo.png#preview",
        ] {
            let file = FileRef::from_url(&p, &FixedHost, url).unwrap();
            assert_eq!(file.base(), "logo.png", "url {url}");
            assert_eq!(file.relative(), "images/2025/05/logo.png", "url {url}");
        }
    }

    #[test]
    fn renderers_round_trip_for_every_flag_combination() {
        let mut checked = 0;
        for host in [None, Some("cdn.example.com")] {
            for virtual_hosted in [true, false] {
                for signed in [false, true] {
                    for passthrough in [true, false] {
                        for prefix in [None, Some("ghost"), Some("blog/assets")] {
                            for add_prefix in [false, true] {
                                let p = policy(|o| {
                                    o.bucket = Some("My-Bucket".into());
                                    o.host = host.map(str::to_string);
                                    o.virtual_hosted = Some(virtual_hosted);
                                    o.signed = Some(signed);
                                    o.passthrough = Some(passthrough);
                                    o.prefix = prefix.map(str::to_string);
                                    o.add_prefix_to_url = Some(add_prefix);
                                    o.asset_type = Some("media".into());
                                });
                                let file = FileRef::from_path(
                                    &p,
                                    &FixedHost,
                                    "2025/05/Clip Final.MP4",
                                    None,
                                )
                                .unwrap();
                                let key = file.relative();
                                for url in [file.absolute(), file.passthrough()] {
                                    let parsed = FileRef::from_url(&p, &FixedHost, &url).unwrap();
                                    assert_eq!(parsed.relative(), key, "policy {p:?} url {url}");
                                    checked += 1;
                                }
                            }
                        }
                    }
                }
            }
        }
        assert_eq!(checked, 2 * 2 * 2 * 2 * 3 * 2 * 2);
    }

    #[test]
    fn computed_name_replaces_base_in_every_shape() {
        let p = policy(|_| {});
        let mut file = FileRef::from_path(&p, &FixedHost, "2025/05/logo.png", None).unwrap();
        file.computed = Some("5eb63bbbe01eeed0.png".into());
        assert_eq!(file.relative(), "images/2025/05/5eb63bbbe01eeed0.png");
        assert_eq!(file.passthrough(), "/content/images/2025/05/5eb63bbbe01eeed0.png");
    }
}
