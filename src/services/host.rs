//! Capabilities borrowed from the host application.

use chrono::Utc;
use rand::RngCore;
use std::{collections::BTreeMap, path::PathBuf};

/// File fields as the host sees them; also the lookup table for template keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRecord {
    pub name: String,
    pub base: String,
    pub ext: String,
    pub dir: String,
    pub path: Option<PathBuf>,
    pub fields: BTreeMap<String, String>,
}

impl FileRecord {
    /// Look up a template key. Known fields win over the free-form ones.
    pub fn field(&self, key: &str) -> Option<String> {
        match key {
            "name" => Some(self.name.clone()),
            "base" => Some(self.base.clone()),
            "ext" => Some(self.ext.clone()),
            "dir" => Some(self.dir.clone()),
            "path" => self.path.as_ref().map(|p| p.display().to_string()),
            other => self.fields.get(other).cloned(),
        }
    }
}

pub trait HostContext: Send + Sync {
    /// Directory new uploads go to when the caller names none.
    fn target_dir(&self) -> String;

    /// Host collision-avoiding path for `file` inside `dir`.
    ///
    /// Follows host conventions: `file.name` carries the full file name
    /// (extension included).
    fn unique_file_path(&self, file: &FileRecord, dir: &str) -> String;
}

/// Year/month target directories and `name-<16 hex>ext` unique names.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHost;

impl HostContext for DefaultHost {
    fn target_dir(&self) -> String {
        Utc::now().format("%Y/%m").to_string()
    }

    fn unique_file_path(&self, file: &FileRecord, dir: &str) -> String {
        let stem = file.name.strip_suffix(&file.ext).unwrap_or(&file.name);
        let mut bytes = [0u8; 8];
        rand::rng().fill_bytes(&mut bytes);
        let name = format!("{stem}-{}{}", hex::encode(bytes), file.ext);
        if dir.is_empty() {
            name
        } else {
            format!("{}/{name}", dir.trim_end_matches('/'))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_dir_is_year_and_month() {
        let dir = DefaultHost.target_dir();
        let parts: Vec<&str> = dir.split('/').collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 4);
        assert_eq!(parts[1].len(), 2);
    }

    #[test]
    fn unique_path_appends_random_suffix() {
        let file = FileRecord {
            name: "logo.png".into(),
            base: "logo".into(),
            ext: ".png".into(),
            ..FileRecord::default()
        };
        let a = DefaultHost.unique_file_path(&file, "2025/05");
        let b = DefaultHost.unique_file_path(&file, "2025/05");

        assert!(a.starts_with("2025/05/logo-"));
        assert!(a.ends_with(".png"));
        assert_eq!(a.len(), "2025/05/logo-".len() + 16 + ".png".len());
        assert_ne!(a, b);
    }

    #[test]
    fn field_lookup_prefers_known_fields() {
        let mut fields = BTreeMap::new();
        fields.insert("mimetype".to_string(), "image/png".to_string());
        fields.insert("name".to_string(), "shadowed".to_string());
        let file = FileRecord {
            name: "logo".into(),
            fields,
            ..FileRecord::default()
        };
        assert_eq!(file.field("name").as_deref(), Some("logo"));
        assert_eq!(file.field("mimetype").as_deref(), Some("image/png"));
        assert_eq!(file.field("size"), None);
    }
}
