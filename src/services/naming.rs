//! Filename strategies.

use crate::{
    errors::{AdapterError, AdapterResult},
    models::{file_ref::FileRef, options::FilenameStrategy},
    services::{
        digest::{content_digest, content_digest_with_salt, random_hex},
        host::{FileRecord, HostContext},
    },
};
use regex::{Captures, Regex};
use std::{path::PathBuf, sync::LazyLock};
use tracing::debug;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]]+)\]").expect("valid regex"));

/// Placeholder keys referenced by `template`, in order of appearance.
pub fn template_keys(template: &str) -> impl Iterator<Item = &str> {
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}

/// Expand `[key]` placeholders.
///
/// `hash` expands to `hash` (empty when not computed), `random` to a fresh
/// random string per occurrence, anything else to the matching record field.
/// Unknown keys expand to nothing.
pub fn render_template(
    template: &str,
    record: &FileRecord,
    hash: Option<&str>,
    mut random: impl FnMut() -> String,
) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
            "hash" => hash.unwrap_or_default().to_string(),
            "random" => random(),
            key => record.field(key).unwrap_or_default(),
        })
        .into_owned()
}

impl FileRef<'_> {
    fn source_path(&self) -> AdapterResult<&PathBuf> {
        self.local_path.as_ref().ok_or_else(|| {
            AdapterError::invalid_input(format!(
                "`{}` has no local source to hash",
                self.base
            ))
        })
    }

    async fn hash(&self) -> AdapterResult<String> {
        let p = self.policy;
        Ok(content_digest(self.source_path()?, p.hash_algorithm, p.hash_length).await?)
    }

    async fn salted_hash(&self) -> AdapterResult<String> {
        let p = self.policy;
        Ok(content_digest_with_salt(self.source_path()?, p.hash_algorithm, p.hash_length).await?)
    }

    fn random(&self) -> String {
        random_hex(self.policy.hash_length)
    }

    /// Apply the policy's filename strategy and remember the result.
    ///
    /// Hash-based strategies read the local source file end to end.
    pub async fn resolve_computed_name(&mut self, host: &dyn HostContext) -> AdapterResult<String> {
        let name = &self.name;
        let ext = &self.ext;
        let base = match self.policy.filename_strategy {
            FilenameStrategy::Original => self.base.clone(),
            FilenameStrategy::OriginalHash => format!("{name}-{}{ext}", self.hash().await?),
            FilenameStrategy::Hash => format!("{}{ext}", self.hash().await?),
            FilenameStrategy::Unique => format!("{name}-{}{ext}", self.random()),
            FilenameStrategy::HashUnique => format!("{}{ext}", self.salted_hash().await?),
            FilenameStrategy::Random => format!("{}{ext}", self.random()),
            FilenameStrategy::Delegate => {
                // The host expects `name` to hold the full file name.
                let mut record = self.record();
                std::mem::swap(&mut record.name, &mut record.base);
                let unique = host.unique_file_path(&record, &record.dir);
                unique.rsplit(['/', '\\']).next().unwrap_or_default().to_string()
            }
            FilenameStrategy::Custom => {
                let template = self.policy.template.as_deref().unwrap_or("[name][ext]");
                let hash = if template_keys(template).any(|key| key == "hash") {
                    Some(self.hash().await?)
                } else {
                    None
                };
                render_template(template, &self.record(), hash.as_deref(), || self.random())
            }
        };

        let computed = self.policy.sanitize(&base);
        if computed.is_empty() {
            return Err(AdapterError::invalid_input(format!(
                "filename strategy produced an empty name for `{}`",
                self.base
            )));
        }
        debug!(
            strategy = ?self.policy.filename_strategy,
            original = %self.base,
            computed = %computed,
            "resolved file name"
        );
        self.computed = Some(computed.clone());
        Ok(computed)
    }
}
