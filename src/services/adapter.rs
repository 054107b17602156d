//! StorageAdapter: the host-facing storage operations.
//!
//! Each call builds a short-lived [`FileRef`] against the shared
//! [`PathPolicy`], then talks to the [`BlobService`] at `relative()`.

use crate::{
    errors::{AdapterError, AdapterResult},
    models::{
        file_ref::{FileDescriptor, FileRef},
        options::AdapterOptions,
        policy::PathPolicy,
    },
    services::{
        blob::{BlobService, ByteStream, SignedUrlOptions},
        host::{DefaultHost, HostContext},
    },
};
use bytes::{Bytes, BytesMut};
use chrono::{TimeDelta, Utc};
use futures::StreamExt;
use std::sync::Arc;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

/// Outcome of an upload: where it is served from and the key it was stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub url: String,
    pub key: String,
}

#[derive(Clone)]
pub struct StorageAdapter {
    policy: Arc<PathPolicy>,
    blobs: Arc<dyn BlobService>,
    host: Arc<dyn HostContext>,
}

impl StorageAdapter {
    pub fn new(
        options: AdapterOptions,
        blobs: Arc<dyn BlobService>,
        host: Arc<dyn HostContext>,
    ) -> AdapterResult<Self> {
        let policy = PathPolicy::new(options)?;
        debug!(?policy, "storage adapter configured");
        Ok(Self {
            policy: Arc::new(policy),
            blobs,
            host,
        })
    }

    /// Adapter pinned to one content type (`images`, `media`, `files`, ...),
    /// using the default host capabilities.
    pub fn for_type(
        mut options: AdapterOptions,
        asset_type: &str,
        blobs: Arc<dyn BlobService>,
    ) -> AdapterResult<Self> {
        options.asset_type = Some(asset_type.to_string());
        Self::new(options, blobs, Arc::new(DefaultHost))
    }

    pub fn policy(&self) -> &PathPolicy {
        &self.policy
    }

    pub fn blobs(&self) -> &Arc<dyn BlobService> {
        &self.blobs
    }

    pub fn sanitize(&self, input: &str) -> String {
        self.policy.sanitize(input)
    }

    /// Host hook for naming uploads; same rules as object keys.
    pub fn sanitize_file_name(&self, input: &str) -> String {
        self.sanitize(input)
    }

    pub fn from_path(&self, path: &str, dir: Option<&str>) -> AdapterResult<FileRef<'_>> {
        FileRef::from_path(&self.policy, self.host.as_ref(), path, dir)
    }

    pub fn from_file(&self, file: &FileDescriptor, dir: Option<&str>) -> AdapterResult<FileRef<'_>> {
        FileRef::from_file(&self.policy, self.host.as_ref(), file, dir)
    }

    pub fn from_url(&self, url: &str) -> AdapterResult<FileRef<'_>> {
        FileRef::from_url(&self.policy, self.host.as_ref(), url)
    }

    /// Whether an object exists at `path` (optionally inside `dir`).
    pub async fn exists(&self, path: &str, dir: Option<&str>) -> AdapterResult<bool> {
        let file = self.from_path(path, dir)?;
        Ok(self.blobs.exists(&file.relative()).await?)
    }

    /// Read a whole object into memory. Meant for small files.
    pub async fn read(&self, path: &str) -> AdapterResult<Bytes> {
        let file = self.from_path(path, None)?;
        let key = file.relative();
        let mut body = self.blobs.read_stream(&key).await?;
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        debug!(key = %key, size_bytes = buf.len(), "read object");
        Ok(buf.freeze())
    }

    /// Upload a local file and return the URL to serve it from.
    pub async fn save(&self, upload: &FileDescriptor, dir: Option<&str>) -> AdapterResult<String> {
        Ok(self.store(upload, dir).await?.url)
    }

    /// Like [`StorageAdapter::save`], also reporting the object key written.
    pub async fn store(&self, upload: &FileDescriptor, dir: Option<&str>) -> AdapterResult<StoredFile> {
        let mut file = self.from_file(upload, dir)?;
        let source = file
            .local_path()
            .cloned()
            .ok_or_else(|| AdapterError::invalid_input("file has no local path to upload"))?;
        file.resolve_computed_name(self.host.as_ref()).await?;

        let key = file.relative();
        let body: ByteStream = Box::pin(ReaderStream::new(File::open(&source).await?));
        self.blobs.write_stream(&key, body).await?;
        info!(key = %key, source = %source.display(), "uploaded file");

        let url = self.serve(&file).await?;
        Ok(StoredFile { url, key })
    }

    /// Store `data` at `path` as-is and return the URL to serve it from.
    pub async fn save_raw(&self, data: Bytes, path: &str) -> AdapterResult<String> {
        let file = self.from_path(path, None)?;
        let key = file.relative();
        self.blobs.save(&key, data).await?;
        info!(key = %key, "saved raw object");
        self.serve(&file).await
    }

    /// Delete the object at `path`; a missing object counts as deleted.
    pub async fn delete(&self, path: &str, dir: Option<&str>) -> AdapterResult<()> {
        let file = self.from_path(path, dir)?;
        let key = file.relative();
        match self.blobs.delete(&key).await {
            Ok(()) => {
                info!(key = %key, "deleted object");
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                warn!(key = %key, "object already absent");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Map a served URL (as returned by `save`) back to its object key.
    pub fn url_to_path(&self, url: &str) -> AdapterResult<String> {
        Ok(self.from_url(url)?.relative())
    }

    /// The URL shape selected by policy: signed, passthrough, or absolute.
    pub async fn serve(&self, file: &FileRef<'_>) -> AdapterResult<String> {
        if self.policy.signed {
            return self.signed_url(file).await;
        }
        if self.policy.passthrough {
            return Ok(file.passthrough());
        }
        Ok(file.absolute())
    }

    pub async fn signed_url(&self, file: &FileRef<'_>) -> AdapterResult<String> {
        let expires_at = TimeDelta::try_milliseconds(self.policy.expires_ms)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                AdapterError::configuration(format!(
                    "signed url expiry of {}ms is out of range",
                    self.policy.expires_ms
                ))
            })?;
        let opts = SignedUrlOptions {
            expires_at,
            virtual_hosted_style: self.policy.virtual_hosted,
        };
        Ok(self.blobs.signed_url(&file.relative(), &opts).await?)
    }
}
