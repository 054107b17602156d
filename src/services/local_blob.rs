//! src/services/local_blob.rs
//!
//! LocalBlobService: a [`BlobService`] that keeps objects on local disk
//! beneath `base_path/{bucket}/{key}`. It serves as the collaborator for the
//! standalone server and for tests; signed URLs point at `public_url`.

use crate::services::blob::{
    BlobError, BlobResult, BlobService, ByteStream, SignedUrlOptions,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, Utc};
use futures::StreamExt;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};
use uuid::Uuid;

const MAX_OBJECT_KEY_LEN: usize = 1024;
const MAX_SIGNED_URL_DAYS: i64 = 7;

#[derive(Clone, Debug)]
pub struct LocalBlobService {
    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,

    /// Bucket name; objects live under `base_path/bucket`.
    pub bucket: String,

    /// Externally reachable URL that `base_path/bucket` is served from.
    pub public_url: String,
}

impl LocalBlobService {
    pub fn new(
        base_path: impl Into<PathBuf>,
        bucket: impl Into<String>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            base_path: base_path.into(),
            bucket: bucket.into(),
            public_url: public_url.into(),
        }
    }

    /// Basic key validation to avoid trivial path traversal vectors.
    ///
    /// Rejects empty or over-long keys, keys that begin with `/`, contain `..`
    /// or carry control characters.
    fn ensure_key_safe(&self, key: &str) -> BlobResult<()> {
        if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
            return Err(BlobError::bad_request(format!("invalid object key `{key}`")));
        }
        if key.starts_with('/') || key.split('/').any(|seg| seg == "..") {
            return Err(BlobError::bad_request(format!("invalid object key `{key}`")));
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(BlobError::bad_request(format!("invalid object key `{key}`")));
        }
        Ok(())
    }

    fn bucket_root(&self) -> PathBuf {
        self.base_path.join(&self.bucket)
    }

    fn object_path(&self, key: &str) -> BlobResult<PathBuf> {
        self.ensure_key_safe(key)?;
        Ok(self.bucket_root().join(key))
    }

    /// Create the parent directory of `path` and a temp file beside it.
    async fn create_tmp(&self, path: &Path) -> BlobResult<(PathBuf, File)> {
        let parent = path.parent().map(Path::to_path_buf).ok_or_else(|| {
            BlobError::from(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let file = File::create(&tmp_path).await?;
        Ok((tmp_path, file))
    }

    /// Flush, fsync and atomically move a finished temp file into place.
    async fn commit(&self, mut file: File, tmp_path: &Path, path: &Path) -> BlobResult<()> {
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(tmp_path).await;
            return Err(err.into());
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(tmp_path).await;
            return Err(err.into());
        }
        if let Err(err) = fs::rename(tmp_path, path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(path).await?;
                fs::rename(tmp_path, path).await?;
            } else {
                let _ = fs::remove_file(tmp_path).await;
                return Err(err.into());
            }
        }
        Ok(())
    }

    /// Recursively remove empty directories up to the bucket root.
    async fn prune_empty_dirs(&self, start: &Path, stop: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => match current.parent() {
                    Some(parent) => current = parent.to_path_buf(),
                    None => break,
                },
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl BlobService for LocalBlobService {
    async fn exists(&self, key: &str) -> BlobResult<bool> {
        let path = self.object_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn read_stream(&self, key: &str) -> BlobResult<ByteStream> {
        let path = self.object_path(key)?;
        let file = File::open(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                BlobError::not_found(key)
            } else {
                err.into()
            }
        })?;
        Ok(Box::pin(ReaderStream::new(file)))
    }

    async fn write_stream(&self, key: &str, mut body: ByteStream) -> BlobResult<()> {
        let path = self.object_path(key)?;
        let (tmp_path, mut file) = self.create_tmp(&path).await?;

        let mut size_bytes: u64 = 0;
        while let Some(chunk_res) = body.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(err.into());
                }
            };
            size_bytes += chunk.len() as u64;
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(err.into());
            }
        }
        self.commit(file, &tmp_path, &path).await?;

        info!(key = %key, size_bytes, "stored object");
        Ok(())
    }

    async fn save(&self, key: &str, data: Bytes) -> BlobResult<()> {
        let path = self.object_path(key)?;
        let (tmp_path, mut file) = self.create_tmp(&path).await?;
        if let Err(err) = file.write_all(&data).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }
        self.commit(file, &tmp_path, &path).await?;

        info!(key = %key, size_bytes = data.len(), "stored object");
        Ok(())
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        let path = self.object_path(key)?;
        match fs::remove_file(&path).await {
            Ok(_) => debug!("removed physical file {}", path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(BlobError::not_found(key));
            }
            Err(err) => return Err(err.into()),
        }

        if let Some(parent) = path.parent() {
            self.prune_empty_dirs(parent, &self.bucket_root()).await;
        }
        Ok(())
    }

    async fn signed_url(&self, key: &str, opts: &SignedUrlOptions) -> BlobResult<String> {
        self.ensure_key_safe(key)?;
        let now = Utc::now();
        if opts.expires_at <= now {
            return Err(BlobError::bad_request("signed url expiry must be in the future"));
        }
        if opts.expires_at - now > Duration::days(MAX_SIGNED_URL_DAYS) {
            return Err(BlobError::bad_request(format!(
                "v4 signed urls may not be valid for more than {MAX_SIGNED_URL_DAYS} days"
            )));
        }

        let base = self.public_url.trim_end_matches('/');
        let url = if opts.virtual_hosted_style {
            format!("{base}/{key}")
        } else {
            format!("{base}/{}/{key}", self.bucket)
        };
        Ok(format!(
            "{url}?X-Goog-Date={}&X-Goog-Expires={}",
            now.format("%Y%m%dT%H%M%SZ"),
            (opts.expires_at - now).num_seconds()
        ))
    }
}
