//! The object-store collaborator.
//!
//! The adapter never talks to a storage backend directly; it computes keys and
//! hands them to a [`BlobService`]. Implementations report failures with a
//! numeric, HTTP-like status code that the adapter maps onto host errors.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::{io, pin::Pin};
use thiserror::Error;

/// Chunked byte stream used for both directions of a transfer.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

#[derive(Debug, Error)]
#[error("{message} (status {code})")]
pub struct BlobError {
    /// 400, 401, 403, 404 or any other status-like value.
    pub code: u16,
    pub message: String,
}

pub type BlobResult<T> = Result<T, BlobError>;

impl BlobError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(key: &str) -> Self {
        Self::new(404, format!("no such object: {key}"))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.code == 404
    }
}

impl From<io::Error> for BlobError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::new(404, err.to_string()),
            io::ErrorKind::PermissionDenied => Self::new(403, err.to_string()),
            _ => Self::new(500, err.to_string()),
        }
    }
}

/// Parameters for [`BlobService::signed_url`]. URLs are V4-signed and grant read access.
#[derive(Debug, Clone)]
pub struct SignedUrlOptions {
    pub expires_at: DateTime<Utc>,
    pub virtual_hosted_style: bool,
}

/// Remote blob store addressed by relative object keys.
#[async_trait]
pub trait BlobService: Send + Sync {
    async fn exists(&self, key: &str) -> BlobResult<bool>;

    /// Open the object for streamed reading.
    async fn read_stream(&self, key: &str) -> BlobResult<ByteStream>;

    /// Consume `body` to the end and store it under `key`.
    async fn write_stream(&self, key: &str, body: ByteStream) -> BlobResult<()>;

    /// Store an in-memory payload under `key`.
    async fn save(&self, key: &str, data: Bytes) -> BlobResult<()>;

    async fn delete(&self, key: &str) -> BlobResult<()>;

    /// Issue a time-limited URL granting access to `key`.
    ///
    /// Validity limits (7 days for v4) are enforced here, not by callers.
    async fn signed_url(&self, key: &str, opts: &SignedUrlOptions) -> BlobResult<String>;
}
