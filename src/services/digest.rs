//! Content digests and random hex strings for file naming.

use crate::models::options::HashAlgorithm;
use futures::StreamExt;
use rand::RngCore;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use std::{io, path::Path};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// Minimum amount of random material behind a random hex string.
const RANDOM_BYTES: usize = 32;

enum Hasher {
    Md5(md5::Context),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Hasher {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Md5 => Self::Md5(md5::Context::new()),
            HashAlgorithm::Sha1 => Self::Sha1(Sha1::new()),
            HashAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => Self::Sha512(Sha512::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(ctx) => ctx.consume(data),
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Md5(ctx) => format!("{:x}", ctx.compute()),
            Self::Sha1(h) => hex::encode(h.finalize()),
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}

/// Keep the last `len` characters of a hex string.
pub fn tail(hex: &str, len: usize) -> &str {
    &hex[hex.len().saturating_sub(len)..]
}

async fn digest_file(
    path: &Path,
    algorithm: HashAlgorithm,
    salt: Option<&[u8]>,
    len: usize,
) -> io::Result<String> {
    let mut hasher = Hasher::new(algorithm);
    let mut stream = ReaderStream::new(File::open(path).await?);
    while let Some(chunk) = stream.next().await {
        hasher.update(&chunk?);
    }
    if let Some(salt) = salt {
        hasher.update(salt);
    }
    let hex = hasher.finalize_hex();
    Ok(tail(&hex, len).to_string())
}

/// Stream the file at `path` through `algorithm`; returns the last `len` hex chars.
pub async fn content_digest(path: &Path, algorithm: HashAlgorithm, len: usize) -> io::Result<String> {
    digest_file(path, algorithm, None, len).await
}

/// Like [`content_digest`] with random bytes mixed in after the contents, so
/// identical files yield different names.
pub async fn content_digest_with_salt(
    path: &Path,
    algorithm: HashAlgorithm,
    len: usize,
) -> io::Result<String> {
    let mut salt = [0u8; RANDOM_BYTES];
    rand::rng().fill_bytes(&mut salt);
    digest_file(path, algorithm, Some(&salt), len).await
}

/// Cryptographically random hex string of `len` characters.
pub fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; RANDOM_BYTES.max(len.div_ceil(2))];
    rand::rng().fill_bytes(&mut bytes);
    let hex = hex::encode(bytes);
    tail(&hex, len).to_string()
}
