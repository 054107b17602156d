//! Cloud Storage content adapter for Ghost.
//!
//! Uploaded assets are stored in an object store instead of local disk while
//! the host keeps its path and URL contract. [`models::file_ref::FileRef`]
//! maps host paths, uploads and served URLs to object keys and back;
//! [`services::adapter::StorageAdapter`] runs the storage operations against
//! a [`services::blob::BlobService`].

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use errors::{AdapterError, AdapterResult, AppError};
pub use models::{
    file_ref::{FileDescriptor, FileRef},
    options::{AdapterOptions, FilenameStrategy, HashAlgorithm},
    policy::PathPolicy,
};
pub use services::{
    adapter::{StorageAdapter, StoredFile},
    blob::BlobService,
};
