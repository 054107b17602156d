//! Defines routes for the content store.
//!
//! ## Structure
//! - **Content endpoints** (mounted at the host content route, e.g. `/content/images`)
//!   - `GET    /{content}/{type}/{*path}` stream object
//!   - `HEAD   /{content}/{type}/{*path}` existence check
//!   - `DELETE /{content}/{type}/{*path}` delete object
//!
//! - **API endpoints**
//!   - `POST   /api/upload` multipart upload, returns the serve URL
//!   - `GET    /api/path?url=` map a serve URL back to its object key
//!
//! The wildcard `*path` allows nested paths like `2025/05/logo.png`.

use crate::{
    handlers::{
        content_handlers::{
            delete_content, head_content, serve_content, upload_content, url_to_path,
        },
        health_handlers::{healthz, readyz},
    },
    services::adapter::StorageAdapter,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build the router for `adapter`'s content route.
///
/// The content mount depends on the adapter's content path and type, so the
/// route table is built per adapter rather than statically.
pub fn routes(adapter: &StorageAdapter) -> Router<StorageAdapter> {
    let content_route = format!("{}{{*path}}", adapter.policy().content_route());

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/upload", post(upload_content))
        .route("/api/path", get(url_to_path))
        .route(
            &content_route,
            get(serve_content)
                .head(head_content)
                .delete(delete_content),
        )
}
