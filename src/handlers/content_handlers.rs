//! HTTP handlers for content served through the host's content route.
//! Streams object bodies to avoid buffering in memory and delegates naming
//! and storage concerns to `StorageAdapter`.

use crate::{
    errors::AppError,
    models::file_ref::FileDescriptor,
    services::adapter::StorageAdapter,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::path::Path as FsPath;
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// URL to serve the upload from.
    pub url: String,
    /// Object key the upload was stored under.
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct UrlToPathQuery {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct UrlToPathResponse {
    pub key: String,
}

/// `GET /{content}/{type}/{*path}`: stream an object back to the client.
pub async fn serve_content(
    State(adapter): State<StorageAdapter>,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let file = adapter.from_path(&format!("/{path}"), None)?;
    let key = file.relative();
    let body = adapter
        .blobs()
        .read_stream(&key)
        .await
        .map_err(|err| AppError::from_blob(err, &key))?;

    let mut response = Response::new(Body::from_stream(body));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(file.ext())),
    );
    Ok(response)
}

/// `HEAD /{content}/{type}/{*path}`: existence check only.
pub async fn head_content(
    State(adapter): State<StorageAdapter>,
    Path(path): Path<String>,
) -> Result<StatusCode, AppError> {
    if adapter.exists(&format!("/{path}"), None).await? {
        Ok(StatusCode::OK)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

/// `DELETE /{content}/{type}/{*path}`
pub async fn delete_content(
    State(adapter): State<StorageAdapter>,
    Path(path): Path<String>,
) -> Result<StatusCode, AppError> {
    adapter.delete(&format!("/{path}"), None).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/upload`: multipart upload, field `file`.
///
/// The part is spooled to a temp file first so hash-based filename
/// strategies can read it, then handed to `StorageAdapter::store`.
pub async fn upload_content(
    State(adapter): State<StorageAdapter>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::new(StatusCode::BAD_REQUEST, err.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::new(StatusCode::BAD_REQUEST, "upload is missing a file name"))?;
        let mimetype = field.content_type().map(str::to_string);

        let tmp_path = std::env::temp_dir().join(format!(".upload-{}", Uuid::new_v4()));
        let spooled = spool(&mut field, &tmp_path).await;
        let result = match spooled {
            Ok(()) => {
                let mut upload = FileDescriptor::new(name, tmp_path.clone());
                if let Some(mimetype) = mimetype {
                    upload
                        .fields
                        .insert("mimetype".into(), serde_json::Value::String(mimetype));
                }
                adapter.store(&upload, None).await.map_err(AppError::from)
            }
            Err(err) => Err(err),
        };
        let _ = fs::remove_file(&tmp_path).await;

        let stored = result?;
        debug!(url = %stored.url, key = %stored.key, "upload complete");
        return Ok(Json(UploadResponse {
            url: stored.url,
            key: stored.key,
        }));
    }

    Err(AppError::new(StatusCode::BAD_REQUEST, "multipart field `file` is required"))
}

/// `GET /api/path?url=...`: map a served URL back to its object key.
pub async fn url_to_path(
    State(adapter): State<StorageAdapter>,
    Query(q): Query<UrlToPathQuery>,
) -> Result<impl IntoResponse, AppError> {
    let key = adapter.url_to_path(&q.url)?;
    Ok(Json(UrlToPathResponse { key }))
}

async fn spool(field: &mut axum::extract::multipart::Field<'_>, path: &FsPath) -> Result<(), AppError> {
    let mut file = fs::File::create(path)
        .await
        .map_err(|err| AppError::internal(err.to_string()))?;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|err| AppError::new(StatusCode::BAD_REQUEST, err.to_string()))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|err| AppError::internal(err.to_string()))?;
    }
    file.flush()
        .await
        .map_err(|err| AppError::internal(err.to_string()))
}

fn content_type_for(ext: &str) -> &'static str {
    match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" | "svgz" => "image/svg+xml",
        "ico" => "image/x-icon",
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "ogv" => "video/ogg",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
