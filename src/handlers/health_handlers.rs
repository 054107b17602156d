//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that round-trips a probe object through the blob store

use crate::services::adapter::StorageAdapter;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

const PROBE_BODY: &[u8] = b"readyz";

/// `GET /healthz`
///
/// Very small liveness probe. Always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that writes, reads back and deletes a probe object under
/// the configured prefix. HTTP 200 when the round trip succeeds,
/// HTTP 503 otherwise.
pub async fn readyz(State(adapter): State<StorageAdapter>) -> impl IntoResponse {
    let key = probe_key(&adapter.policy().prefix);
    let blobs = adapter.blobs();

    let check = match blobs.save(&key, Bytes::from_static(PROBE_BODY)).await {
        Ok(()) => match blobs.read_stream(&key).await {
            Ok(mut body) => {
                let mut buf = BytesMut::new();
                let mut read_err = None;
                while let Some(chunk) = body.next().await {
                    match chunk {
                        Ok(chunk) => buf.extend_from_slice(&chunk),
                        Err(e) => {
                            read_err = Some(e.to_string());
                            break;
                        }
                    }
                }
                let outcome = match read_err {
                    Some(e) => (false, Some(format!("could not read probe object: {e}"))),
                    None if buf.as_ref() != PROBE_BODY => {
                        (false, Some("probe object content mismatch".to_string()))
                    }
                    None => (true, None),
                };
                // best-effort cleanup; report only if the rest succeeded
                match blobs.delete(&key).await {
                    Err(e) if outcome.0 => (true, Some(format!("could not remove probe object: {e}"))),
                    _ => outcome,
                }
            }
            Err(e) => {
                let _ = blobs.delete(&key).await;
                (false, Some(format!("could not read probe object: {e}")))
            }
        },
        Err(e) => (false, Some(format!("could not write probe object: {e}"))),
    };

    let mut checks = HashMap::new();
    checks.insert(
        "blob_store",
        CheckStatus {
            ok: check.0,
            error: check.1,
        },
    );

    let body = ReadyResponse {
        status: if check.0 { "ok".into() } else { "error".into() },
        checks,
    };
    let status = if check.0 {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

fn probe_key(prefix: &str) -> String {
    let name = format!(".readyz-{}", Uuid::new_v4());
    if prefix.is_empty() {
        name
    } else {
        format!("{prefix}/{name}")
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
