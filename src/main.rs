use anyhow::{Context, Result};
use axum::Router;
use ghost_gcs_adapter::{
    config::AppConfig,
    routes,
    services::{adapter::StorageAdapter, host::DefaultHost, local_blob::LocalBlobService},
};
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;

    tracing::info!("Starting content adapter with config: {:?}", cfg);

    // --- Ensure storage directory exists ---
    if !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir)?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }

    // --- Initialize blob store + adapter ---
    let bucket = cfg.adapter.bucket.clone().unwrap_or_default();
    let blobs = Arc::new(LocalBlobService::new(
        cfg.storage_dir.clone(),
        bucket,
        cfg.public_url.clone(),
    ));
    let adapter = StorageAdapter::new(cfg.adapter.clone(), blobs, Arc::new(DefaultHost))
        .context("invalid adapter configuration")?;

    tracing::info!(
        bucket = %adapter.policy().bucket,
        content_route = %adapter.policy().content_route(),
        strategy = ?adapter.policy().filename_strategy,
        "adapter ready"
    );

    // --- Build router ---
    let app: Router = routes::routes::routes(&adapter).with_state(adapter);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
