use crate::models::options::AdapterOptions;
use anyhow::{Context, Result};
use clap::Parser;
use std::{env, fs};

/// Centralized application configuration.
/// Combines environment variables, CLI arguments and the adapter config file.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub public_url: String,
    pub adapter: AdapterOptions,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Cloud Storage content adapter for Ghost")]
pub struct Args {
    /// Host to bind to (overrides GCS_ADAPTER_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides GCS_ADAPTER_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory backing the local blob store (overrides GCS_ADAPTER_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Public URL the blob store is reachable at (overrides GCS_ADAPTER_PUBLIC_URL)
    #[arg(long)]
    pub public_url: Option<String>,

    /// JSON file with the adapter options block (overrides GCS_ADAPTER_CONFIG)
    #[arg(long)]
    pub config: Option<String>,

    /// Bucket name, takes precedence over the config file (overrides GCS_ADAPTER_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("GCS_ADAPTER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("GCS_ADAPTER_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing GCS_ADAPTER_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 2369,
            Err(err) => return Err(err).context("reading GCS_ADAPTER_PORT"),
        };
        let env_storage =
            env::var("GCS_ADAPTER_STORAGE_DIR").unwrap_or_else(|_| "./data/blobs".into());
        let env_public_url = env::var("GCS_ADAPTER_PUBLIC_URL").ok();
        let config_path = args.config.or_else(|| env::var("GCS_ADAPTER_CONFIG").ok());
        let bucket = args.bucket.or_else(|| env::var("GCS_ADAPTER_BUCKET").ok());

        // --- Adapter options ---
        let mut adapter = match &config_path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("reading adapter config `{}`", path))?;
                serde_json::from_str::<AdapterOptions>(&raw)
                    .with_context(|| format!("parsing adapter config `{}`", path))?
            }
            None => AdapterOptions::default(),
        };
        if bucket.is_some() {
            adapter.bucket = bucket;
        }

        // --- Merge ---
        let host = args.host.unwrap_or(env_host);
        let port = args.port.unwrap_or(env_port);
        let public_url = args
            .public_url
            .or(env_public_url)
            .unwrap_or_else(|| format!("http://localhost:{}/blobs", port));

        Ok(Self {
            host,
            port,
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            public_url,
            adapter,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
