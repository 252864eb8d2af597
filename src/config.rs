//! Runtime configuration loaded from the environment.

use std::env;

use anyhow::{Context, Result};
use tracing::info;

use crate::ocr::OcrProviderKind;

/// Server and OCR settings, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,
    /// OCR backend used when the request does not pick one.
    pub default_provider: OcrProviderKind,
    /// Tesseract binary to invoke.
    pub tesseract_command: String,
    /// Tesseract language pack.
    pub ocr_language: String,
    /// Base URL of the remote OCR sidecar, if configured.
    pub sidecar_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables, with defaults suitable
    /// for local development.
    pub fn from_env() -> Result<Self> {
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string());

        let max_upload_bytes = match env::var("MAX_UPLOAD_BYTES") {
            Ok(v) => v.parse().context("MAX_UPLOAD_BYTES must be an integer")?,
            Err(_) => 20 * 1024 * 1024,
        };

        let default_provider = match env::var("OCR_PROVIDER") {
            Ok(v) => OcrProviderKind::from_str(&v)
                .with_context(|| format!("Unknown OCR_PROVIDER: {}", v))?,
            Err(_) => OcrProviderKind::Tesseract,
        };

        let tesseract_command =
            env::var("TESSERACT_CMD").unwrap_or_else(|_| "tesseract".to_string());
        let ocr_language = env::var("OCR_LANGUAGE").unwrap_or_else(|_| "eng".to_string());
        let sidecar_url = env::var("OCR_SIDECAR_URL").ok();

        info!(
            "config: bind={} default_provider={:?} sidecar={}",
            bind_addr,
            default_provider,
            sidecar_url.as_deref().unwrap_or("-")
        );

        Ok(Self {
            bind_addr,
            max_upload_bytes,
            default_provider,
            tesseract_command,
            ocr_language,
            sidecar_url,
        })
    }
}
