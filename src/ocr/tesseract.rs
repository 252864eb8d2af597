//! Local Tesseract OCR provider (shells out to the `tesseract` binary).

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{OcrError, OcrProvider};

pub struct TesseractProvider {
    command: String,
    language: String,
}

impl TesseractProvider {
    pub fn new(command: String, language: String) -> Self {
        Self { command, language }
    }

    /// A unique temp path so concurrent uploads never collide.
    fn staging_path(&self) -> PathBuf {
        std::env::temp_dir().join(format!("id-extractor-{}.png", Uuid::new_v4().simple()))
    }
}

#[async_trait::async_trait]
impl OcrProvider for TesseractProvider {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, image_png: &[u8]) -> Result<String, OcrError> {
        let path = self.staging_path();
        tokio::fs::write(&path, image_png).await?;
        debug!("staged {} bytes at {:?}", image_png.len(), path);

        let output = Command::new(&self.command)
            .arg(&path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .stdin(Stdio::null())
            .output()
            .await;

        // Remove the staging file whether or not the engine succeeded.
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("failed to remove staging file {:?}: {}", path, e);
        }

        let output = output?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).to_string();
        info!("tesseract produced {} chars", text.len());
        Ok(text)
    }
}
