//! Remote OCR sidecar provider.
//!
//! Posts the preprocessed image to an HTTP sidecar that answers with the
//! recognized text as JSON.

use serde::Deserialize;
use tracing::info;

use super::{OcrError, OcrProvider};

/// Sidecar response (private deserialization type).
#[derive(Debug, Deserialize)]
struct SidecarResponse {
    text: String,
}

pub struct RemoteOcrProvider {
    url: String,
    client: reqwest::Client,
}

impl RemoteOcrProvider {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { url, client }
    }
}

#[async_trait::async_trait]
impl OcrProvider for RemoteOcrProvider {
    fn name(&self) -> &str {
        "remote"
    }

    async fn recognize(&self, image_png: &[u8]) -> Result<String, OcrError> {
        use reqwest::multipart::{Form, Part};

        let part = Part::bytes(image_png.to_vec())
            .file_name("document.png")
            .mime_str("image/png")?;
        let form = Form::new().part("file", part);

        info!("posting {} bytes to OCR sidecar at {}", image_png.len(), self.url);
        let resp = self
            .client
            .post(format!("{}/ocr", self.url))
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(OcrError::Engine(format!(
                "sidecar returned {}: {}",
                status, text
            )));
        }

        let body: SidecarResponse = resp.json().await?;
        Ok(body.text)
    }
}
