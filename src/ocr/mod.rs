//! Modular OCR provider abstraction.
//!
//! Defines the [`OcrProvider`] trait so different OCR backends (local
//! Tesseract binary, remote sidecar) can be swapped via query parameter.

pub mod remote;
pub mod tesseract;

use thiserror::Error;

/// Errors surfaced by OCR backends.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("failed to stage image for OCR: {0}")]
    Io(#[from] std::io::Error),
    #[error("OCR engine failed: {0}")]
    Engine(String),
    #[error("OCR sidecar request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Async trait implemented by each OCR backend.
#[async_trait::async_trait]
pub trait OcrProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Run character recognition over a preprocessed PNG image.
    async fn recognize(&self, image_png: &[u8]) -> Result<String, OcrError>;
}

/// Known provider identifiers used for registry lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OcrProviderKind {
    Tesseract,
    Remote,
}

impl OcrProviderKind {
    /// Parse a query-parameter string into a provider kind.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "tesseract" => Some(Self::Tesseract),
            "remote" => Some(Self::Remote),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!(OcrProviderKind::from_str("tesseract"), Some(OcrProviderKind::Tesseract));
        assert_eq!(OcrProviderKind::from_str("remote"), Some(OcrProviderKind::Remote));
        assert_eq!(OcrProviderKind::from_str("easyocr"), None);
    }
}
