//! Image cleanup ahead of OCR.
//!
//! The OCR engine performs much better on a normalized raster: grayscale,
//! fixed 1000px width, sharpened, contrast stretched to the full range.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageOutputFormat};
use thiserror::Error;
use tracing::debug;

/// Target width in pixels for OCR input.
const OCR_WIDTH: u32 = 1000;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
}

/// Clean an uploaded document image for OCR.
///
/// Decodes the upload, resizes to [`OCR_WIDTH`] preserving aspect ratio,
/// converts to grayscale, applies an unsharp mask, stretches contrast, and
/// re-encodes as PNG.
pub fn clean_for_ocr(data: &[u8]) -> Result<Vec<u8>, PreprocessError> {
    let img = image::load_from_memory(data).map_err(PreprocessError::Decode)?;
    debug!("decoded upload: {}x{} {:?}", img.width(), img.height(), img.color());

    let gray = img
        .resize(OCR_WIDTH, u32::MAX, FilterType::Lanczos3)
        .grayscale()
        .unsharpen(1.5, 2)
        .into_luma8();
    let gray = stretch_contrast(gray);

    let mut out = Vec::new();
    DynamicImage::ImageLuma8(gray)
        .write_to(&mut Cursor::new(&mut out), ImageOutputFormat::Png)
        .map_err(PreprocessError::Encode)?;
    Ok(out)
}

/// Linear min-max stretch: darkest pixel maps to 0, brightest to 255.
/// A flat image is returned unchanged.
fn stretch_contrast(mut img: GrayImage) -> GrayImage {
    let (mut min, mut max) = (u8::MAX, u8::MIN);
    for p in img.pixels() {
        min = min.min(p.0[0]);
        max = max.max(p.0[0]);
    }
    if min >= max {
        return img;
    }

    let range = f32::from(max - min);
    for p in img.pixels_mut() {
        p.0[0] = (f32::from(p.0[0] - min) * 255.0 / range).round() as u8;
    }
    img
}
