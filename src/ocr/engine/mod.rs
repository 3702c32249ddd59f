mod deskew;
mod geom;
mod preprocess;
mod tesseract;

use anyhow::{Context, Result};
use image::DynamicImage;
use std::io::Write;

use crate::ocr::{OcrError, OcrOutput, debug};
use crate::settings::Settings;

fn decode_image(image_bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(image_bytes)
        .map_err(|err| OcrError::InvalidImage(err.to_string()).into())
}

/// Runs the fixed preprocessing sequence and hands the result to tesseract.
/// `name` is only used to label debug output.
pub fn extract_text(image_bytes: &[u8], name: &str, settings: &Settings) -> Result<OcrOutput> {
    let image = decode_image(image_bytes)?;
    let (width, height) = (image.width(), image.height());
    let processed = preprocess::preprocess_image(&image, &settings.preprocess);
    drop(image);

    if settings.debug_save_images {
        match debug::save_debug_image(&processed.image, &settings.debug_dir, name) {
            Ok(path) => tracing::info!("debug image saved at: {}", path.display()),
            Err(err) => tracing::warn!("failed to save debug image: {:#}", err),
        }
    }

    let languages =
        tesseract::normalize_ocr_languages(&settings.ocr.tesseract_cmd, &settings.ocr.languages)?;
    let mut tmp = tempfile::Builder::new()
        .prefix("receipt-ocr-")
        .suffix(".png")
        .tempfile()
        .with_context(|| "failed to create temp file for OCR")?;
    processed
        .image
        .write_to(&mut tmp, image::ImageFormat::Png)
        .with_context(|| "failed to write temp image for OCR")?;
    tmp.flush().with_context(|| "failed to flush temp image for OCR")?;

    let raw = tesseract::run_tesseract_text(tmp.path(), &languages, &settings.ocr)?;
    Ok(OcrOutput {
        text: raw.trim().to_string(),
        width,
        height,
        processed_width: processed.image.width(),
        processed_height: processed.image.height(),
        skew_degrees: processed.skew_degrees,
    })
}
