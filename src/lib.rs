use anyhow::{Context, Result};
use std::path::Path;

pub mod compare;
pub mod logging;
pub mod ocr;
pub mod receipt;
pub mod server;
pub mod settings;
mod test_util;

pub use ocr::{OcrError, OcrOutput};
pub use receipt::ReceiptItem;

#[derive(Debug, serde::Serialize)]
pub struct Recognition {
    pub filename: String,
    #[serde(flatten)]
    pub output: OcrOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<ReceiptItem>>,
}

/// Runs the OCR pipeline on a local file without going through HTTP.
pub fn recognize_file(
    path: &Path,
    settings: &settings::Settings,
    with_items: bool,
) -> Result<Recognition> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read image: {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("input")
        .to_string();
    let output = ocr::extract_text(&bytes, &filename, settings)?;
    let items = with_items.then(|| receipt::parse_items(&output.text));
    Ok(Recognition {
        filename,
        output,
        items,
    })
}
