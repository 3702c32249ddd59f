mod debug;
mod engine;

pub use engine::extract_text;

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("tesseract executable not found: {0}")]
    EngineNotFound(String),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct OcrOutput {
    pub text: String,
    pub width: u32,
    pub height: u32,
    pub processed_width: u32,
    pub processed_height: u32,
    pub skew_degrees: f32,
}
