use serde::{Deserialize, Serialize};

use crate::receipt::ReceiptItem;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct OcrQuery {
    pub(crate) items: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OcrResponse {
    pub status: String,
    pub text: String,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<ReceiptItem>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
