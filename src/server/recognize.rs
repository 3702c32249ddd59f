use axum::Json;
use axum::extract::Multipart;
use axum::extract::multipart::MultipartRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::ocr::{self, OcrError};
use crate::receipt;
use crate::settings::Settings;

use super::models::{ErrorResponse, OcrResponse};

const UPLOAD_FIELD: &str = "file";

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<OcrError>() {
            Some(OcrError::InvalidImage(_)) => {
                ServerError::bad_request("Invalid image file or corrupted")
            }
            Some(OcrError::EngineNotFound(_)) => {
                ServerError::internal("Tesseract OCR engine not found on the server.")
            }
            None => ServerError::internal(format!("OCR failed: {:#}", err)),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

#[derive(Debug)]
pub(crate) struct Upload {
    pub(crate) filename: String,
    pub(crate) bytes: Vec<u8>,
}

/// Pulls the `file` part out of a multipart body. A request that is not
/// multipart at all, or whose `file` part is a plain form field without a
/// `filename`, is treated the same as one without the part.
pub(crate) async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Upload, ServerError> {
    let Ok(mut multipart) = multipart else {
        return Err(ServerError::bad_request("No file uploaded"));
    };
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ServerError {
            status: err.status(),
            message: err.body_text(),
        })?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        if filename.is_empty() {
            return Err(ServerError::bad_request("No file selected"));
        }
        let bytes = field.bytes().await.map_err(|err| ServerError {
            status: err.status(),
            message: err.body_text(),
        })?;
        return Ok(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }
    Err(ServerError::bad_request("No file uploaded"))
}

pub(crate) fn recognize_upload(
    settings: &Settings,
    upload: Upload,
    with_items: bool,
) -> Result<OcrResponse, ServerError> {
    if let Some(kind) = infer::get(&upload.bytes) {
        tracing::debug!(
            "received {} ({}, {} bytes)",
            upload.filename,
            kind.mime_type(),
            upload.bytes.len()
        );
    }
    let output = ocr::extract_text(&upload.bytes, &upload.filename, settings)?;
    let items = with_items.then(|| receipt::parse_items(&output.text));
    Ok(OcrResponse {
        status: "success".to_string(),
        text: output.text,
        filename: upload.filename,
        items,
    })
}
