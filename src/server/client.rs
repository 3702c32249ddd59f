use anyhow::{Context, Result, anyhow};
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug)]
pub struct HealthReport {
    pub connected: bool,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct SubmitOutcome {
    pub status: u16,
    pub body: serde_json::Value,
}

fn endpoint(api_base: &str, path: &str) -> Result<String> {
    let base = api_base.trim().trim_end_matches('/');
    if base.is_empty() {
        return Err(anyhow!("OCR API base URL is empty"));
    }
    Ok(format!("{}{}", base, path))
}

/// Checks `<api_base>/health`. Transport failures are reported as a
/// disconnected backend rather than an error.
pub async fn check_health(api_base: &str) -> Result<HealthReport> {
    let url = endpoint(api_base, "/health")?;
    let client = reqwest::Client::builder()
        .timeout(HEALTH_TIMEOUT)
        .build()
        .with_context(|| "failed to build http client")?;
    let response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(err) => {
            return Ok(HealthReport {
                connected: false,
                message: err.to_string(),
                data: None,
            });
        }
    };
    if !response.status().is_success() {
        return Ok(HealthReport {
            connected: false,
            message: "OCR backend not responding".to_string(),
            data: None,
        });
    }
    let data = response.json::<serde_json::Value>().await.ok();
    Ok(HealthReport {
        connected: true,
        message: "OCR backend connected".to_string(),
        data,
    })
}

pub async fn submit_file(api_base: &str, path: &Path) -> Result<SubmitOutcome> {
    let url = endpoint(api_base, "/api/ocr")?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read file: {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("upload")
        .to_string();
    let mime = infer::get(&bytes)
        .map(|kind| kind.mime_type())
        .unwrap_or("application/octet-stream");
    let part = Part::bytes(bytes)
        .file_name(filename)
        .mime_str(mime)
        .with_context(|| format!("invalid mime type: {}", mime))?;
    let form = Form::new().part("file", part);

    let response = reqwest::Client::new()
        .post(&url)
        .multipart(form)
        .send()
        .await
        .with_context(|| format!("failed to reach OCR backend: {}", url))?;
    let status = response.status().as_u16();
    let body = response
        .json::<serde_json::Value>()
        .await
        .with_context(|| "OCR backend returned a non-JSON body")?;
    Ok(SubmitOutcome { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_strips_trailing_slashes() {
        assert_eq!(
            endpoint("http://localhost:5000/", "/health").unwrap(),
            "http://localhost:5000/health"
        );
        assert_eq!(
            endpoint(" http://ocr.internal ", "/api/ocr").unwrap(),
            "http://ocr.internal/api/ocr"
        );
        assert!(endpoint("  ", "/health").is_err());
    }
}
