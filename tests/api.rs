use std::io::Cursor;
use std::net::SocketAddr;
use std::path::Path;

use image::{DynamicImage, GrayImage, Luma};
use receipt_ocr_rust::server::{self, ErrorResponse, HealthResponse};
use receipt_ocr_rust::settings::Settings;
use reqwest::multipart::{Form, Part};

async fn spawn_server(settings: Settings) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        server::serve(listener, settings).await.expect("serve");
    });
    addr
}

fn offline_settings() -> Settings {
    let mut settings = Settings::default();
    settings.ocr.tesseract_cmd = "receipt-ocr-no-such-binary".to_string();
    settings
}

fn png_bytes() -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(GrayImage::from_pixel(60, 30, Luma([255])))
        .write_to(&mut bytes, image::ImageFormat::Png)
        .expect("encode png");
    bytes.into_inner()
}

/// Writes a shell script that answers `--list-langs` like tesseract and runs
/// `body` for recognition calls.
#[cfg(unix)]
fn stub_engine(dir: &Path, body: &str) -> Settings {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("tesseract");
    let script = format!(
        "#!/bin/sh\nif [ \"$1\" = \"--list-langs\" ]; then\n  printf 'List of available languages (2):\\neng\\nind\\n'\n  exit 0\nfi\n{body}\n"
    );
    std::fs::write(&path, script).expect("write stub engine");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    let mut settings = Settings::default();
    settings.ocr.tesseract_cmd = path.to_string_lossy().into_owned();
    settings
}

async fn post_query(addr: SocketAddr, query: &str, form: Form) -> (u16, serde_json::Value) {
    let response = reqwest::Client::new()
        .post(format!("http://{}/api/ocr{}", addr, query))
        .multipart(form)
        .send()
        .await
        .expect("send");
    let status = response.status().as_u16();
    (status, response.json().await.expect("json body"))
}

fn receipt_form() -> Form {
    Form::new().part("file", Part::bytes(png_bytes()).file_name("struk.png"))
}

async fn post_form(addr: SocketAddr, form: Form) -> (u16, ErrorResponse) {
    let response = reqwest::Client::new()
        .post(format!("http://{}/api/ocr", addr))
        .multipart(form)
        .send()
        .await
        .expect("send");
    let status = response.status().as_u16();
    (status, response.json().await.expect("json body"))
}

#[tokio::test]
async fn health_reports_ok_with_timestamp() {
    let addr = spawn_server(offline_settings()).await;
    let response = reqwest::get(format!("http://{}/health", addr))
        .await
        .expect("get");
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
    let body: HealthResponse = response.json().await.expect("json");
    assert_eq!(body.status, "ok");
    assert!(time::OffsetDateTime::parse(
        &body.timestamp,
        &time::format_description::well_known::Rfc3339
    )
    .is_ok());
}

#[tokio::test]
async fn preflight_is_answered_without_body() {
    let addr = spawn_server(offline_settings()).await;
    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, format!("http://{}/api/ocr", addr))
        .send()
        .await
        .expect("options");
    assert_eq!(response.status().as_u16(), 204);
    assert_eq!(
        response.headers()["access-control-allow-methods"],
        "GET,POST,OPTIONS"
    );
}

#[tokio::test]
async fn missing_file_part_is_rejected() {
    let addr = spawn_server(offline_settings()).await;
    let form = Form::new().text("note", "no file here");
    let (status, body) = post_form(addr, form).await;
    assert_eq!(status, 400);
    insta::assert_json_snapshot!(body, @r#"
    {
      "error": "No file uploaded"
    }
    "#);
}

#[tokio::test]
async fn non_multipart_body_is_rejected() {
    let addr = spawn_server(offline_settings()).await;
    let response = reqwest::Client::new()
        .post(format!("http://{}/api/ocr", addr))
        .body("raw bytes")
        .send()
        .await
        .expect("send");
    assert_eq!(response.status().as_u16(), 400);
    let body: ErrorResponse = response.json().await.expect("json");
    assert_eq!(body.error, "No file uploaded");
}

#[tokio::test]
async fn empty_filename_is_rejected() {
    let addr = spawn_server(offline_settings()).await;
    let form = Form::new().part("file", Part::bytes(png_bytes()).file_name(""));
    let (status, body) = post_form(addr, form).await;
    assert_eq!(status, 400);
    assert_eq!(body.error, "No file selected");
}

#[tokio::test]
async fn file_field_without_filename_counts_as_missing() {
    let addr = spawn_server(offline_settings()).await;
    let form = Form::new().text("file", "plain form value");
    let (status, body) = post_form(addr, form).await;
    assert_eq!(status, 400);
    assert_eq!(body.error, "No file uploaded");
}

#[tokio::test]
async fn malformed_query_is_a_json_error() {
    let addr = spawn_server(offline_settings()).await;
    let response = reqwest::Client::new()
        .post(format!("http://{}/api/ocr?items=yes", addr))
        .multipart(receipt_form())
        .send()
        .await
        .expect("send");
    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(response.headers()["content-type"], "application/json");
    let body: ErrorResponse = response.json().await.expect("json");
    assert!(
        body.error.starts_with("Failed to deserialize query string"),
        "got {}",
        body.error
    );
}

#[cfg(unix)]
#[tokio::test]
async fn recognized_text_is_returned() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = stub_engine(dir.path(), "printf '  2 Nasi Goreng 25.000\\nTotal 25.000\\n'");
    let addr = spawn_server(settings).await;
    let (status, body) = post_query(addr, "", receipt_form()).await;
    assert_eq!(status, 200);
    insta::assert_json_snapshot!(body, @r#"
    {
      "filename": "struk.png",
      "status": "success",
      "text": "2 Nasi Goreng 25.000\nTotal 25.000"
    }
    "#);
}

#[cfg(unix)]
#[tokio::test]
async fn items_are_parsed_on_request() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = stub_engine(dir.path(), "printf '  2 Nasi Goreng 25.000\\nTotal 25.000\\n'");
    let addr = spawn_server(settings).await;
    let (status, body) = post_query(addr, "?items=true", receipt_form()).await;
    assert_eq!(status, 200);
    insta::assert_json_snapshot!(body, @r#"
    {
      "filename": "struk.png",
      "items": [
        {
          "name": "Nasi Goreng",
          "price": 25000.0,
          "qty": 2
        }
      ],
      "status": "success",
      "text": "2 Nasi Goreng 25.000\nTotal 25.000"
    }
    "#);
}

#[cfg(unix)]
#[tokio::test]
async fn engine_failure_reports_stderr() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = stub_engine(dir.path(), "echo 'Error opening data file' >&2\nexit 1");
    let addr = spawn_server(settings).await;
    let (status, body) = post_query(addr, "", receipt_form()).await;
    assert_eq!(status, 500);
    insta::assert_json_snapshot!(body, @r#"
    {
      "error": "OCR failed: tesseract failed: Error opening data file"
    }
    "#);
}

#[tokio::test]
async fn corrupted_image_is_rejected() {
    let addr = spawn_server(offline_settings()).await;
    let form = Form::new().part(
        "file",
        Part::bytes(b"\x89PNG but not really".to_vec()).file_name("struk.png"),
    );
    let (status, body) = post_form(addr, form).await;
    assert_eq!(status, 400);
    insta::assert_json_snapshot!(body, @r#"
    {
      "error": "Invalid image file or corrupted"
    }
    "#);
}

#[tokio::test]
async fn missing_engine_is_a_server_error() {
    let addr = spawn_server(offline_settings()).await;
    let form = Form::new().part("file", Part::bytes(png_bytes()).file_name("struk.png"));
    let (status, body) = post_form(addr, form).await;
    assert_eq!(status, 500);
    assert_eq!(body.error, "Tesseract OCR engine not found on the server.");
}

#[tokio::test]
async fn oversized_upload_is_refused() {
    let mut settings = offline_settings();
    settings.max_upload_bytes = 1024;
    let addr = spawn_server(settings).await;
    let form = Form::new().part("file", Part::bytes(vec![0u8; 8 * 1024]).file_name("big.png"));
    let response = reqwest::Client::new()
        .post(format!("http://{}/api/ocr", addr))
        .multipart(form)
        .send()
        .await
        .expect("send");
    assert_eq!(response.status().as_u16(), 413);
}

#[tokio::test]
async fn client_helpers_talk_to_the_server() {
    let addr = spawn_server(offline_settings()).await;
    let base = format!("http://{}/", addr);

    let report = server::check_health(&base).await.expect("health");
    assert!(report.connected);
    assert_eq!(report.message, "OCR backend connected");
    assert_eq!(report.data.expect("data")["status"], "ok");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.jpg");
    std::fs::write(&path, b"not an image").expect("write");
    let outcome = server::submit_file(&base, &path).await.expect("submit");
    assert_eq!(outcome.status, 400);
    assert_eq!(outcome.body["error"], "Invalid image file or corrupted");
}

#[tokio::test]
async fn unreachable_backend_is_reported_disconnected() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let report = server::check_health(&format!("http://{}", addr))
        .await
        .expect("report");
    assert!(!report.connected);
}
