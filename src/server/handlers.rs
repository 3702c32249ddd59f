use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::net::TcpListener;

use crate::settings;

use super::models::{HealthResponse, OcrQuery, OcrResponse};
use super::recognize::{ServerError, read_upload, recognize_upload};
use super::state::ServerState;

pub async fn run_server(settings: settings::Settings) -> Result<()> {
    let addr = settings.server_addr.clone();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind server address: {}", addr))?;
    tracing::info!("starting OCR API server on http://{}", addr);
    serve(listener, settings).await
}

pub async fn serve(listener: TcpListener, settings: settings::Settings) -> Result<()> {
    axum::serve(listener, build_router(settings))
        .await
        .with_context(|| "server stopped unexpectedly")?;
    Ok(())
}

pub fn build_router(settings: settings::Settings) -> Router {
    let body_limit = settings.max_upload_bytes;
    let state = Arc::new(ServerState { settings });
    Router::new()
        .route("/health", get(health))
        .route("/api/ocr", post(ocr))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(axum::middleware::from_fn(cors_middleware))
}

async fn health() -> impl IntoResponse {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            timestamp,
        }),
    )
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type,authorization"),
    );
}

async fn ocr(
    State(state): State<Arc<ServerState>>,
    query: Result<Query<OcrQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<OcrResponse>, ServerError> {
    let Query(query) = query.map_err(|err| ServerError::bad_request(err.body_text()))?;
    let upload = read_upload(multipart).await.inspect_err(|err| {
        tracing::warn!("rejected OCR upload: {}", err.message);
    })?;
    let filename = upload.filename.clone();

    let state = state.clone();
    let result = tokio::task::spawn_blocking(move || {
        recognize_upload(&state.settings, upload, query.items)
    })
    .await
    .map_err(|err| ServerError::internal(format!("OCR failed: server task failed: {}", err)))?;

    match result {
        Ok(response) => {
            tracing::info!("OCR succeeded for file: {}", filename);
            Ok(Json(response))
        }
        Err(err) => {
            tracing::error!("OCR error for file {}: {}", filename, err.message);
            Err(err)
        }
    }
}
