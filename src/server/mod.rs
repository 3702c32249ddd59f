mod client;
mod handlers;
mod models;
mod recognize;
mod state;

pub use client::{HealthReport, SubmitOutcome, check_health, submit_file};
pub use handlers::{build_router, run_server, serve};
pub use models::{ErrorResponse, HealthResponse, OcrResponse};
pub use state::ServerState;
