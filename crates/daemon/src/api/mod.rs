use axum::{extract::State, response::Json, routing::get, Router};
use engine::request::{
    AudioExtension, Device, Scheduler, MAX_COLUMNS, MAX_INFERENCE_STEPS, MAX_NUM_CLIPS,
};
use engine::GenerationDefaults;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::runs::RunManager;

pub mod files;
pub mod runs;

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Choices a client needs to build a run configuration.
#[derive(Serialize)]
struct OptionsResponse {
    schedulers: Vec<Scheduler>,
    devices: Vec<Device>,
    extensions: Vec<AudioExtension>,
    checkpoints: Vec<String>,
    max_clips: u32,
    max_columns: u32,
    max_inference_steps: u32,
    defaults: GenerationDefaults,
}

async fn options(State(runs): State<Arc<RunManager>>) -> Json<OptionsResponse> {
    let settings = runs.settings();
    Json(OptionsResponse {
        schedulers: Scheduler::ALL.to_vec(),
        devices: Device::ALL.to_vec(),
        extensions: AudioExtension::ALL.to_vec(),
        checkpoints: settings.synthesizer.checkpoints.clone(),
        max_clips: MAX_NUM_CLIPS,
        max_columns: MAX_COLUMNS,
        max_inference_steps: MAX_INFERENCE_STEPS,
        defaults: settings.defaults.clone(),
    })
}

pub fn app(runs: Arc<RunManager>, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_credentials(false);

    Router::new()
        .route("/health", get(health))
        .nest("/api", router(runs, max_upload_bytes))
        .layer(cors)
}

pub fn router(runs: Arc<RunManager>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/options", get(options))
        .with_state(Arc::clone(&runs))
        .nest("/runs", runs::router(runs, max_upload_bytes))
}
