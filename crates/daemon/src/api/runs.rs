use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use engine::{PipelineError, PipelineRequest, RunConfig};
use futures::{stream, Stream};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::files::serve_file;
use crate::runs::{RunError, RunManager, RunSnapshot};

#[derive(Deserialize)]
pub struct UploadQuery {
    filename: String,
}

#[derive(Serialize)]
pub struct UploadResponse {
    run_id: Uuid,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// Maps run failures onto HTTP status codes with a JSON body.
pub struct ApiError(RunError);

impl From<RunError> for ApiError {
    fn from(e: RunError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            RunError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            RunError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            RunError::Pipeline(e @ PipelineError::InvalidArgument(_)) => {
                (StatusCode::BAD_REQUEST, e.kind())
            }
            RunError::Pipeline(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.kind()),
        };
        let body = ErrorBody {
            error: kind,
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(runs: Arc<RunManager>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(
            "/",
            post(upload)
                .get(list)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/:id", get(get_run).delete(delete_run))
        .route("/:id/configure", post(configure))
        .route("/:id/start", post(start))
        .route("/:id/cancel", post(cancel))
        .route("/:id/events", get(events))
        .route("/:id/clips/:name", get(get_clip))
        .route("/:id/archive", get(get_archive))
        .with_state(runs)
}

async fn upload(
    State(runs): State<Arc<RunManager>>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let run_id = runs.upload(&query.filename, &body).await?;
    Ok((StatusCode::CREATED, Json(UploadResponse { run_id })))
}

async fn list(State(runs): State<Arc<RunManager>>) -> Json<Vec<RunSnapshot>> {
    Json(runs.list())
}

async fn get_run(
    State(runs): State<Arc<RunManager>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RunSnapshot>, ApiError> {
    Ok(Json(runs.snapshot(id)?))
}

async fn delete_run(
    State(runs): State<Arc<RunManager>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    runs.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn configure(
    State(runs): State<Arc<RunManager>>,
    Path(id): Path<Uuid>,
    Json(config): Json<RunConfig>,
) -> Result<Json<PipelineRequest>, ApiError> {
    Ok(Json(runs.configure(id, config)?))
}

async fn start(
    State(runs): State<Arc<RunManager>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    runs.start(id)?;
    Ok(StatusCode::ACCEPTED)
}

async fn cancel(
    State(runs): State<Arc<RunManager>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    runs.cancel(id)?;
    Ok(StatusCode::ACCEPTED)
}

async fn get_clip(
    State(runs): State<Arc<RunManager>>,
    Path((id, name)): Path<(Uuid, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let Some(path) = runs.clip_path(id, &name)? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    Ok(serve_file(&path, "video/mp4", &headers)
        .await
        .into_response())
}

async fn get_archive(
    State(runs): State<Arc<RunManager>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let Some((path, sha256)) = runs.archive(id)? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let mut response = serve_file(&path, "application/zip", &headers)
        .await
        .into_response();
    if response.status().is_success() {
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment; filename=\"clips.zip\""),
        );
        if let Ok(value) = HeaderValue::from_str(&sha256) {
            headers.insert("x-archive-sha256", value);
        }
    }
    Ok(response)
}

/// SSE stream of one run's events.
async fn events(
    State(runs): State<Arc<RunManager>>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    runs.snapshot(id)?;
    let rx = runs.subscribe();

    let event_stream = stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) if event.run_id() == id => {
                    let json = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
                    return Some((Ok(Event::default().data(json)), rx));
                }
                Ok(_) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(event_stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}
