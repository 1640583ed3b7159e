//! Route table and handlers.
//!
//! Mirrors the classic workflow surface:
//!
//! - `POST /workflow[/{workflow_id}]`: multipart `files[]` + `workflow`
//!   (JSON operation array) + `async` flag
//! - `GET /workflow/progress/{id}`
//! - `GET /workflow/progress-stream/{id}` (SSE)
//! - `GET /workflow/result/{id}`
//! - `POST /workflow/abort/{id}`

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{Stream, StreamExt};
use serde_json::json;
use uuid::Uuid;

use super::error::ApiError;
use crate::model::FileUnit;
use crate::operations::Operation;
use crate::sessions::{ResultFetch, SessionManager};

const TRACING_TARGET: &str = "paperflow::server";

/// Maximum multipart body size: 100MB.
const MAX_UPLOAD_SIZE: usize = 100 * 1024 * 1024;

/// Build the workflow router over a shared session manager.
pub fn router(manager: Arc<SessionManager>) -> Router {
    Router::new()
        .route("/workflow", post(submit_workflow))
        .route("/workflow/{workflow_id}", post(submit_workflow_with_id))
        .route("/workflow/progress/{id}", get(get_progress))
        .route("/workflow/progress-stream/{id}", get(stream_progress))
        .route("/workflow/result/{id}", get(get_result))
        .route("/workflow/abort/{id}", post(abort_workflow))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .with_state(manager)
}

/// Decoded multipart submission.
struct Submission {
    operations: Vec<Operation>,
    files: Vec<FileUnit>,
    background: bool,
}

async fn read_submission(mut multipart: Multipart) -> Result<Submission, ApiError> {
    let mut operations: Option<Vec<Operation>> = None;
    let mut files = Vec::new();
    let mut background = false;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        tracing::debug!(target: TRACING_TARGET, error = %err, "failed to read multipart field");
        ApiError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "files" => {
                let name = field.file_name().unwrap_or("upload.pdf").to_string();
                let buffer = field.bytes().await.map_err(|err| {
                    ApiError::bad_request(format!("failed to read file {name:?}: {err}"))
                })?;
                files.push(FileUnit::new(name, buffer));
            }
            "workflow" => {
                let raw = field.text().await.map_err(|err| {
                    ApiError::bad_request(format!("failed to read workflow field: {err}"))
                })?;
                let parsed = serde_json::from_str(&raw).map_err(|err| {
                    ApiError::bad_request(format!("invalid workflow graph: {err}"))
                })?;
                operations = Some(parsed);
            }
            "async" => {
                let raw = field.text().await.map_err(|err| {
                    ApiError::bad_request(format!("failed to read async field: {err}"))
                })?;
                background = raw.trim() == "true";
            }
            other => {
                tracing::debug!(target: TRACING_TARGET, field = %other, "ignoring unknown field");
            }
        }
    }

    let operations =
        operations.ok_or_else(|| ApiError::bad_request("missing workflow field"))?;
    Ok(Submission {
        operations,
        files,
        background,
    })
}

async fn submit_workflow(
    State(manager): State<Arc<SessionManager>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    submit(manager, None, multipart).await
}

async fn submit_workflow_with_id(
    State(manager): State<Arc<SessionManager>>,
    Path(workflow_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    submit(manager, Some(workflow_id), multipart).await
}

async fn submit(
    manager: Arc<SessionManager>,
    workflow_id: Option<Uuid>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let submission = read_submission(multipart).await?;
    tracing::info!(
        target: TRACING_TARGET,
        files = submission.files.len(),
        background = submission.background,
        "workflow submitted"
    );

    if submission.background {
        let id = manager.submit(submission.operations, submission.files, workflow_id)?;
        return Ok(Json(json!({ "workflowID": id })).into_response());
    }

    let outputs = manager
        .run_sync(&submission.operations, submission.files)
        .await?;
    serve_outputs(outputs)
}

fn serve_outputs(mut outputs: Vec<FileUnit>) -> Result<Response, ApiError> {
    if outputs.len() != 1 {
        return Err(ApiError::new(
            StatusCode::NOT_IMPLEMENTED,
            format!(
                "workflow produced {} outputs; multi-output bundling is not implemented",
                outputs.len()
            ),
        ));
    }
    let unit = outputs.remove(0);
    Ok(pdf_response(unit))
}

fn pdf_response(unit: FileUnit) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", unit.download_name()),
            ),
        ],
        unit.buffer,
    )
        .into_response()
}

async fn get_progress(
    State(manager): State<Arc<SessionManager>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let report = manager.progress(id)?;
    Ok(Json(report).into_response())
}

async fn stream_progress(
    State(manager): State<Arc<SessionManager>>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    let events = manager.subscribe(id)?;
    let sse_stream = events.into_terminated_stream().map(|event| {
        Ok(SseEvent::default()
            .json_data(event.to_json_value())
            .unwrap_or_else(|_| SseEvent::default().data(event.to_string())))
    });
    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}

async fn get_result(
    State(manager): State<Arc<SessionManager>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    match manager.take_result(id)? {
        ResultFetch::NotReady => Ok((
            StatusCode::ACCEPTED,
            Json(json!({ "message": "workflow has not finished yet" })),
        )
            .into_response()),
        ResultFetch::Single(unit) => Ok(pdf_response(unit)),
        ResultFetch::MultiOutputUnsupported { count } => Err(ApiError::new(
            StatusCode::NOT_IMPLEMENTED,
            format!("workflow produced {count} outputs; multi-output bundling is not implemented"),
        )),
        ResultFetch::Failed(reason) => Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("workflow failed: {reason}"),
        )),
    }
}

async fn abort_workflow(
    State(manager): State<Arc<SessionManager>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    manager.abort(id)?;
    // Unreachable until abort gains an implementation.
    Ok(StatusCode::NO_CONTENT.into_response())
}
