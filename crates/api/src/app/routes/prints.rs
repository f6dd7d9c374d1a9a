//! Print job routes.
//!
//! Public: submission and listing. Agent-only (shared secret): dequeue
//! (`?next=true`, checked in the handler), claim, status report and the
//! local payload download.

use std::sync::Arc;

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Multipart, Path, Query,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Duration;

use printdesk_core::{JobId, PrintJob};

use crate::app::dto::{ClaimRequest, ListQuery, OkResponse, StatusRequest, SubmitResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::middleware::AgentAuth;

/// Lease granted by `/prints/claim` when the agent does not ask for one.
pub const DEFAULT_LEASE_SECS: u32 = 300;

pub fn router() -> Router {
    Router::new().route("/prints", get(list_or_next).post(submit))
}

pub fn agent_router() -> Router {
    Router::new()
        .route("/prints/claim", post(claim))
        .route("/prints/:id/status", post(update_status))
        .route("/prints/:id/file", get(download))
}

/// What a dequeue-style request produced.
#[derive(Debug)]
pub enum DequeueResponse {
    /// Every job, any status.
    All(Vec<PrintJob>),
    /// The job the agent should print.
    Job(PrintJob),
    /// Nothing is waiting.
    Empty,
}

impl IntoResponse for DequeueResponse {
    fn into_response(self) -> Response {
        match self {
            DequeueResponse::All(jobs) => (StatusCode::OK, Json(jobs)).into_response(),
            DequeueResponse::Job(job) => (StatusCode::OK, Json(job)).into_response(),
            DequeueResponse::Empty => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

fn parse_job_id(path: Result<Path<String>, PathRejection>) -> Result<JobId, ApiError> {
    let Path(raw) = path?;
    // An id that is not a job id cannot name a stored job.
    raw.parse().map_err(|_| ApiError::job_not_found())
}

/// POST /prints - multipart `file` + optional `printerId`
pub async fn submit(
    Extension(services): Extension<Arc<AppServices>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let mut multipart = multipart?;
    let mut file = None;
    let mut printer_id: Option<String> = None;

    // Field errors carry 413 once the body limit is hit.
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => file = Some(field.bytes().await?),
            Some("printerId") => printer_id = Some(field.text().await?),
            _ => {}
        }
    }

    let Some(file) = file else {
        return Err(ApiError::bad_request("no file uploaded"));
    };
    if file.is_empty() {
        return Err(ApiError::bad_request("uploaded file is empty"));
    }

    let job = services.submit(file, printer_id).await?;
    Ok((StatusCode::CREATED, Json(SubmitResponse::from(&job))))
}

/// GET /prints - full list, or `?next=true` for the oldest queued job
pub async fn list_or_next(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AgentAuth>,
    headers: HeaderMap,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<DequeueResponse, ApiError> {
    let Query(query) = query?;
    if !query.wants_next() {
        let jobs = services.with_jobs(|jobs| jobs.list_all()).await?;
        return Ok(DequeueResponse::All(jobs));
    }

    auth.check(&headers)?;
    Ok(match services.with_jobs(|jobs| jobs.next_queued()).await? {
        Some(job) => DequeueResponse::Job(job),
        None => DequeueResponse::Empty,
    })
}

/// POST /prints/claim - lease the next free queued job to one agent
pub async fn claim(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<ClaimRequest>, JsonRejection>,
) -> Result<DequeueResponse, ApiError> {
    let Json(body) = body?;
    if body.agent_id.trim().is_empty() {
        return Err(ApiError::bad_request("agentId is required"));
    }

    let lease = Duration::seconds(i64::from(body.lease_secs.unwrap_or(DEFAULT_LEASE_SECS)));
    let agent_id = body.agent_id.clone();
    let claimed = services
        .with_jobs(move |jobs| jobs.claim_next(&agent_id, lease))
        .await?;
    Ok(match claimed {
        Some(job) => {
            tracing::info!(job_id = %job.id, agent = %body.agent_id, "job claimed");
            DequeueResponse::Job(job)
        }
        None => DequeueResponse::Empty,
    })
}

/// POST /prints/:id/status - agent reports the outcome
pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<OkResponse>, ApiError> {
    let job_id = parse_job_id(path)?;
    let Json(body) = body?;
    let update = body.into_update()?;

    let job = services.with_jobs(move |jobs| jobs.update(job_id, update)).await?;
    tracing::info!(job_id = %job.id, status = %job.status, "job status updated");
    Ok(Json(OkResponse::ok()))
}

/// GET /prints/:id/file - local payload bytes (fallback when there is no link)
pub async fn download(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let job_id = parse_job_id(path)?;
    let (job, bytes) = services
        .with_jobs(move |jobs| Ok((jobs.get(job_id)?, jobs.read_payload(job_id)?)))
        .await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", job.filename),
            ),
        ],
        bytes,
    )
        .into_response())
}
