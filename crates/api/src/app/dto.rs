use serde::{Deserialize, Serialize};

use printdesk_core::{JobStatus, PrintJob, StatusUpdate};

use crate::app::errors::ApiError;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub next: Option<String>,
}

impl ListQuery {
    pub fn wants_next(&self) -> bool {
        matches!(self.next.as_deref(), Some("true") | Some("1"))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusRequest {
    pub status: Option<String>,
    pub message: Option<String>,
}

impl StatusRequest {
    pub fn into_update(self) -> Result<StatusUpdate, ApiError> {
        let status = self
            .status
            .map(|s| s.parse::<JobStatus>())
            .transpose()
            .map_err(|e| ApiError::bad_request(e.to_string()))?;

        Ok(StatusUpdate {
            status,
            message: self.message,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub agent_id: String,
    pub lease_secs: Option<u32>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub id: String,
    pub temporary_link: Option<String>,
}

impl From<&PrintJob> for SubmitResponse {
    fn from(job: &PrintJob) -> Self {
        Self {
            id: job.id.to_string(),
            temporary_link: job.temporary_link.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}
