//! Print job record and its status transitions.

use core::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::id::JobId;

/// Extension of every stored payload file.
pub const PAYLOAD_EXTENSION: &str = "pdf";

/// Job status.
///
/// There is no in-progress state: a job is waiting until an agent reports an
/// outcome for it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }
}

impl core::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "done" => Ok(JobStatus::Done),
            "failed" => Ok(JobStatus::Failed),
            other => Err(DomainError::validation(format!(
                "status must be one of: queued, done, failed (got '{other}')"
            ))),
        }
    }
}

/// Lease held by an agent on a queued job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub agent_id: String,
    pub claimed_at: DateTime<Utc>,
}

/// Patch posted by an agent when it finishes with a job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: Option<JobStatus>,
    pub message: Option<String>,
}

impl StatusUpdate {
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Done),
            message: Some(message.into()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            message: Some(message.into()),
        }
    }
}

/// A single print request.
///
/// This is both the on-disk metadata record and the JSON body the API hands
/// out, so field names follow the wire format (camelCase).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintJob {
    pub id: JobId,
    pub filename: String,
    pub temporary_link: Option<String>,
    pub printer_id: String,
    pub status: JobStatus,
    pub last_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime<Utc>>,
}

impl PrintJob {
    /// A freshly submitted job (`queued`).
    pub fn new(
        id: JobId,
        printer_id: impl Into<String>,
        temporary_link: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            filename: Self::filename_for(id),
            temporary_link,
            printer_id: printer_id.into(),
            status: JobStatus::Queued,
            last_message: None,
            created_at: now,
            updated_at: now,
            claimed_by: None,
            claimed_at: None,
        }
    }

    pub fn filename_for(id: JobId) -> String {
        format!("{id}.{PAYLOAD_EXTENSION}")
    }

    pub fn is_queued(&self) -> bool {
        self.status == JobStatus::Queued
    }

    pub fn claim(&self) -> Option<Claim> {
        match (&self.claimed_by, self.claimed_at) {
            (Some(agent_id), Some(claimed_at)) => Some(Claim {
                agent_id: agent_id.clone(),
                claimed_at,
            }),
            _ => None,
        }
    }

    /// True while another agent's lease on this job has not run out.
    pub fn has_live_claim(&self, now: DateTime<Utc>, lease: Duration) -> bool {
        self.claim().is_some_and(|c| c.claimed_at + lease > now)
    }

    /// Queued and not leased to anyone right now.
    pub fn is_claimable(&self, now: DateTime<Utc>, lease: Duration) -> bool {
        self.is_queued() && !self.has_live_claim(now, lease)
    }

    pub fn mark_claimed(&mut self, agent_id: impl Into<String>, now: DateTime<Utc>) {
        self.claimed_by = Some(agent_id.into());
        self.claimed_at = Some(now);
        self.updated_at = now;
    }

    /// Apply an agent's status report.
    ///
    /// Only supplied fields are overwritten. Conflicting reports simply
    /// replace each other. Any report releases the claim.
    pub fn apply(&mut self, update: StatusUpdate, now: DateTime<Utc>) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(message) = update.message {
            self.last_message = Some(message);
        }
        self.claimed_by = None;
        self.claimed_at = None;
        self.updated_at = now;
    }
}
