//! Document payload storage: remote object storage first, local disk fallback.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use printdesk_core::{JobId, PrintJob};

use crate::jobs::{run_blocking, JobStore, JobStoreError};

pub mod dropbox;

pub use dropbox::DropboxStore;

/// Remote object storage that can hand out a temporary download link.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Upload `bytes` as `filename` and return a retrievable temporary link.
    async fn upload(&self, filename: &str, bytes: Bytes) -> Result<String, RemoteStoreError>;
}

/// Remote storage failure. Always recovered by the local fallback.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteStoreError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("remote api error ({0}): {1}")]
    Api(u16, String),
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Where a submitted document ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredPayload {
    Remote { temporary_link: String },
    Local,
}

impl StoredPayload {
    pub fn temporary_link(&self) -> Option<&str> {
        match self {
            StoredPayload::Remote { temporary_link } => Some(temporary_link),
            StoredPayload::Local => None,
        }
    }
}

/// Stores document bytes for a new job.
#[derive(Clone)]
pub struct PayloadStore {
    remote: Option<Arc<dyn RemoteStore>>,
    jobs: Arc<dyn JobStore>,
}

impl PayloadStore {
    pub fn new(jobs: Arc<dyn JobStore>, remote: Option<Arc<dyn RemoteStore>>) -> Self {
        Self { remote, jobs }
    }

    pub fn local_only(jobs: Arc<dyn JobStore>) -> Self {
        Self::new(jobs, None)
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Upload remotely when possible; otherwise keep the bytes on local disk.
    ///
    /// A successful remote upload leaves no local copy. Only a local write
    /// failure is an error.
    pub async fn store(&self, job_id: JobId, bytes: Bytes) -> Result<StoredPayload, JobStoreError> {
        if let Some(remote) = &self.remote {
            let filename = PrintJob::filename_for(job_id);
            // Bytes clones share the buffer; the fallback keeps its own handle.
            match remote.upload(&filename, bytes.clone()).await {
                Ok(temporary_link) => {
                    tracing::info!(job_id = %job_id, "payload uploaded to remote storage");
                    return Ok(StoredPayload::Remote { temporary_link });
                }
                Err(e) => {
                    tracing::warn!(job_id = %job_id, "remote upload failed, keeping payload locally: {e}");
                }
            }
        }

        let size = bytes.len();
        run_blocking(self.jobs.clone(), move |jobs| jobs.put_payload(job_id, &bytes)).await?;
        tracing::info!(job_id = %job_id, size, "payload stored locally");
        Ok(StoredPayload::Local)
    }
}
