//! Job store abstraction and the in-memory implementation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use chrono::{Duration, Utc};

use printdesk_core::{JobId, PrintJob, StatusUpdate};

/// Job store abstraction.
pub trait JobStore: Send + Sync {
    /// Write (create or replace) a job's metadata record.
    fn put(&self, job: &PrintJob) -> Result<(), JobStoreError>;

    /// Read a job by ID. Absent or unreadable records are `NotFound`.
    fn get(&self, job_id: JobId) -> Result<PrintJob, JobStoreError>;

    /// Every job record, in storage order (oldest id first).
    fn list_all(&self) -> Result<Vec<PrintJob>, JobStoreError>;

    /// Read-modify-write a job with an agent's status report.
    fn update(&self, job_id: JobId, update: StatusUpdate) -> Result<PrintJob, JobStoreError>;

    /// Lease the first claimable job to `agent_id`.
    /// Returns None if no queued job is free.
    fn claim_next(&self, agent_id: &str, lease: Duration) -> Result<Option<PrintJob>, JobStoreError>;

    /// Store the local copy of a job's document.
    fn put_payload(&self, job_id: JobId, bytes: &[u8]) -> Result<(), JobStoreError>;

    /// Read the local copy of a job's document.
    fn read_payload(&self, job_id: JobId) -> Result<Vec<u8>, JobStoreError>;

    /// First queued job in storage order. Does not mark it in any way.
    fn next_queued(&self) -> Result<Option<PrintJob>, JobStoreError> {
        Ok(self.list_all()?.into_iter().find(|j| j.is_queued()))
    }
}

/// Run a store operation on tokio's blocking pool.
///
/// Store calls touch the disk synchronously (directory scans, payload
/// writes, the update lock), so async callers go through here.
pub async fn run_blocking<T, F>(store: Arc<dyn JobStore>, op: F) -> Result<T, JobStoreError>
where
    F: FnOnce(&dyn JobStore) -> Result<T, JobStoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || op(store.as_ref()))
        .await
        .map_err(|e| JobStoreError::Storage(format!("store task failed: {e}")))?
}

/// Job store error.
#[derive(Debug, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("no local payload for job {0}")]
    PayloadNotFound(JobId),
    #[error("corrupt job record at {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("storage error: {0}")]
    Storage(String),
}

/// In-memory job store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<BTreeMap<JobId, PrintJob>>,
    payloads: RwLock<BTreeMap<JobId, Vec<u8>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl JobStore for InMemoryJobStore {
    fn put(&self, job: &PrintJob) -> Result<(), JobStoreError> {
        self.jobs.write().unwrap().insert(job.id, job.clone());
        Ok(())
    }

    fn get(&self, job_id: JobId) -> Result<PrintJob, JobStoreError> {
        self.jobs
            .read()
            .unwrap()
            .get(&job_id)
            .cloned()
            .ok_or(JobStoreError::NotFound(job_id))
    }

    fn list_all(&self) -> Result<Vec<PrintJob>, JobStoreError> {
        Ok(self.jobs.read().unwrap().values().cloned().collect())
    }

    fn update(&self, job_id: JobId, update: StatusUpdate) -> Result<PrintJob, JobStoreError> {
        let mut jobs = self.jobs.write().unwrap();
        let job = jobs.get_mut(&job_id).ok_or(JobStoreError::NotFound(job_id))?;
        job.apply(update, Utc::now());
        Ok(job.clone())
    }

    fn claim_next(&self, agent_id: &str, lease: Duration) -> Result<Option<PrintJob>, JobStoreError> {
        let mut jobs = self.jobs.write().unwrap();
        let now = Utc::now();

        let Some(job) = jobs.values_mut().find(|j| j.is_claimable(now, lease)) else {
            return Ok(None);
        };
        job.mark_claimed(agent_id, now);
        Ok(Some(job.clone()))
    }

    fn put_payload(&self, job_id: JobId, bytes: &[u8]) -> Result<(), JobStoreError> {
        self.payloads.write().unwrap().insert(job_id, bytes.to_vec());
        Ok(())
    }

    fn read_payload(&self, job_id: JobId) -> Result<Vec<u8>, JobStoreError> {
        self.payloads
            .read()
            .unwrap()
            .get(&job_id)
            .cloned()
            .ok_or(JobStoreError::PayloadNotFound(job_id))
    }
}

impl<S: JobStore + ?Sized> JobStore for Arc<S> {
    fn put(&self, job: &PrintJob) -> Result<(), JobStoreError> {
        (**self).put(job)
    }

    fn get(&self, job_id: JobId) -> Result<PrintJob, JobStoreError> {
        (**self).get(job_id)
    }

    fn list_all(&self) -> Result<Vec<PrintJob>, JobStoreError> {
        (**self).list_all()
    }

    fn update(&self, job_id: JobId, update: StatusUpdate) -> Result<PrintJob, JobStoreError> {
        (**self).update(job_id, update)
    }

    fn claim_next(&self, agent_id: &str, lease: Duration) -> Result<Option<PrintJob>, JobStoreError> {
        (**self).claim_next(agent_id, lease)
    }

    fn put_payload(&self, job_id: JobId, bytes: &[u8]) -> Result<(), JobStoreError> {
        (**self).put_payload(job_id, bytes)
    }

    fn read_payload(&self, job_id: JobId) -> Result<Vec<u8>, JobStoreError> {
        (**self).read_payload(job_id)
    }

    fn next_queued(&self) -> Result<Option<PrintJob>, JobStoreError> {
        (**self).next_queued()
    }
}
