//! Filesystem-backed job store.
//!
//! Layout under the base directory:
//!
//! - `<id>.json`: job metadata (one per job)
//! - `<id>.pdf`: local payload (only when the remote upload did not happen)
//!
//! Writes go straight through `std::fs::write`; a crash mid-write can leave a
//! truncated record, which later scans report as `Corrupt`.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Duration, Utc};

use printdesk_core::{JobId, PrintJob, StatusUpdate, PAYLOAD_EXTENSION};

use super::store::{JobStore, JobStoreError};

const METADATA_EXTENSION: &str = "json";

#[derive(Debug)]
pub struct FileJobStore {
    base_dir: PathBuf,
    // Serializes read-modify-write cycles issued through this instance.
    // Other processes sharing the directory are not covered.
    write_lock: Mutex<()>,
}

impl FileJobStore {
    /// Open a store rooted at `base_dir`, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(base_dir: P) -> Result<Self, JobStoreError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir).map_err(|e| JobStoreError::Io {
            path: base_dir.clone(),
            source: e,
        })?;

        Ok(Self {
            base_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn metadata_path(&self, job_id: JobId) -> PathBuf {
        self.base_dir.join(format!("{job_id}.{METADATA_EXTENSION}"))
    }

    pub fn payload_path(&self, job_id: JobId) -> PathBuf {
        self.base_dir.join(format!("{job_id}.{PAYLOAD_EXTENSION}"))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>, JobStoreError> {
        self.write_lock
            .lock()
            .map_err(|_| JobStoreError::Storage("job store lock poisoned".to_string()))
    }

    fn read_record(&self, path: &Path) -> Result<PrintJob, JobStoreError> {
        let raw = std::fs::read(path).map_err(|e| JobStoreError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_slice(&raw).map_err(|e| JobStoreError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn write_record(&self, job: &PrintJob) -> Result<(), JobStoreError> {
        let path = self.metadata_path(job.id);
        let body = serde_json::to_vec_pretty(job)
            .map_err(|e| JobStoreError::Storage(format!("serialize job {}: {e}", job.id)))?;
        std::fs::write(&path, body).map_err(|e| JobStoreError::Io { path, source: e })
    }

    /// Metadata files in file-name order.
    fn record_paths(&self) -> Result<Vec<PathBuf>, JobStoreError> {
        let entries = std::fs::read_dir(&self.base_dir).map_err(|e| JobStoreError::Io {
            path: self.base_dir.clone(),
            source: e,
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| JobStoreError::Io {
                path: self.base_dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(METADATA_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl JobStore for FileJobStore {
    fn put(&self, job: &PrintJob) -> Result<(), JobStoreError> {
        self.write_record(job)
    }

    fn get(&self, job_id: JobId) -> Result<PrintJob, JobStoreError> {
        let path = self.metadata_path(job_id);
        if !path.exists() {
            return Err(JobStoreError::NotFound(job_id));
        }
        self.read_record(&path).map_err(|e| {
            tracing::warn!(job_id = %job_id, "unreadable job record: {e}");
            JobStoreError::NotFound(job_id)
        })
    }

    fn list_all(&self) -> Result<Vec<PrintJob>, JobStoreError> {
        self.record_paths()?
            .iter()
            .map(|p| self.read_record(p))
            .collect()
    }

    fn update(&self, job_id: JobId, update: StatusUpdate) -> Result<PrintJob, JobStoreError> {
        let _guard = self.lock()?;

        let mut job = self.get(job_id)?;
        job.apply(update, Utc::now());
        self.write_record(&job)?;
        Ok(job)
    }

    fn claim_next(&self, agent_id: &str, lease: Duration) -> Result<Option<PrintJob>, JobStoreError> {
        let _guard = self.lock()?;
        let now = Utc::now();

        let Some(mut job) = self
            .list_all()?
            .into_iter()
            .find(|j| j.is_claimable(now, lease))
        else {
            return Ok(None);
        };

        job.mark_claimed(agent_id, now);
        self.write_record(&job)?;
        Ok(Some(job))
    }

    fn put_payload(&self, job_id: JobId, bytes: &[u8]) -> Result<(), JobStoreError> {
        let path = self.payload_path(job_id);
        std::fs::write(&path, bytes).map_err(|e| JobStoreError::Io { path, source: e })
    }

    fn read_payload(&self, job_id: JobId) -> Result<Vec<u8>, JobStoreError> {
        let path = self.payload_path(job_id);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(JobStoreError::PayloadNotFound(job_id))
            }
            Err(e) => Err(JobStoreError::Io { path, source: e }),
        }
    }
}
