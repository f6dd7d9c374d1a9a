use std::sync::Arc;

use axum::body::Bytes;
use chrono::Utc;

use printdesk_core::{JobId, PrintJob};
use printdesk_infra::{
    run_blocking, DropboxStore, FileJobStore, JobStore, JobStoreError, PayloadStore, RemoteStore,
    ServerConfig,
};

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppServices {
    pub jobs: Arc<dyn JobStore>,
    pub payloads: PayloadStore,
    pub default_printer: String,
}

impl AppServices {
    pub fn new(jobs: Arc<dyn JobStore>, payloads: PayloadStore, default_printer: impl Into<String>) -> Self {
        Self {
            jobs,
            payloads,
            default_printer: default_printer.into(),
        }
    }

    /// Run a job store call off the async runtime.
    pub async fn with_jobs<T, F>(&self, op: F) -> Result<T, JobStoreError>
    where
        F: FnOnce(&dyn JobStore) -> Result<T, JobStoreError> + Send + 'static,
        T: Send + 'static,
    {
        run_blocking(self.jobs.clone(), op).await
    }

    /// Store the document, then record a queued job pointing at it.
    pub async fn submit(
        &self,
        bytes: Bytes,
        printer_id: Option<String>,
    ) -> Result<PrintJob, JobStoreError> {
        let id = JobId::new();
        let stored = self.payloads.store(id, bytes).await?;

        let printer_id = printer_id
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| self.default_printer.clone());
        let job = PrintJob::new(id, printer_id, stored.temporary_link().map(str::to_string), Utc::now());
        let job = self
            .with_jobs(move |jobs| {
                jobs.put(&job)?;
                Ok(job)
            })
            .await?;

        tracing::info!(job_id = %job.id, printer = %job.printer_id, "print job queued");
        Ok(job)
    }
}

/// Infrastructure wiring from configuration: file store + optional remote.
pub fn build_services(config: &ServerConfig) -> Result<AppServices, JobStoreError> {
    let jobs: Arc<dyn JobStore> = Arc::new(FileJobStore::open(&config.prints_dir)?);

    let remote: Option<Arc<dyn RemoteStore>> = match &config.dropbox {
        Some(credentials) => Some(Arc::new(DropboxStore::new(credentials.clone()))),
        None => {
            tracing::info!("remote storage credentials not set; payloads stay on local disk");
            None
        }
    };

    let payloads = PayloadStore::new(jobs.clone(), remote);
    Ok(AppServices::new(jobs, payloads, config.default_printer.clone()))
}
