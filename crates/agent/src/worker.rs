//! The polling loop.
//!
//! One job at a time: poll -> download -> print -> report, then poll again
//! straight away. An empty poll or a failed step sleeps for the poll
//! interval. Nothing short of a shutdown request ends the loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use printdesk_core::{JobId, PrintJob, StatusUpdate};

use crate::client::PrintServerClient;
use crate::config::AgentConfig;
use crate::error::AgentError;

/// Outcome of one loop iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// Nothing was queued.
    Idle,
    /// Printed and reported `done`.
    Printed(JobId),
    /// Reported `failed` with this message.
    Failed(JobId, String),
}

impl Tick {
    fn is_idle(&self) -> bool {
        matches!(self, Tick::Idle)
    }
}

pub struct PrintAgent {
    config: AgentConfig,
    client: PrintServerClient,
    shutdown: Arc<tokio::sync::Notify>,
}

/// Handle to control a running agent.
#[derive(Debug)]
pub struct PrintAgentHandle {
    shutdown: Arc<tokio::sync::Notify>,
    join: tokio::task::JoinHandle<()>,
}

impl PrintAgentHandle {
    /// Request graceful shutdown and wait for the loop to stop.
    ///
    /// A print already in progress finishes first.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        let _ = self.join.await;
    }
}

impl PrintAgent {
    pub fn new(config: AgentConfig) -> Self {
        let client = PrintServerClient::new(config.server_url.clone(), config.agent_key.clone());
        Self {
            config,
            client,
            shutdown: Arc::new(tokio::sync::Notify::new()),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn download_path(&self, job_id: JobId) -> PathBuf {
        self.config.workdir.join(PrintJob::filename_for(job_id))
    }

    /// Create the working directory.
    pub async fn prepare(&self) -> Result<(), AgentError> {
        tokio::fs::create_dir_all(&self.config.workdir)
            .await
            .map_err(|e| AgentError::Io {
                path: self.config.workdir.clone(),
                source: e,
            })
    }

    async fn poll(&self) -> Result<Option<PrintJob>, AgentError> {
        if self.config.claim_mode {
            self.client.claim_job(&self.config.agent_id).await
        } else {
            self.client.next_job().await
        }
    }

    /// One iteration of the loop.
    ///
    /// Errors before a job is obtained are returned to the caller (retry
    /// next tick). Once a job is in hand every failure is reported upstream
    /// as `failed`; only a failed report itself comes back as an error.
    pub async fn run_once(&self) -> Result<Tick, AgentError> {
        let Some(job) = self.poll().await? else {
            return Ok(Tick::Idle);
        };

        let printer = if job.printer_id.trim().is_empty() {
            self.config.printer_name.clone()
        } else {
            job.printer_id.clone()
        };
        tracing::info!(job_id = %job.id, printer = %printer, "picked up print job");

        let file = self.download_path(job.id);
        let outcome = self.download_and_print(&job, &printer, &file).await;

        let (update, tick) = match outcome {
            Ok(()) => {
                if let Err(e) = tokio::fs::remove_file(&file).await {
                    tracing::warn!(job_id = %job.id, "failed to remove {}: {e}", file.display());
                }
                tracing::info!(job_id = %job.id, printer = %printer, "job printed");
                (StatusUpdate::done(format!("printed on {printer}")), Tick::Printed(job.id))
            }
            Err(message) => {
                tracing::error!(job_id = %job.id, printer = %printer, "print failed: {message}");
                (StatusUpdate::failed(message.clone()), Tick::Failed(job.id, message))
            }
        };

        self.client.report(job.id, &update).await?;
        Ok(tick)
    }

    async fn download_and_print(&self, job: &PrintJob, printer: &str, file: &std::path::Path) -> Result<(), String> {
        let size = self
            .client
            .download(job, file)
            .await
            .map_err(|e| format!("download failed: {e}"))?;
        tracing::debug!(job_id = %job.id, size, "payload downloaded");

        self.config
            .print_command
            .print(printer, file)
            .await
            .map_err(|e| e.to_string())
    }

    /// Run until `shutdown` is requested.
    pub async fn run(self) {
        tracing::info!(
            server = %self.config.server_url,
            claim_mode = self.config.claim_mode,
            "print agent started"
        );

        loop {
            let delay = match self.run_once().await {
                Ok(tick) if !tick.is_idle() => Duration::ZERO,
                Ok(_) => self.config.poll_interval,
                Err(e) => {
                    tracing::warn!("agent step failed, retrying next tick: {e}");
                    self.config.poll_interval
                }
            };

            tokio::select! {
                biased;
                _ = self.shutdown.notified() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        tracing::info!("print agent stopped");
    }

    /// Spawn the loop on the current runtime.
    pub fn start(self) -> PrintAgentHandle {
        let shutdown = self.shutdown.clone();
        let join = tokio::spawn(self.run());
        PrintAgentHandle { shutdown, join }
    }
}
