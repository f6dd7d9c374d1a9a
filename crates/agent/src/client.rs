//! HTTP client for the print server's agent endpoints.

use std::path::Path;

use reqwest::StatusCode;
use serde_json::json;

use printdesk_core::{JobId, PrintJob, StatusUpdate};

use crate::error::AgentError;

pub const AGENT_KEY_HEADER: &str = "X-Agent-Key";

#[derive(Debug, Clone)]
pub struct PrintServerClient {
    client: reqwest::Client,
    base_url: String,
    agent_key: Option<String>,
}

impl PrintServerClient {
    pub fn new(base_url: impl Into<String>, agent_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_key(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.agent_key {
            Some(key) => req.header(AGENT_KEY_HEADER, key),
            None => req,
        }
    }

    async fn send(&self, url: &str, req: reqwest::RequestBuilder) -> Result<reqwest::Response, AgentError> {
        let resp = req.send().await.map_err(|e| AgentError::Http {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentError::Api {
                url: url.to_string(),
                status,
                body,
            });
        }
        Ok(resp)
    }

    async fn job_or_empty(&self, url: &str, resp: reqwest::Response) -> Result<Option<PrintJob>, AgentError> {
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let job = resp.json::<PrintJob>().await.map_err(|e| AgentError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(job))
    }

    /// Oldest queued job, without claiming it.
    pub async fn next_job(&self) -> Result<Option<PrintJob>, AgentError> {
        let url = self.url("/prints?next=true");
        let resp = self.send(&url, self.with_key(self.client.get(&url))).await?;
        self.job_or_empty(&url, resp).await
    }

    /// Lease the next free queued job to `agent_id`.
    pub async fn claim_job(&self, agent_id: &str) -> Result<Option<PrintJob>, AgentError> {
        let url = self.url("/prints/claim");
        let req = self
            .with_key(self.client.post(&url))
            .json(&json!({ "agentId": agent_id }));
        let resp = self.send(&url, req).await?;
        self.job_or_empty(&url, resp).await
    }

    /// Fetch the document into `dest`: from the temporary link when there is
    /// one, otherwise from the server's local copy.
    pub async fn download(&self, job: &PrintJob, dest: &Path) -> Result<u64, AgentError> {
        let (url, req) = match &job.temporary_link {
            Some(link) => (link.clone(), self.client.get(link)),
            None => {
                let url = self.url(&format!("/prints/{}/file", job.id));
                let req = self.with_key(self.client.get(&url));
                (url, req)
            }
        };

        let resp = self.send(&url, req).await?;
        let bytes = resp.bytes().await.map_err(|e| AgentError::Http {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        tokio::fs::write(dest, &bytes).await.map_err(|e| AgentError::Io {
            path: dest.to_path_buf(),
            source: e,
        })?;
        Ok(bytes.len() as u64)
    }

    pub async fn report(&self, job_id: JobId, update: &StatusUpdate) -> Result<(), AgentError> {
        let url = self.url(&format!("/prints/{job_id}/status"));
        let req = self.with_key(self.client.post(&url)).json(&json!({
            "status": update.status.map(|s| s.as_str()),
            "message": update.message,
        }));
        self.send(&url, req).await?;
        Ok(())
    }
}
