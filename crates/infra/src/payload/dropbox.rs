//! Dropbox-backed remote store.
//!
//! Access tokens come from the refresh-token grant and are cached until
//! shortly before they expire.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use serde::Deserialize;

use printdesk_core::TtlCache;

use super::{RemoteStore, RemoteStoreError};
use crate::config::DropboxCredentials;

const API_BASE: &str = "https://api.dropboxapi.com";
const CONTENT_BASE: &str = "https://content.dropboxapi.com";
const UPLOAD_FOLDER: &str = "/prints";
const TOKEN_KEY: &str = "access_token";
/// Refresh this long before Dropbox says the token expires.
const TOKEN_SAFETY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    path_lower: String,
}

#[derive(Debug, Deserialize)]
struct TemporaryLinkResponse {
    link: String,
}

#[derive(Debug)]
pub struct DropboxStore {
    client: reqwest::Client,
    credentials: DropboxCredentials,
    api_base: String,
    content_base: String,
    tokens: TtlCache<&'static str, String>,
}

impl DropboxStore {
    pub fn new(credentials: DropboxCredentials) -> Self {
        Self::with_endpoints(credentials, API_BASE, CONTENT_BASE)
    }

    /// Point the client at alternative API hosts (mock servers in tests).
    pub fn with_endpoints(
        credentials: DropboxCredentials,
        api_base: impl Into<String>,
        content_base: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            content_base: content_base.into().trim_end_matches('/').to_string(),
            tokens: TtlCache::new(),
        }
    }

    async fn access_token(&self) -> Result<String, RemoteStoreError> {
        if let Some(token) = self.tokens.get(&TOKEN_KEY) {
            return Ok(token);
        }

        let resp = self
            .client
            .post(format!("{}/oauth2/token", self.api_base))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.credentials.refresh_token.as_str()),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| RemoteStoreError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteStoreError::Auth(format!("token refresh returned {status}: {body}")));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| RemoteStoreError::Decode(e.to_string()))?;

        let ttl = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_SAFETY_MARGIN);
        self.tokens.insert(TOKEN_KEY, token.access_token.clone(), ttl);
        tracing::debug!("refreshed dropbox access token");
        Ok(token.access_token)
    }

    async fn check(&self, resp: reqwest::Response) -> Result<reqwest::Response, RemoteStoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate(&TOKEN_KEY);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(RemoteStoreError::Api(status.as_u16(), body))
    }
}

#[async_trait]
impl RemoteStore for DropboxStore {
    async fn upload(&self, filename: &str, bytes: Bytes) -> Result<String, RemoteStoreError> {
        let token = self.access_token().await?;
        let arg = serde_json::json!({
            "path": format!("{UPLOAD_FOLDER}/{filename}"),
            "mode": "add",
            "autorename": true,
            "mute": true,
        });

        let resp = self
            .client
            .post(format!("{}/2/files/upload", self.content_base))
            .bearer_auth(&token)
            .header("Dropbox-API-Arg", arg.to_string())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|e| RemoteStoreError::Network(e.to_string()))?;
        let uploaded: UploadResponse = self
            .check(resp)
            .await?
            .json()
            .await
            .map_err(|e| RemoteStoreError::Decode(e.to_string()))?;

        let resp = self
            .client
            .post(format!("{}/2/files/get_temporary_link", self.api_base))
            .bearer_auth(&token)
            .json(&serde_json::json!({ "path": uploaded.path_lower }))
            .send()
            .await
            .map_err(|e| RemoteStoreError::Network(e.to_string()))?;
        let link: TemporaryLinkResponse = self
            .check(resp)
            .await?
            .json()
            .await
            .map_err(|e| RemoteStoreError::Decode(e.to_string()))?;

        Ok(link.link)
    }
}
