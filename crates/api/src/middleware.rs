use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::app::errors::ApiError;

/// Header carrying the agent's shared secret.
pub const AGENT_KEY_HEADER: &str = "x-agent-key";

/// Shared-secret check for agent-only endpoints.
///
/// With no key configured every caller is accepted.
#[derive(Debug, Clone, Default)]
pub struct AgentAuth {
    key: Option<Arc<str>>,
}

impl AgentAuth {
    pub fn new(key: Option<String>) -> Self {
        Self {
            key: key.map(Arc::from),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn check(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        let Some(expected) = &self.key else {
            return Ok(());
        };

        let provided = headers
            .get(AGENT_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        if provided != &**expected {
            return Err(ApiError::Unauthorized);
        }
        Ok(())
    }
}

pub async fn require_agent_key(
    State(auth): State<AgentAuth>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    auth.check(req.headers())?;
    Ok(next.run(req).await)
}
