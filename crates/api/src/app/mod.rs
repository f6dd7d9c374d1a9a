//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: job store and payload storage wiring
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Extension, Router};
use tower::ServiceBuilder;

use printdesk_infra::{JobStoreError, ServerConfig};

use crate::middleware::{self, AgentAuth};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(config: &ServerConfig) -> Result<Router, JobStoreError> {
    let services = services::build_services(config)?;
    Ok(router(
        services,
        AgentAuth::new(config.agent_key.clone()),
        config.max_upload_bytes,
    ))
}

/// Router over already-built services (tests inject fakes here).
pub fn router(services: AppServices, agent_auth: AgentAuth, max_upload_bytes: usize) -> Router {
    let services = Arc::new(services);

    // Agent-only routes: require the shared secret when one is configured.
    let agent = routes::prints::agent_router().route_layer(axum::middleware::from_fn_with_state(
        agent_auth.clone(),
        middleware::require_agent_key,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::prints::router())
        .merge(agent)
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(max_upload_bytes))
                .layer(Extension(services))
                .layer(Extension(agent_auth)),
        )
}
