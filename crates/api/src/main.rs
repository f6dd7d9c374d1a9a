use anyhow::Context;

use printdesk_infra::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    printdesk_observability::init();

    let config = ServerConfig::from_env().context("invalid server configuration")?;
    if config.agent_key.is_none() {
        tracing::warn!("PRINT_AGENT_KEY not set; agent endpoints are unauthenticated");
    }

    let app = printdesk_api::app::build_app(&config)
        .with_context(|| format!("failed to open job store at {}", config.prints_dir.display()))?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        prints_dir = %config.prints_dir.display(),
        remote_storage = config.dropbox.is_some(),
        "listening on {}",
        listener.local_addr()?
    );

    axum::serve(listener, app).await?;
    Ok(())
}
