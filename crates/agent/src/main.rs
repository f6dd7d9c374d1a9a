use anyhow::Context;

use printdesk_agent::{AgentConfig, PrintAgent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    printdesk_observability::init();

    let config = AgentConfig::from_env().context("invalid agent configuration")?;
    if config.agent_key.is_none() {
        tracing::warn!("PRINT_AGENT_KEY not set; requests are sent without X-Agent-Key");
    }

    let agent = PrintAgent::new(config);
    agent
        .prepare()
        .await
        .context("failed to create agent working directory")?;

    let handle = agent.start();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown requested");
    handle.shutdown().await;

    Ok(())
}
