//! kwin-bridge - KWin scripting MCP server
//!
//! Serves window and desktop management for KDE Plasma over the Model
//! Context Protocol on stdio.

use kwin_bridge::config::BridgeConfig;
use kwin_bridge::server::KWinServer;
use rmcp::ServiceExt;
use rmcp::transport::io::stdio;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (stderr to keep stdout clean for MCP protocol)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".to_string().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting kwin-bridge MCP Server");

    let config = BridgeConfig::load()?;
    tracing::debug!("Loaded configuration: {:?}", config);

    let server = KWinServer::new(&config).await?;

    let transport = stdio();

    tracing::info!("kwin-bridge MCP Server ready, listening on stdio");

    let service = server.serve(transport).await?;

    // Wait for graceful shutdown
    service.waiting().await?;

    tracing::info!("kwin-bridge MCP Server shutting down");
    Ok(())
}
