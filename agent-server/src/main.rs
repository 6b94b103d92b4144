//! Agent server binary
//!
//! Main entry point for the Dots and Boxes websocket agent.

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use agent_server::{init_tracing, registry_init, service, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration
    let config = Config::parse();

    // Validate configuration
    config.validate()?;

    // Initialize tracing
    init_tracing(config.log_filter());

    registry_init::initialize_registry();

    info!(
        "Starting {:?} agent (exhaustive limit {}) on {}",
        config.agent, config.exhaustive_limit, config.listen_addr
    );

    match service::run(&config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Server failed: {}", e);
            Err(e)
        }
    }
}
