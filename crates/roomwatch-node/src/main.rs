//! Roomwatch Node binary
//!
//! Ingests occupancy transitions and telemetry from room sensors.

use roomwatch_node::{NodeConfig, RoomwatchNode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomwatch_node=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Roomwatch node");

    let config = NodeConfig::from_env()?;

    let node = RoomwatchNode::new(config).await?;
    node.run().await?;

    Ok(())
}
