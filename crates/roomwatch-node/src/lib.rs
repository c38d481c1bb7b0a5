//! Roomwatch - occupancy and telemetry ingestion for monitored rooms
//!
//! Sensor devices authenticate with a per-room token and report either
//! card transitions (enter/exit) or raw state readings. The node turns them
//! into a consistent, append-only occupancy history.
//!
//! # Architecture
//!
//! - **Storage**: RocksDB `TransactionDB`, one pessimistic transaction per call
//! - **Resolver**: exact device-token to room lookup, fails closed
//! - **Engine**: membership transitions and state reports, all-or-nothing
//! - **Summary**: live occupancy plus latest and averaged telemetry per room
//! - **API**: HTTP endpoints for devices and dashboards
//! - **Admin Socket**: Unix socket for room provisioning (roomwatch-admin CLI)
//!
//! # Example
//!
//! ```no_run
//! use roomwatch_node::{NodeConfig, RoomwatchNode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NodeConfig::from_env()?;
//!     let node = RoomwatchNode::new(config).await?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod admin_socket;
pub mod api;
pub mod engine;
pub mod error;
pub mod node;
pub mod resolver;
pub mod storage;
pub mod summary;

pub use engine::OccupancyEngine;
pub use error::{Error, Result};
pub use node::{NodeConfig, NodeState, RoomwatchNode};
pub use resolver::TokenResolver;
pub use storage::{Storage, StoreTxn, TokenLookup};
