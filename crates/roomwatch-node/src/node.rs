//! Roomwatch Node - the main application entry point.
//!
//! Architecture:
//! - Single daemon process with shared RocksDB storage
//! - HTTP API for devices (transitions, state reports) and room summaries
//! - Unix admin socket for local room administration (roomwatch-admin CLI)

use crate::admin_socket::AdminSocket;
use crate::api;
use crate::engine::OccupancyEngine;
use crate::error::{Error, Result};
use crate::storage::{Storage, DEFAULT_LOCK_TIMEOUT};
use roomwatch_core::{TokenPolicy, DEFAULT_TOKEN_LEN};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a Roomwatch node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Data directory for storage
    pub data_dir: PathBuf,

    /// HTTP API listen address
    pub api_addr: SocketAddr,

    /// Admin socket path (for roomwatch-admin CLI)
    pub admin_socket: PathBuf,

    /// Expected shape of device tokens
    pub token_policy: TokenPolicy,

    /// How long a transaction waits for a row lock
    pub lock_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("./roomwatch-data");
        Self {
            admin_socket: data_dir.join("admin.sock"),
            data_dir,
            api_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            token_policy: TokenPolicy::new(DEFAULT_TOKEN_LEN),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("invalid {}={:?}: {}", name, raw, e))),
        Err(_) => Ok(default),
    }
}

impl NodeConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let data_dir = std::env::var("ROOMWATCH_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let api_addr = env_parse("ROOMWATCH_API_ADDR", defaults.api_addr)?;

        let admin_socket = std::env::var("ROOMWATCH_ADMIN_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("admin.sock"));

        let token_len = env_parse("ROOMWATCH_TOKEN_LEN", defaults.token_policy.expected_len)?;
        if token_len == 0 {
            return Err(Error::Config("ROOMWATCH_TOKEN_LEN must be positive".into()));
        }

        let lock_timeout_ms = env_parse(
            "ROOMWATCH_LOCK_TIMEOUT_MS",
            defaults.lock_timeout.as_millis() as u64,
        )?;

        Ok(Self {
            data_dir,
            api_addr,
            admin_socket,
            token_policy: TokenPolicy::new(token_len),
            lock_timeout: Duration::from_millis(lock_timeout_ms),
        })
    }
}

/// Shared state for the node - single storage instance shared by all components.
pub struct NodeState {
    pub storage: Arc<Storage>,
    pub engine: OccupancyEngine,
    pub config: NodeConfig,
}

impl NodeState {
    /// Wire an engine around already-open storage.
    pub fn new(storage: Arc<Storage>, config: NodeConfig) -> Self {
        let engine = OccupancyEngine::new(Arc::clone(&storage));
        Self {
            storage,
            engine,
            config,
        }
    }
}

/// A Roomwatch node instance.
pub struct RoomwatchNode {
    state: Arc<NodeState>,
    config: NodeConfig,
}

impl RoomwatchNode {
    /// Create a new node, opening storage under the data directory.
    pub async fn new(config: NodeConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let storage = Arc::new(Storage::open_with_lock_timeout(
            config.data_dir.join("db"),
            config.lock_timeout,
        )?);

        let state = Arc::new(NodeState::new(storage, config.clone()));
        Ok(Self { state, config })
    }

    /// Get the shared state (for API handlers).
    pub fn state(&self) -> Arc<NodeState> {
        Arc::clone(&self.state)
    }

    /// Run the node (starts admin socket and HTTP server).
    pub async fn run(self) -> Result<()> {
        tracing::info!("Roomwatch node starting");
        tracing::info!("  API: http://{}", self.config.api_addr);
        tracing::info!("  Admin: {:?}", self.config.admin_socket);
        tracing::info!("  Data: {:?}", self.config.data_dir);

        let admin_socket = AdminSocket::new(
            Arc::clone(&self.state.storage),
            self.config.admin_socket.clone(),
            self.config.token_policy,
        );
        tokio::spawn(async move {
            if let Err(e) = admin_socket.run().await {
                tracing::error!("Admin socket error: {}", e);
            }
        });

        let app = api::build_router(self.state());

        let listener = tokio::net::TcpListener::bind(self.config.api_addr).await?;
        tracing::info!("HTTP server listening on {}", self.config.api_addr);

        axum::serve(listener, app).await?;

        Ok(())
    }
}
