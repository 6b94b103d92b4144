//! Dots and Boxes websocket agent server
//!
//! This crate plays dots and boxes games for the web interface's websocket
//! protocol, one session per game, each bound to its own agent.

pub mod agents;
pub mod config;
pub mod protocol;
pub mod registry_init;
pub mod service;
pub mod session;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

// Re-export main types
pub use agents::{AgentFactory, AgentKind, MinimaxAgent, RandomAgent};
pub use config::Config;
pub use protocol::{Connection, Inbound, Outbound, ProtocolError};
pub use service::{serve_connection, AppState, Frame};
pub use session::{Session, SessionConfig, SessionError, SessionRegistry};

/// Install the global `tracing` subscriber
///
/// `RUST_LOG` directives take precedence over `default_level`.
pub fn init_tracing(default_level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
