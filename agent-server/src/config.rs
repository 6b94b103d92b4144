use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser};
use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;

use crate::agents::AgentKind;

const LEVELS: [LevelFilter; 5] = [
    LevelFilter::ERROR,
    LevelFilter::WARN,
    LevelFilter::INFO,
    LevelFilter::DEBUG,
    LevelFilter::TRACE,
];

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(name = "agent-server")]
#[command(about = "Dots and Boxes websocket agent")]
#[command(long_about = "Websocket agent for the Dots and Boxes web interface.

Point the interface at ws://<listen-addr> as one of the players. Every game
started over a connection gets its own agent instance; games are dropped when
their connection closes.")]
pub struct Config {
    /// Address to accept websocket connections on
    #[arg(long, env = "AGENT_LISTEN_ADDR", default_value = "127.0.0.1:5001")]
    pub listen_addr: String,

    /// Agent bound to each new game
    #[arg(long, env = "AGENT_KIND", value_enum, default_value_t = AgentKind::Minimax)]
    pub agent: AgentKind,

    /// Largest number of legal actions the minimax agent searches exhaustively
    #[arg(long, env = "AGENT_EXHAUSTIVE_LIMIT", default_value = "8")]
    pub exhaustive_limit: usize,

    /// Base seed for agent randomness (random when absent)
    #[arg(long, env = "AGENT_SEED")]
    pub seed: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "AGENT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// More output; repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Less output; repeat for less
    #[arg(short, long, action = ArgAction::Count)]
    pub quiet: u8,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.is_empty() {
            return Err(anyhow!("listen_addr cannot be empty"));
        }

        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(anyhow!("listen_addr '{}' is not a socket address", self.listen_addr));
        }

        if self.exhaustive_limit == 0 {
            return Err(anyhow!("exhaustive_limit must be greater than 0"));
        }

        if LevelFilter::from_str(&self.log_level).is_err() {
            return Err(anyhow!("log_level '{}' is not a valid level", self.log_level));
        }

        Ok(())
    }

    /// Configured level shifted by the -v and -q counters
    pub fn log_filter(&self) -> LevelFilter {
        let base = LevelFilter::from_str(&self.log_level).unwrap_or(LevelFilter::INFO);
        let index = LEVELS.iter().position(|level| *level == base).unwrap_or(2) as i32;
        let shifted = index + i32::from(self.verbose) - i32::from(self.quiet);
        if shifted < 0 {
            LevelFilter::OFF
        } else {
            LEVELS[(shifted as usize).min(LEVELS.len() - 1)]
        }
    }
}
