//! Built-in agents
//!
//! Every session gets its own agent instance from an [`AgentFactory`]. The
//! random agent is the baseline; the minimax agent searches the full tree
//! once the position is small enough and plays randomly before that.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, Result};
use clap::ValueEnum;
use engine_core::{best_action, Action, Agent, Game};
use rand::prelude::*;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which built-in agent to bind to new sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Random,
    Minimax,
}

/// Agent that selects legal actions uniformly at random
pub struct RandomAgent {
    rng: ChaCha20Rng,
}

impl RandomAgent {
    pub fn new() -> Self {
        Self { rng: ChaCha20Rng::from_entropy() }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { rng: ChaCha20Rng::seed_from_u64(seed) }
    }
}

impl Default for RandomAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Game> Agent<G> for RandomAgent {
    fn step(&mut self, game: &G, state: &G::State) -> Result<Action> {
        game.legal_actions(state)
            .choose(&mut self.rng)
            .copied()
            .ok_or_else(|| anyhow!("No legal actions available"))
    }
}

/// Agent that plays perfectly once few enough legal actions remain
///
/// Full search cost grows with the factorial of the remaining moves, so
/// positions with more than `exhaustive_limit` legal actions are handed to a
/// random fallback.
pub struct MinimaxAgent {
    exhaustive_limit: usize,
    fallback: RandomAgent,
}

impl MinimaxAgent {
    pub fn new(exhaustive_limit: usize, fallback: RandomAgent) -> Self {
        Self { exhaustive_limit, fallback }
    }

    pub fn exhaustive_limit(&self) -> usize {
        self.exhaustive_limit
    }
}

impl<G: Game> Agent<G> for MinimaxAgent {
    fn step(&mut self, game: &G, state: &G::State) -> Result<Action> {
        let num_legal = game.legal_actions(state).len();
        if num_legal > self.exhaustive_limit {
            debug!(num_legal, limit = self.exhaustive_limit, "position too large, playing randomly");
            return self.fallback.step(game, state);
        }

        let (action, value) = best_action(game, state)?;
        debug!(action, value, "exhaustive search finished");
        Ok(action)
    }
}

/// Builds one agent per session
///
/// With a base seed, the n-th agent is seeded with `seed + n` so a server
/// run is reproducible without two sessions sharing a random stream.
#[derive(Debug)]
pub struct AgentFactory {
    kind: AgentKind,
    exhaustive_limit: usize,
    seed: Option<u64>,
    created: AtomicU64,
}

impl AgentFactory {
    pub fn new(kind: AgentKind, exhaustive_limit: usize, seed: Option<u64>) -> Self {
        Self { kind, exhaustive_limit, seed, created: AtomicU64::new(0) }
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    /// Create a fresh agent for game `G`
    pub fn create<G: Game>(&self) -> Box<dyn Agent<G>> {
        let index = self.created.fetch_add(1, Ordering::Relaxed);
        let random = match self.seed {
            Some(seed) => RandomAgent::with_seed(seed.wrapping_add(index)),
            None => RandomAgent::new(),
        };

        match self.kind {
            AgentKind::Random => Box::new(random),
            AgentKind::Minimax => Box::new(MinimaxAgent::new(self.exhaustive_limit, random)),
        }
    }
}
