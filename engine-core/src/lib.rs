//! Core traits and types for two-player game engines
//!
//! This crate provides the fundamental abstractions used by the agent server
//! and the solver:
//! - `Game`: Typed capability trait every game engine implements
//! - `Agent`: Move-selection capability bound to one player
//! - `minimax`: Exhaustive game-tree search
//! - `ErasedGame`: Runtime interface without associated types
//! - `GameAdapter`: Automatic conversion from typed to erased interface
//! - `Registry`: Static registration system for games, keyed by name

pub mod typed;
pub mod agent;
pub mod minimax;
pub mod erased;
pub mod adapter;
pub mod registry;

// Re-export main types for convenience
pub use typed::{Action, ConfigurationError, EngineError, Game, GameType, Player, Turn};
pub use agent::Agent;
pub use minimax::{best_action, solve, SolveError};
pub use erased::ErasedGame;
pub use adapter::GameAdapter;
pub use registry::{load_game, register_game, GameFactory, GameSpec, RegistryError};
