//! Static game registry for name-based game lookup
//!
//! This module provides a thread-safe registry that maps game names to
//! factories, and a parser for game strings of the form
//! `name(key=value,key=value)`, so tools can load a game from a command line
//! argument such as `dots_and_boxes(num_rows=2,num_cols=2)`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use tracing::warn;

use crate::erased::ErasedGame;
use crate::typed::ConfigurationError;

/// Factory function type for creating game instances from a parsed game string
pub type GameFactory = fn(&GameSpec) -> Result<Box<dyn ErasedGame>, ConfigurationError>;

/// Thread-safe registry mapping game names to game factory functions
static REGISTRY: Lazy<Mutex<HashMap<String, GameFactory>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Error returned when a game string cannot be turned into a game
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("Malformed game string '{input}': {reason}")]
    Parse { input: String, reason: String },
    #[error("Unknown game '{0}'")]
    UnknownGame(String),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// A game name plus its parameters, parsed from `name(key=value,...)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSpec {
    pub name: String,
    pub params: BTreeMap<String, String>,
}

impl GameSpec {
    /// Parse a game string
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Parse` on an empty name, unbalanced
    /// parentheses, or a parameter without `=`.
    pub fn parse(input: &str) -> Result<Self, RegistryError> {
        let malformed = |reason: &str| RegistryError::Parse {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        let (name, rest) = match trimmed.find('(') {
            Some(open) => (&trimmed[..open], Some(&trimmed[open + 1..])),
            None => (trimmed, None),
        };

        let name = name.trim();
        if name.is_empty() {
            return Err(malformed("missing game name"));
        }
        if name.contains(')') {
            return Err(malformed("unexpected ')'"));
        }

        let mut params = BTreeMap::new();
        if let Some(rest) = rest {
            let body = rest
                .strip_suffix(')')
                .ok_or_else(|| malformed("missing closing ')'"))?;
            if body.contains('(') || body.contains(')') {
                return Err(malformed("nested parentheses are not supported"));
            }

            for pair in body.split(',').map(str::trim).filter(|pair| !pair.is_empty()) {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| malformed("parameters must look like key=value"))?;
                params.insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        Ok(Self { name: name.to_string(), params })
    }

    /// Read a parameter as `T`, falling back to `default` when absent
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::Parameter` if the value does not parse.
    pub fn get_or<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigurationError> {
        match self.params.get(key) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|_| ConfigurationError::Parameter {
                key: key.to_string(),
                value: value.clone(),
            }),
        }
    }
}

impl fmt::Display for GameSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.params.is_empty() {
            let params = self
                .params
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect::<Vec<_>>()
                .join(",");
            write!(f, "({})", params)?;
        }
        Ok(())
    }
}

/// Register a game with the global registry
///
/// Registering the same name twice replaces the earlier factory.
///
/// # Arguments
///
/// * `name` - Unique game name (e.g., "tictactoe")
/// * `factory` - Function that creates new instances of the game
pub fn register_game(name: String, factory: GameFactory) {
    let mut registry = REGISTRY.lock().unwrap();
    if registry.contains_key(&name) {
        warn!("Overriding existing game registration for '{}'", name);
    }
    registry.insert(name, factory);
}

/// Parse a game string and create the game it names
///
/// # Example
///
/// ```rust
/// # use engine_core::registry::*;
///
/// match load_game("tictactoe") {
///     Ok(game) => println!("Loaded {}", game.game_type().short_name),
///     Err(e) => println!("Could not load game: {}", e),
/// }
/// ```
///
/// # Errors
///
/// Returns `RegistryError` if the string is malformed, the name is not
/// registered, or the factory rejects the parameters.
pub fn load_game(input: &str) -> Result<Box<dyn ErasedGame>, RegistryError> {
    let spec = GameSpec::parse(input)?;

    // Copy the factory out so the lock is not held while it runs.
    let factory = {
        let registry = REGISTRY.lock().unwrap();
        registry.get(&spec.name).copied()
    };

    let factory = factory.ok_or_else(|| RegistryError::UnknownGame(spec.name.clone()))?;
    Ok(factory(&spec)?)
}

/// Get list of all registered game names, sorted
pub fn list_registered_games() -> Vec<String> {
    let registry = REGISTRY.lock().unwrap();
    let mut names: Vec<String> = registry.keys().cloned().collect();
    names.sort();
    names
}

/// Check if a game is registered
pub fn is_registered(name: &str) -> bool {
    let registry = REGISTRY.lock().unwrap();
    registry.contains_key(name)
}

/// Clear all registered games (mainly for testing)
pub fn clear_registry() {
    let mut registry = REGISTRY.lock().unwrap();
    registry.clear();
}
