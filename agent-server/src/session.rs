//! Game sessions and the registry that owns them
//!
//! A session is one dots and boxes game in which this server plays one seat.
//! Sessions are keyed by the string the peer puts in the `game` field of its
//! messages. The registry is shared by every connection, so lookups hand out
//! reference-counted handles and the registry lock is never held while an
//! agent thinks.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use engine_core::{Action, Agent, ConfigurationError, EngineError, Game, Player, Turn};
use games_dotsboxes::{Coordinate, DotsAndBoxes, State};
use tracing::{debug, info};

/// Seat numbers as they appear on the wire
pub const FIRST_PLAYER: u8 = 1;
pub const SECOND_PLAYER: u8 = 2;

/// Errors raised by session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Game {0} already running")]
    Duplicate(String),
    #[error("Unknown game {0}")]
    Unknown(String),
    #[error("Game {0} is over")]
    Ended(String),
    #[error("Not our turn in game {key}: we are player {ours}")]
    NotOurTurn { key: String, ours: u8 },
    #[error("Game {0} was ended before reaching a terminal state")]
    NotTerminal(String),
    #[error("Game {0} was started by another connection")]
    NotOwner(String),
    #[error("Time limit must be a positive number of seconds, got {0}")]
    TimeLimit(f64),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("Agent failed to produce a move: {0:#}")]
    Agent(anyhow::Error),
}

/// Convert a wire seat number (1 or 2) to a player index
///
/// # Errors
///
/// Returns `ConfigurationError::InvalidPlayer` for anything else.
pub fn player_index(wire_player: u8) -> Result<Player, ConfigurationError> {
    match wire_player {
        FIRST_PLAYER | SECOND_PLAYER => Ok(usize::from(wire_player) - 1),
        other => Err(ConfigurationError::InvalidPlayer { player: usize::from(other), num_players: 2 }),
    }
}

/// Parameters of a `start` message
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Our seat, 1 or 2
    pub player: u8,
    pub num_rows: usize,
    pub num_cols: usize,
    /// Seconds allowed per move
    pub time_limit: f64,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), SessionError> {
        player_index(self.player)?;
        DotsAndBoxes::new(self.num_rows, self.num_cols)?;
        if !self.time_limit.is_finite() || self.time_limit <= 0.0 {
            return Err(SessionError::TimeLimit(self.time_limit));
        }
        Ok(())
    }
}

/// One running game
pub struct Session {
    key: String,
    config: SessionConfig,
    player: Player,
    game: DotsAndBoxes,
    state: State,
    agent: Box<dyn Agent<DotsAndBoxes>>,
    ended: bool,
}

impl Session {
    /// Create a session at the initial position
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Configuration` if the seat or the board size
    /// is invalid, and `SessionError::TimeLimit` for a time limit that is
    /// not a positive number.
    pub fn new(
        key: impl Into<String>,
        config: SessionConfig,
        agent: Box<dyn Agent<DotsAndBoxes>>,
    ) -> Result<Self, SessionError> {
        let key = key.into();
        config.validate()?;
        let player = player_index(config.player)?;
        let game = DotsAndBoxes::new(config.num_rows, config.num_cols)?;
        let state = game.new_initial_state();

        info!(
            game = %key,
            "Creating game: dots_and_boxes(num_rows={},num_cols={}) as player {}",
            config.num_rows, config.num_cols, config.player
        );

        Ok(Self { key, config, player, game, state, agent, ended: false })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn game(&self) -> &DotsAndBoxes {
        &self.game
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Whether `end` has been processed
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Whether no further action can be applied
    pub fn is_over(&self) -> bool {
        self.ended || self.game.is_terminal(&self.state)
    }

    pub fn is_our_turn(&self) -> bool {
        self.game.current_player(&self.state) == Turn::Player(self.player)
    }

    /// Record a move made by `wire_player`
    ///
    /// Moves reported for our own seat were already applied by
    /// [`Session::next_action`] and are ignored. Returns the applied action,
    /// or `None` when the move was ignored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Ended` once the game is over, and a
    /// configuration or engine error if the move is off the board or
    /// illegal. The state is unchanged on error.
    pub fn register_action(
        &mut self,
        coordinate: Coordinate,
        wire_player: u8,
    ) -> Result<Option<Action>, SessionError> {
        if self.is_over() {
            return Err(SessionError::Ended(self.key.clone()));
        }
        self.apply_external(coordinate, wire_player)
    }

    /// Ask the agent for its move, apply it, and return it as a coordinate
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Ended` once the game is over,
    /// `SessionError::NotOurTurn` if the opponent is to move, and
    /// `SessionError::Agent` or `SessionError::Engine` if the agent fails or
    /// proposes an illegal move.
    pub fn next_action(&mut self) -> Result<Coordinate, SessionError> {
        if self.is_over() {
            return Err(SessionError::Ended(self.key.clone()));
        }
        if !self.is_our_turn() {
            return Err(SessionError::NotOurTurn { key: self.key.clone(), ours: self.config.player });
        }

        info!(
            game = %self.key,
            "Computing next move (grid={}x{}, player={})",
            self.config.num_rows, self.config.num_cols, self.config.player
        );
        let action = self.agent.step(&self.game, &self.state).map_err(SessionError::Agent)?;
        let coordinate = self.game.decode(action)?;
        self.game.apply_action(&mut self.state, action)?;
        debug!(game = %self.key, "Current state:\n{}", self.state);

        Ok(coordinate)
    }

    /// Close the game, applying the final move first when it is given
    ///
    /// Returns the final payoffs, indexed by player.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotTerminal` if the game is not over after
    /// the final move. The session stays open in that case.
    pub fn end_game(&mut self, last_move: Option<(Coordinate, u8)>) -> Result<Vec<f64>, SessionError> {
        if self.ended {
            return Err(SessionError::Ended(self.key.clone()));
        }
        if let Some((coordinate, wire_player)) = last_move {
            if !self.game.is_terminal(&self.state) {
                self.apply_external(coordinate, wire_player)?;
            }
        }
        if !self.game.is_terminal(&self.state) {
            return Err(SessionError::NotTerminal(self.key.clone()));
        }

        self.ended = true;
        let returns = self.game.returns(&self.state);
        info!(game = %self.key, "Game ended. Returns = {:?}", returns);
        debug!(game = %self.key, "End state:\n{}", self.state);
        Ok(returns)
    }

    fn apply_external(&mut self, coordinate: Coordinate, wire_player: u8) -> Result<Option<Action>, SessionError> {
        let player = player_index(wire_player)?;
        if player == self.player {
            debug!(game = %self.key, "Ignoring our own move");
            return Ok(None);
        }

        let action = self.game.encode(coordinate)?;
        self.game.apply_action(&mut self.state, action)?;
        self.agent.inform_action(&self.game, &self.state, player, action);
        debug!(game = %self.key, action, "Applied action of player {}:\n{}", wire_player, self.state);

        Ok(Some(action))
    }
}

/// Shared handle to a session
pub type SessionHandle = Arc<Mutex<Session>>;

/// Process-wide table of running sessions
///
/// Create and remove happen under one lock, so two connections racing to
/// start the same key see exactly one success. Sessions are built before
/// the lock is taken.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session under `key`
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Duplicate` if `key` is already running (the
    /// existing session is left alone), or a configuration error from
    /// [`Session::new`].
    pub fn create(
        &self,
        key: &str,
        config: SessionConfig,
        agent: Box<dyn Agent<DotsAndBoxes>>,
    ) -> Result<SessionHandle, SessionError> {
        let session = Session::new(key, config, agent)?;

        let mut sessions = self.sessions.lock().unwrap();
        match sessions.entry(key.to_string()) {
            Entry::Occupied(_) => Err(SessionError::Duplicate(key.to_string())),
            Entry::Vacant(entry) => Ok(Arc::clone(entry.insert(Arc::new(Mutex::new(session))))),
        }
    }

    /// Look up a running session
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Unknown` if no session has this key.
    pub fn get(&self, key: &str) -> Result<SessionHandle, SessionError> {
        let sessions = self.sessions.lock().unwrap();
        sessions
            .get(key)
            .cloned()
            .ok_or_else(|| SessionError::Unknown(key.to_string()))
    }

    /// Retire a session; returns false if there was nothing to remove
    pub fn remove(&self, key: &str) -> bool {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        let sessions = self.sessions.lock().unwrap();
        sessions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        let sessions = self.sessions.lock().unwrap();
        sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
