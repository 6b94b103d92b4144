//! Typed Game trait describing a turn-based game engine
//!
//! The search and session layers only ever talk to a game through this
//! capability set: create the initial state, ask who moves, enumerate and
//! apply actions, and read payoffs once the game is over.

use std::fmt;

/// Index of a player, `0` or `1` in a two-player game
pub type Player = usize;

/// Engine-defined action index in `[0, num_distinct_actions)`
pub type Action = usize;

/// Who acts in a given state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    /// A regular player is to move
    Player(Player),
    /// Nature samples the next outcome
    Chance,
    /// The game is over
    Terminal,
}

impl Turn {
    /// The player to move, if any
    pub fn player(self) -> Option<Player> {
        match self {
            Turn::Player(player) => Some(player),
            Turn::Chance | Turn::Terminal => None,
        }
    }
}

/// Whether the game contains chance events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanceMode {
    Deterministic,
    ExplicitStochastic,
    SampledStochastic,
}

/// Whether players see the full state when deciding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Information {
    PerfectInformation,
    ImperfectInformation,
}

/// How players take their turns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dynamics {
    /// Exactly one player acts per ply
    Sequential,
    /// All players act at once
    Simultaneous,
}

/// Relationship between the players' payoffs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utility {
    ZeroSum,
    ConstantSum,
    GeneralSum,
    Identical,
}

/// Static description of a game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameType {
    pub short_name: String,
    pub chance_mode: ChanceMode,
    pub information: Information,
    pub dynamics: Dynamics,
    pub utility: Utility,
}

impl GameType {
    /// Metadata shared by every deterministic, perfect-information,
    /// sequential, zero-sum game
    pub fn two_player_zero_sum(short_name: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
            chance_mode: ChanceMode::Deterministic,
            information: Information::PerfectInformation,
            dynamics: Dynamics::Sequential,
            utility: Utility::ZeroSum,
        }
    }
}

/// Main trait for game engines
///
/// A `Game` value holds the rules and parameters (board size and the like);
/// positions live in `Self::State`. Every mutation of a state goes through
/// [`Game::apply_action`], and a rejected action must leave the state as it
/// was.
///
/// # Example
///
/// ```rust
/// # use engine_core::typed::*;
/// // Take one or two stones; whoever takes the last stone wins.
/// #[derive(Clone, Debug)]
/// struct Pile { stones: u32, to_move: Player }
///
/// impl std::fmt::Display for Pile {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         write!(f, "{} stones", self.stones)
///     }
/// }
///
/// struct Nim;
///
/// impl Game for Nim {
///     type State = Pile;
///
///     fn game_type(&self) -> GameType { GameType::two_player_zero_sum("nim") }
///     fn num_players(&self) -> usize { 2 }
///     fn num_distinct_actions(&self) -> usize { 2 }
///     fn new_initial_state(&self) -> Pile { Pile { stones: 4, to_move: 0 } }
///     fn is_terminal(&self, state: &Pile) -> bool { state.stones == 0 }
///     fn current_player(&self, state: &Pile) -> Turn {
///         if state.stones == 0 { Turn::Terminal } else { Turn::Player(state.to_move) }
///     }
///     fn legal_actions(&self, state: &Pile) -> Vec<Action> {
///         (0..2).filter(|&a| a as u32 + 1 <= state.stones).collect()
///     }
///     fn apply_action(&self, state: &mut Pile, action: Action) -> Result<(), EngineError> {
///         if !self.legal_actions(state).contains(&action) {
///             return Err(EngineError::IllegalAction { action });
///         }
///         state.stones -= action as u32 + 1;
///         state.to_move = 1 - state.to_move;
///         Ok(())
///     }
///     fn player_return(&self, state: &Pile, player: Player) -> f64 {
///         // The player who just moved took the last stone.
///         if player == state.to_move { -1.0 } else { 1.0 }
///     }
/// }
///
/// let state = Nim.new_initial_state();
/// assert_eq!(Nim.legal_actions(&state), vec![0, 1]);
/// ```
pub trait Game: Send + Sync + 'static {
    /// Position type, cloned whenever a search needs a private copy
    type State: Clone + fmt::Display + Send + 'static;

    /// Static metadata used to validate solver preconditions
    fn game_type(&self) -> GameType;

    /// Number of players taking part
    fn num_players(&self) -> usize;

    /// Size of the action space; every action lies in `[0, num_distinct_actions)`
    fn num_distinct_actions(&self) -> usize;

    /// Create the starting position
    fn new_initial_state(&self) -> Self::State;

    /// True once no further action may be applied
    fn is_terminal(&self, state: &Self::State) -> bool;

    /// Who acts next in `state`
    fn current_player(&self, state: &Self::State) -> Turn;

    /// Legal actions in ascending order; empty at terminal states
    fn legal_actions(&self, state: &Self::State) -> Vec<Action>;

    /// Apply `action` to `state` in place
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the action is not legal in `state`. The state
    /// is left untouched in that case.
    fn apply_action(&self, state: &mut Self::State, action: Action) -> Result<(), EngineError>;

    /// Payoff of `player`; only meaningful at terminal states
    fn player_return(&self, state: &Self::State, player: Player) -> f64;

    /// Payoffs of every player, indexed by player
    fn returns(&self, state: &Self::State) -> Vec<f64> {
        (0..self.num_players())
            .map(|player| self.player_return(state, player))
            .collect()
    }

    /// Clone `state` and apply `action` to the copy
    fn child(&self, state: &Self::State, action: Action) -> Result<Self::State, EngineError> {
        let mut child = state.clone();
        self.apply_action(&mut child, action)?;
        Ok(child)
    }
}

/// Error raised by an engine that refuses an operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Illegal action {action} in the current state")]
    IllegalAction { action: Action },
    #[error("Action {action} is outside the action space of size {num_actions}")]
    ActionOutOfRange { action: Action, num_actions: usize },
    #[error("Cannot apply action {action}: the game is over")]
    TerminalState { action: Action },
    #[error("Non-terminal state has no legal actions")]
    NoLegalActions,
}

/// Error raised when an operation is requested on inputs that can never work
///
/// These are caller bugs detected before any work starts: a game of the wrong
/// shape handed to the solver, a coordinate off the board, and so on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Game must be a 2-player game, got {0} players")]
    PlayerCount(usize),
    #[error("The game must be deterministic, not {0:?}")]
    ChanceMode(ChanceMode),
    #[error("The game must be a perfect information one, not {0:?}")]
    Information(Information),
    #[error("The game must be turn-based, not {0:?}")]
    Dynamics(Dynamics),
    #[error("The game must be 0-sum, not {0:?}")]
    Utility(Utility),
    #[error("Maximizing player {player} does not exist in a {num_players}-player game")]
    InvalidPlayer { player: Player, num_players: usize },
    #[error("No player to move in the root state ({0:?})")]
    NoPlayerToMove(Turn),
    #[error("Invalid board dimensions {num_rows}x{num_cols}")]
    BoardDimensions { num_rows: usize, num_cols: usize },
    #[error("Coordinate ({row}, {col}) is outside a {num_rows}x{num_cols} board")]
    CoordinateOutOfRange { row: usize, col: usize, num_rows: usize, num_cols: usize },
    #[error("Action {action} is outside the action space of size {num_actions}")]
    ActionOutOfRange { action: Action, num_actions: usize },
    #[error("Invalid value {value:?} for game parameter '{key}'")]
    Parameter { key: String, value: String },
}
