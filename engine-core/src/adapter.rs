//! Adapter layer converting typed games to erased interface
//!
//! This module provides the `GameAdapter` struct that turns any typed `Game`
//! implementation into an `ErasedGame`, so the game registry can hand out
//! boxed games without knowing their state types.

use crate::erased::ErasedGame;
use crate::minimax::{self, SolveError};
use crate::typed::{Game, GameType, Player, Turn};

/// Adapter that converts typed games to erased interface
///
/// # Example
///
/// ```rust
/// # use engine_core::typed::*;
/// # use engine_core::adapter::GameAdapter;
/// # use engine_core::erased::ErasedGame;
/// # #[derive(Clone)]
/// # struct Done;
/// # impl std::fmt::Display for Done {
/// #     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "done") }
/// # }
/// # struct MyGame;
/// # impl Game for MyGame {
/// #     type State = Done;
/// #     fn game_type(&self) -> GameType { GameType::two_player_zero_sum("my_game") }
/// #     fn num_players(&self) -> usize { 2 }
/// #     fn num_distinct_actions(&self) -> usize { 1 }
/// #     fn new_initial_state(&self) -> Done { Done }
/// #     fn is_terminal(&self, _: &Done) -> bool { true }
/// #     fn current_player(&self, _: &Done) -> Turn { Turn::Terminal }
/// #     fn legal_actions(&self, _: &Done) -> Vec<Action> { Vec::new() }
/// #     fn apply_action(&self, _: &mut Done, action: Action) -> Result<(), EngineError> {
/// #         Err(EngineError::TerminalState { action })
/// #     }
/// #     fn player_return(&self, _: &Done, _: Player) -> f64 { 0.0 }
/// # }
/// let erased_game: Box<dyn ErasedGame> = Box::new(GameAdapter::new(MyGame));
///
/// // Now you can use the erased interface
/// assert_eq!(erased_game.game_type().short_name, "my_game");
/// assert_eq!(erased_game.solve(Some(0)).unwrap(), 0.0);
/// ```
pub struct GameAdapter<T: Game> {
    game: T,
}

impl<T: Game> GameAdapter<T> {
    /// Create a new adapter wrapping the given game
    pub fn new(game: T) -> Self {
        Self { game }
    }

    /// Get a reference to the underlying game
    pub fn game(&self) -> &T {
        &self.game
    }

    /// Consume the adapter and return the underlying game
    pub fn into_inner(self) -> T {
        self.game
    }
}

impl<T: Game> ErasedGame for GameAdapter<T> {
    fn game_type(&self) -> GameType {
        self.game.game_type()
    }

    fn num_players(&self) -> usize {
        self.game.num_players()
    }

    fn num_distinct_actions(&self) -> usize {
        self.game.num_distinct_actions()
    }

    fn describe_initial_state(&self) -> String {
        self.game.new_initial_state().to_string()
    }

    fn initial_player(&self) -> Turn {
        self.game.current_player(&self.game.new_initial_state())
    }

    fn solve(&self, maximizing_player: Option<Player>) -> Result<f64, SolveError> {
        minimax::solve(&self.game, None, maximizing_player)
    }
}
