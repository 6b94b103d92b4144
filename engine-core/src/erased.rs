//! Erased Game interface for runtime polymorphism
//!
//! Typed games have an associated `State` type, which rules out trait
//! objects. This trait exposes the part of a game that tools need without
//! generics, so games can be looked up by name and solved at runtime. All
//! typed games are converted to this interface via the adapter layer.

use crate::minimax::SolveError;
use crate::typed::{GameType, Player, Turn};

/// Erased game trait usable behind `Box<dyn ErasedGame>`
///
/// # Example Usage
///
/// ```rust
/// # use engine_core::erased::ErasedGame;
/// # use engine_core::minimax::SolveError;
/// fn report(game: &dyn ErasedGame) -> Result<(), SolveError> {
///     let game_type = game.game_type();
///     println!("Solving {}", game_type.short_name);
///     println!("{}", game.describe_initial_state());
///
///     let value = game.solve(None)?;
///     println!("Value for the first mover: {}", value);
///     Ok(())
/// }
/// ```
pub trait ErasedGame: Send + Sync + 'static {
    /// Static metadata of the wrapped game
    fn game_type(&self) -> GameType;

    /// Number of players taking part
    fn num_players(&self) -> usize;

    /// Size of the action space
    fn num_distinct_actions(&self) -> usize;

    /// Human-readable rendering of the initial state
    fn describe_initial_state(&self) -> String;

    /// Who moves first
    fn initial_player(&self) -> Turn;

    /// Minimax value of the initial state for `maximizing_player`
    ///
    /// # Errors
    ///
    /// Returns `SolveError` if the game does not satisfy the solver's
    /// preconditions or the engine fails during the search.
    fn solve(&self, maximizing_player: Option<Player>) -> Result<f64, SolveError>;
}
