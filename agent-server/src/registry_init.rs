//! Game registry initialization
//!
//! This module registers every game this workspace ships with, so tools can
//! load them from a game string such as `dots_and_boxes(num_rows=2,num_cols=3)`.

use engine_core::registry::list_registered_games;
use engine_core::{register_game, ConfigurationError, ErasedGame, GameAdapter, GameSpec};
use games_dotsboxes::DotsAndBoxes;
use games_tictactoe::TicTacToe;
use tracing::info;

/// Board size used when a dots and boxes game string omits it
pub const DEFAULT_BOARD_SIZE: usize = 2;

fn dots_and_boxes(spec: &GameSpec) -> Result<Box<dyn ErasedGame>, ConfigurationError> {
    let num_rows = spec.get_or("num_rows", DEFAULT_BOARD_SIZE)?;
    let num_cols = spec.get_or("num_cols", DEFAULT_BOARD_SIZE)?;
    Ok(Box::new(GameAdapter::new(DotsAndBoxes::new(num_rows, num_cols)?)))
}

fn tictactoe(_spec: &GameSpec) -> Result<Box<dyn ErasedGame>, ConfigurationError> {
    Ok(Box::new(GameAdapter::new(TicTacToe::new())))
}

/// Initialize the global game registry with all available games
///
/// This function should be called once at startup.
pub fn initialize_registry() {
    register_game(games_dotsboxes::SHORT_NAME.to_string(), dots_and_boxes);
    register_game(games_tictactoe::SHORT_NAME.to_string(), tictactoe);

    let games = list_registered_games();
    info!("Initialized game registry with {} games: {}", games.len(), games.join(", "));
}
