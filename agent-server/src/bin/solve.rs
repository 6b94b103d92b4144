//! Solve a registered game with full minimax search
//!
//! Prints the outcome under optimal play from the initial position, e.g.
//! `solve "dots_and_boxes(num_rows=1,num_cols=2)"`.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;

use agent_server::{init_tracing, registry_init};
use engine_core::{load_game, ConfigurationError, Player, Turn};

#[derive(Parser, Debug)]
#[command(name = "solve")]
#[command(about = "Compute the game-theoretic value of a game")]
struct Args {
    /// Game string, `name(key=value,...)`
    #[arg(default_value = "dots_and_boxes(num_rows=2,num_cols=2)")]
    game: String,

    /// Player whose payoff is maximized (0-based, defaults to the first mover)
    #[arg(long)]
    player: Option<Player>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level);
    registry_init::initialize_registry();

    let game = load_game(&args.game)?;
    info!("Solving {}:\n{}", args.game, game.describe_initial_state());

    let maximizer = match (args.player, game.initial_player()) {
        (Some(player), _) | (None, Turn::Player(player)) => player,
        (None, turn) => return Err(ConfigurationError::NoPlayerToMove(turn).into()),
    };

    let value = game.solve(Some(maximizer))?;
    info!(value, player = maximizer, "Search finished");

    println!("{}", outcome(value, maximizer));
    Ok(())
}

/// Result line for a two-player value seen from `maximizer`
fn outcome(value: f64, maximizer: Player) -> String {
    if value == 0.0 {
        return "It's a draw".to_string();
    }
    let winner = if value > 0.0 { maximizer } else { 1 - maximizer };
    format!("Player {} wins.", winner + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_defaults_to_first_mover() {
        let args = Args::try_parse_from(["solve", "tictactoe"]).unwrap();
        assert_eq!(args.player, None);

        let args = Args::try_parse_from(["solve", "tictactoe", "--player", "1"]).unwrap();
        assert_eq!(args.player, Some(1));
    }

    #[test]
    fn test_outcome_lines() {
        assert_eq!(outcome(0.0, 0), "It's a draw");
        assert_eq!(outcome(-1.0, 0), "Player 2 wins.");
        assert_eq!(outcome(1.0, 0), "Player 1 wins.");
        assert_eq!(outcome(1.0, 1), "Player 2 wins.");
    }
}
