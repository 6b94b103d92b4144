//! Exhaustive minimax search
//!
//! Solves deterministic, two-player, perfect-information, zero-sum,
//! sequential games by enumerating the full game tree. Every node is visited
//! exactly once; there is no pruning and no sharing between transpositions,
//! so this is for small games only.

use tracing::{debug, instrument};

use crate::typed::{
    Action, ChanceMode, ConfigurationError, Dynamics, EngineError, Game, Information, Player,
    Turn, Utility,
};

/// Error returned by [`solve`] and [`best_action`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolveError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("Engine failed during search: {0}")]
    Engine(#[from] EngineError),
}

/// Check that `game` is something minimax can solve
///
/// # Errors
///
/// Returns the first violated precondition: exactly two players,
/// deterministic, perfect information, sequential, zero-sum.
pub fn check_solvable<G: Game>(game: &G) -> Result<(), ConfigurationError> {
    let game_type = game.game_type();

    if game.num_players() != 2 {
        return Err(ConfigurationError::PlayerCount(game.num_players()));
    }
    if game_type.chance_mode != ChanceMode::Deterministic {
        return Err(ConfigurationError::ChanceMode(game_type.chance_mode));
    }
    if game_type.information != Information::PerfectInformation {
        return Err(ConfigurationError::Information(game_type.information));
    }
    if game_type.dynamics != Dynamics::Sequential {
        return Err(ConfigurationError::Dynamics(game_type.dynamics));
    }
    if game_type.utility != Utility::ZeroSum {
        return Err(ConfigurationError::Utility(game_type.utility));
    }

    Ok(())
}

/// Value of the game for the maximizing player under optimal play
///
/// # Arguments
///
/// * `game` - Engine to analyze
/// * `state` - Position to start from; the initial state when `None`
/// * `maximizing_player` - The MAX player; the other player is MIN. When
///   `None`, the player to move in the starting position is MAX.
///
/// # Errors
///
/// Preconditions are checked once, before the search starts, and reported as
/// `SolveError::Configuration`. `SolveError::Engine` means the engine broke
/// its own contract during the search.
///
/// The caller's state is never modified: the search runs on a private clone.
#[instrument(skip_all, fields(game = %game.game_type().short_name))]
pub fn solve<G: Game>(
    game: &G,
    state: Option<&G::State>,
    maximizing_player: Option<Player>,
) -> Result<f64, SolveError> {
    check_solvable(game)?;

    let root = match state {
        Some(state) => state.clone(),
        None => game.new_initial_state(),
    };

    let maximizing_player = match maximizing_player {
        Some(player) => player,
        None => {
            let turn = game.current_player(&root);
            turn.player()
                .ok_or(ConfigurationError::NoPlayerToMove(turn))?
        }
    };
    if maximizing_player >= game.num_players() {
        return Err(ConfigurationError::InvalidPlayer {
            player: maximizing_player,
            num_players: game.num_players(),
        }
        .into());
    }

    let value = minimax(game, &root, maximizing_player)?;
    debug!(maximizing_player, value, "search finished");
    Ok(value)
}

/// Best action for the player to move, together with its minimax value
///
/// Children are evaluated in the order of `legal_actions`; on ties the first
/// best action wins.
///
/// # Errors
///
/// Same preconditions as [`solve`]; additionally the state must have a
/// player to move.
pub fn best_action<G: Game>(game: &G, state: &G::State) -> Result<(Action, f64), SolveError> {
    check_solvable(game)?;

    let turn = game.current_player(state);
    let player = turn.player().ok_or(ConfigurationError::NoPlayerToMove(turn))?;

    let mut best: Option<(Action, f64)> = None;
    for action in game.legal_actions(state) {
        let child = game.child(state, action)?;
        let value = minimax(game, &child, player)?;
        if best.map_or(true, |(_, best_value)| value > best_value) {
            best = Some((action, value));
        }
    }

    best.ok_or_else(|| EngineError::NoLegalActions.into())
}

fn minimax<G: Game>(game: &G, state: &G::State, maximizing_player: Player) -> Result<f64, EngineError> {
    if game.is_terminal(state) {
        return Ok(game.player_return(state, maximizing_player));
    }

    let maximizing = game.current_player(state) == Turn::Player(maximizing_player);
    let mut selected: Option<f64> = None;

    for action in game.legal_actions(state) {
        let child = game.child(state, action)?;
        let value = minimax(game, &child, maximizing_player)?;
        selected = Some(match selected {
            None => value,
            Some(current) if maximizing => current.max(value),
            Some(current) => current.min(value),
        });
    }

    selected.ok_or(EngineError::NoLegalActions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed::GameType;
    use std::fmt;

    #[derive(Clone, Debug, PartialEq)]
    struct Pile {
        stones: u32,
        to_move: Player,
    }

    impl fmt::Display for Pile {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{} stones, player {} to move", self.stones, self.to_move)
        }
    }

    // Subtraction game: take one or two stones, taking the last stone wins.
    // The player to move loses exactly when the pile is a multiple of three.
    struct Nim {
        stones: u32,
        game_type: GameType,
        num_players: usize,
    }

    impl Nim {
        fn new(stones: u32) -> Self {
            Self {
                stones,
                game_type: GameType::two_player_zero_sum("nim"),
                num_players: 2,
            }
        }
    }

    impl Game for Nim {
        type State = Pile;

        fn game_type(&self) -> GameType {
            self.game_type.clone()
        }

        fn num_players(&self) -> usize {
            self.num_players
        }

        fn num_distinct_actions(&self) -> usize {
            2
        }

        fn new_initial_state(&self) -> Self::State {
            Pile { stones: self.stones, to_move: 0 }
        }

        fn is_terminal(&self, state: &Self::State) -> bool {
            state.stones == 0
        }

        fn current_player(&self, state: &Self::State) -> Turn {
            if self.is_terminal(state) {
                Turn::Terminal
            } else {
                Turn::Player(state.to_move)
            }
        }

        fn legal_actions(&self, state: &Self::State) -> Vec<Action> {
            (0..2usize).filter(|&a| a as u32 + 1 <= state.stones).collect()
        }

        fn apply_action(&self, state: &mut Self::State, action: Action) -> Result<(), EngineError> {
            if !self.legal_actions(state).contains(&action) {
                return Err(EngineError::IllegalAction { action });
            }
            state.stones -= action as u32 + 1;
            state.to_move = 1 - state.to_move;
            Ok(())
        }

        fn player_return(&self, state: &Self::State, player: Player) -> f64 {
            if player == state.to_move { -1.0 } else { 1.0 }
        }
    }

    // Engine that claims to be running but offers nothing to play.
    struct Stuck;

    impl Game for Stuck {
        type State = Pile;

        fn game_type(&self) -> GameType {
            GameType::two_player_zero_sum("stuck")
        }

        fn num_players(&self) -> usize {
            2
        }

        fn num_distinct_actions(&self) -> usize {
            1
        }

        fn new_initial_state(&self) -> Self::State {
            Pile { stones: 1, to_move: 0 }
        }

        fn is_terminal(&self, _state: &Self::State) -> bool {
            false
        }

        fn current_player(&self, state: &Self::State) -> Turn {
            Turn::Player(state.to_move)
        }

        fn legal_actions(&self, _state: &Self::State) -> Vec<Action> {
            Vec::new()
        }

        fn apply_action(&self, _state: &mut Self::State, action: Action) -> Result<(), EngineError> {
            Err(EngineError::IllegalAction { action })
        }

        fn player_return(&self, _state: &Self::State, _player: Player) -> f64 {
            0.0
        }
    }

    #[test]
    fn test_terminal_root_returns_payoff() {
        let game = Nim::new(0);
        let state = game.new_initial_state();

        assert_eq!(solve(&game, Some(&state), Some(0)).unwrap(), -1.0);
        assert_eq!(solve(&game, Some(&state), Some(1)).unwrap(), 1.0);
    }

    #[test]
    fn test_known_values() {
        for stones in 1..=8 {
            let game = Nim::new(stones);
            let expected = if stones % 3 == 0 { -1.0 } else { 1.0 };
            assert_eq!(solve(&game, None, None).unwrap(), expected, "pile of {}", stones);
        }
    }

    #[test]
    fn test_value_negates_under_role_swap() {
        for stones in 1..=7 {
            let game = Nim::new(stones);
            let as_first = solve(&game, None, Some(0)).unwrap();
            let as_second = solve(&game, None, Some(1)).unwrap();
            assert_eq!(as_first, -as_second);
        }
    }

    #[test]
    fn test_defaults_to_player_to_move() {
        let game = Nim::new(5);
        let mut state = game.new_initial_state();
        game.apply_action(&mut state, 0).unwrap(); // 4 stones, player 1 to move

        let implicit = solve(&game, Some(&state), None).unwrap();
        let explicit = solve(&game, Some(&state), Some(1)).unwrap();

        assert_eq!(implicit, explicit);
        assert_eq!(implicit, 1.0);
    }

    #[test]
    fn test_caller_state_is_untouched() {
        let game = Nim::new(6);
        let state = game.new_initial_state();
        let before = state.clone();

        solve(&game, Some(&state), None).unwrap();

        assert_eq!(state, before);
    }

    #[test]
    fn test_rejects_wrong_player_count() {
        let mut game = Nim::new(3);
        game.num_players = 3;

        let err = solve(&game, None, None).unwrap_err();
        assert_eq!(err, SolveError::Configuration(ConfigurationError::PlayerCount(3)));
    }

    #[test]
    fn test_rejects_wrong_game_shape() {
        let mut game = Nim::new(3);
        game.game_type.chance_mode = ChanceMode::ExplicitStochastic;
        assert_eq!(
            check_solvable(&game),
            Err(ConfigurationError::ChanceMode(ChanceMode::ExplicitStochastic))
        );

        let mut game = Nim::new(3);
        game.game_type.information = Information::ImperfectInformation;
        assert!(matches!(check_solvable(&game), Err(ConfigurationError::Information(_))));

        let mut game = Nim::new(3);
        game.game_type.dynamics = Dynamics::Simultaneous;
        assert!(matches!(check_solvable(&game), Err(ConfigurationError::Dynamics(_))));

        let mut game = Nim::new(3);
        game.game_type.utility = Utility::GeneralSum;
        assert!(matches!(check_solvable(&game), Err(ConfigurationError::Utility(_))));
    }

    #[test]
    fn test_rejects_invalid_maximizing_player() {
        let game = Nim::new(3);
        let err = solve(&game, None, Some(2)).unwrap_err();
        assert_eq!(
            err,
            SolveError::Configuration(ConfigurationError::InvalidPlayer { player: 2, num_players: 2 })
        );
    }

    #[test]
    fn test_terminal_root_needs_explicit_player() {
        let game = Nim::new(0);
        let err = solve(&game, None, None).unwrap_err();
        assert_eq!(
            err,
            SolveError::Configuration(ConfigurationError::NoPlayerToMove(Turn::Terminal))
        );
    }

    #[test]
    fn test_broken_engine_is_reported() {
        let err = solve(&Stuck, None, None).unwrap_err();
        assert_eq!(err, SolveError::Engine(EngineError::NoLegalActions));
    }

    #[test]
    fn test_best_action_takes_winning_move() {
        // From 4 stones the only winning move is taking one.
        let game = Nim::new(4);
        let state = game.new_initial_state();

        let (action, value) = best_action(&game, &state).unwrap();

        assert_eq!(action, 0);
        assert_eq!(value, 1.0);
    }

    #[test]
    fn test_best_action_on_lost_position() {
        // Every move from 3 stones loses; the first legal action is kept.
        let game = Nim::new(3);
        let state = game.new_initial_state();

        assert_eq!(best_action(&game, &state).unwrap(), (0, -1.0));
    }
}
