//! TicTacToe game implementation
//!
//! A small, fully solvable game used as a second registry entry and as the
//! benchmark workload for the minimax solver. Player 0 plays X and moves
//! first; actions are board cells 0-8, row-major.

use std::fmt;

use engine_core::{Action, EngineError, Game, GameType, Player, Turn};

/// Name under which the game is registered
pub const SHORT_NAME: &str = "tictactoe";

// Winning positions (rows, columns, diagonals)
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2], [3, 4, 5], [6, 7, 8],
    [0, 3, 6], [1, 4, 7], [2, 5, 8],
    [0, 4, 8], [2, 4, 6],
];

/// TicTacToe game state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    /// Board representation: 0=empty, 1=X, 2=O
    board: [u8; 9],
    /// Current player: 1=X, 2=O
    current_player: u8,
    /// Winner: 0=none/ongoing, 1=X, 2=O, 3=draw
    winner: u8,
}

impl State {
    /// Create a new initial game state
    pub fn new() -> Self {
        Self {
            board: [0; 9],
            current_player: 1, // X goes first
            winner: 0,
        }
    }

    /// Check if the game is over
    pub fn is_done(&self) -> bool {
        self.winner != 0
    }

    /// Winning player, if any
    pub fn winner(&self) -> Option<Player> {
        match self.winner {
            1 => Some(0),
            2 => Some(1),
            _ => None,
        }
    }

    fn check_winner(board: &[u8; 9]) -> u8 {
        for &[a, b, c] in &LINES {
            if board[a] != 0 && board[a] == board[b] && board[b] == board[c] {
                return board[a];
            }
        }

        if board.iter().all(|&cell| cell != 0) {
            return 3;
        }

        0
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, cells) in self.board.chunks(3).enumerate() {
            if row > 0 {
                writeln!(f)?;
            }
            for &cell in cells {
                let mark = match cell {
                    1 => 'x',
                    2 => 'o',
                    _ => '.',
                };
                write!(f, "{}", mark)?;
            }
        }
        Ok(())
    }
}

/// TicTacToe rules
#[derive(Debug, Clone, Copy, Default)]
pub struct TicTacToe;

impl TicTacToe {
    /// Create a new TicTacToe game
    pub fn new() -> Self {
        Self
    }
}

impl Game for TicTacToe {
    type State = State;

    fn game_type(&self) -> GameType {
        GameType::two_player_zero_sum(SHORT_NAME)
    }

    fn num_players(&self) -> usize {
        2
    }

    fn num_distinct_actions(&self) -> usize {
        9
    }

    fn new_initial_state(&self) -> Self::State {
        State::new()
    }

    fn is_terminal(&self, state: &Self::State) -> bool {
        state.is_done()
    }

    fn current_player(&self, state: &Self::State) -> Turn {
        if state.is_done() {
            Turn::Terminal
        } else {
            Turn::Player(usize::from(state.current_player - 1))
        }
    }

    fn legal_actions(&self, state: &Self::State) -> Vec<Action> {
        if state.is_done() {
            return Vec::new();
        }
        (0..9).filter(|&cell| state.board[cell] == 0).collect()
    }

    fn apply_action(&self, state: &mut Self::State, action: Action) -> Result<(), EngineError> {
        if state.is_done() {
            return Err(EngineError::TerminalState { action });
        }
        if action >= 9 {
            return Err(EngineError::ActionOutOfRange { action, num_actions: 9 });
        }
        if state.board[action] != 0 {
            return Err(EngineError::IllegalAction { action });
        }

        state.board[action] = state.current_player;
        state.winner = State::check_winner(&state.board);
        if state.winner == 0 {
            state.current_player = if state.current_player == 1 { 2 } else { 1 };
        }
        Ok(())
    }

    fn player_return(&self, state: &Self::State, player: Player) -> f64 {
        match state.winner() {
            Some(winner) if winner == player => 1.0,
            Some(_) => -1.0,
            None => 0.0,
        }
    }
}
