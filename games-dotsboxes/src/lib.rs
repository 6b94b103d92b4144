//! Dots and Boxes game implementation
//!
//! Players take turns drawing a line between two adjacent dots. Whoever
//! closes the fourth side of a box owns it and must move again. When every
//! line is drawn, the player owning more boxes wins.
//!
//! Actions follow the numbering in [`codec`]: horizontal lines first, then
//! vertical lines, each row-major.

pub mod codec;

use std::fmt;

use engine_core::{Action, ConfigurationError, EngineError, Game, GameType, Player, Turn};

pub use codec::{Coordinate, Orientation};

/// Name under which the game is registered
pub const SHORT_NAME: &str = "dots_and_boxes";

/// Dots and Boxes rules for a board of `num_rows` x `num_cols` boxes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DotsAndBoxes {
    num_rows: usize,
    num_cols: usize,
}

impl DotsAndBoxes {
    /// Create the rules for a board of the given size
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::BoardDimensions` if either dimension is 0
    /// or the board has more than [`codec::MAX_LINES`] lines.
    pub fn new(num_rows: usize, num_cols: usize) -> Result<Self, ConfigurationError> {
        codec::check_dimensions(num_rows, num_cols)?;
        Ok(Self { num_rows, num_cols })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    /// Action index of a board coordinate
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the line is not on this board.
    pub fn encode(&self, coordinate: Coordinate) -> Result<Action, ConfigurationError> {
        codec::encode(coordinate.row, coordinate.col, coordinate.orientation, self.num_rows, self.num_cols)
    }

    /// Board coordinate of an action index
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the action is outside the action space.
    pub fn decode(&self, action: Action) -> Result<Coordinate, ConfigurationError> {
        codec::decode(action, self.num_rows, self.num_cols)
    }

    /// The four lines surrounding box (`row`, `col`): top, bottom, left, right
    fn box_lines(&self, row: usize, col: usize) -> [Action; 4] {
        let top = row * self.num_cols + col;
        let bottom = top + self.num_cols;
        let left = codec::num_horizontal(self.num_rows, self.num_cols) + row * (self.num_cols + 1) + col;
        [top, bottom, left, left + 1]
    }

    /// Boxes bordered by a line, as (row, col)
    fn adjacent_boxes(&self, coordinate: Coordinate) -> Vec<(usize, usize)> {
        let Coordinate { row, col, orientation } = coordinate;
        let mut boxes = Vec::with_capacity(2);
        match orientation {
            Orientation::Horizontal => {
                if row > 0 {
                    boxes.push((row - 1, col));
                }
                if row < self.num_rows {
                    boxes.push((row, col));
                }
            }
            Orientation::Vertical => {
                if col > 0 {
                    boxes.push((row, col - 1));
                }
                if col < self.num_cols {
                    boxes.push((row, col));
                }
            }
        }
        boxes
    }
}

/// Dots and Boxes position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    num_rows: usize,
    num_cols: usize,
    /// Drawn flag per line, indexed by action
    lines: Vec<bool>,
    /// Owner per box, row-major
    boxes: Vec<Option<Player>>,
    scores: [usize; 2],
    current_player: Player,
    num_drawn: usize,
}

impl State {
    fn new(num_rows: usize, num_cols: usize) -> Self {
        Self {
            num_rows,
            num_cols,
            lines: vec![false; codec::num_actions(num_rows, num_cols)],
            boxes: vec![None; num_rows * num_cols],
            scores: [0, 0],
            current_player: 0,
            num_drawn: 0,
        }
    }

    /// Check if every line has been drawn
    pub fn is_done(&self) -> bool {
        self.num_drawn == self.lines.len()
    }

    /// Whether the line with index `action` is already drawn
    pub fn is_drawn(&self, action: Action) -> bool {
        self.lines.get(action).copied().unwrap_or(false)
    }

    /// Owner of box (`row`, `col`), if it has been closed
    pub fn box_owner(&self, row: usize, col: usize) -> Option<Player> {
        self.boxes.get(row * self.num_cols + col).copied().flatten()
    }

    /// Number of boxes owned by each player
    pub fn scores(&self) -> [usize; 2] {
        self.scores
    }

    fn line(&self, coordinate: Coordinate) -> bool {
        codec::encode(coordinate.row, coordinate.col, coordinate.orientation, self.num_rows, self.num_cols)
            .map_or(false, |action| self.lines[action])
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..=self.num_rows {
            for col in 0..self.num_cols {
                let drawn = self.line(Coordinate::new(row, col, Orientation::Horizontal));
                write!(f, "+{}", if drawn { "---" } else { "   " })?;
            }
            writeln!(f, "+")?;

            if row == self.num_rows {
                break;
            }

            for col in 0..=self.num_cols {
                let drawn = self.line(Coordinate::new(row, col, Orientation::Vertical));
                write!(f, "{}", if drawn { '|' } else { ' ' })?;
                if col < self.num_cols {
                    match self.box_owner(row, col) {
                        Some(player) => write!(f, " {} ", player + 1)?,
                        None => write!(f, "   ")?,
                    }
                }
            }
            writeln!(f)?;
        }
        write!(f, "Score: {} - {}", self.scores[0], self.scores[1])
    }
}

impl Game for DotsAndBoxes {
    type State = State;

    fn game_type(&self) -> GameType {
        GameType::two_player_zero_sum(SHORT_NAME)
    }

    fn num_players(&self) -> usize {
        2
    }

    fn num_distinct_actions(&self) -> usize {
        codec::num_actions(self.num_rows, self.num_cols)
    }

    fn new_initial_state(&self) -> Self::State {
        State::new(self.num_rows, self.num_cols)
    }

    fn is_terminal(&self, state: &Self::State) -> bool {
        state.is_done()
    }

    fn current_player(&self, state: &Self::State) -> Turn {
        if state.is_done() {
            Turn::Terminal
        } else {
            Turn::Player(state.current_player)
        }
    }

    fn legal_actions(&self, state: &Self::State) -> Vec<Action> {
        if state.is_done() {
            return Vec::new();
        }
        (0..state.lines.len()).filter(|&action| !state.lines[action]).collect()
    }

    fn apply_action(&self, state: &mut Self::State, action: Action) -> Result<(), EngineError> {
        if state.is_done() {
            return Err(EngineError::TerminalState { action });
        }
        let coordinate = self.decode(action).map_err(|_| EngineError::ActionOutOfRange {
            action,
            num_actions: self.num_distinct_actions(),
        })?;
        if state.lines[action] {
            return Err(EngineError::IllegalAction { action });
        }

        state.lines[action] = true;
        state.num_drawn += 1;

        let mover = state.current_player;
        let mut completed = false;
        for (row, col) in self.adjacent_boxes(coordinate) {
            if self.box_lines(row, col).iter().all(|&line| state.lines[line]) {
                state.boxes[row * self.num_cols + col] = Some(mover);
                state.scores[mover] += 1;
                completed = true;
            }
        }

        // Closing a box earns another move.
        if !completed {
            state.current_player = 1 - mover;
        }
        Ok(())
    }

    fn player_return(&self, state: &Self::State, player: Player) -> f64 {
        if !state.is_done() || player > 1 {
            return 0.0;
        }
        let ours = state.scores[player];
        let theirs = state.scores[1 - player];
        match ours.cmp(&theirs) {
            std::cmp::Ordering::Greater => 1.0,
            std::cmp::Ordering::Less => -1.0,
            std::cmp::Ordering::Equal => 0.0,
        }
    }
}
