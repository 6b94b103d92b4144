//! Mapping between board coordinates and action indices
//!
//! Lines on a board of `num_rows` x `num_cols` boxes are numbered with all
//! horizontal lines first, row-major: `num_rows + 1` rows of `num_cols`
//! segments. Vertical lines follow, row-major: `num_rows` rows of
//! `num_cols + 1` segments.
//!
//! ```text
//!  +-0-+-1-+        horizontal: 0..6
//!  6   7   8        vertical:   6..12
//!  +-2-+-3-+
//!  9  10  11
//!  +-4-+-5-+
//! ```

use engine_core::{Action, ConfigurationError};
use serde::{Deserialize, Serialize};

/// Direction of a line, written `"h"` or `"v"` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    #[serde(rename = "h")]
    Horizontal,
    #[serde(rename = "v")]
    Vertical,
}

/// A line identified by its position on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub row: usize,
    pub col: usize,
    pub orientation: Orientation,
}

impl Coordinate {
    pub fn new(row: usize, col: usize, orientation: Orientation) -> Self {
        Self { row, col, orientation }
    }
}

/// Number of horizontal lines, which is also the index of the first vertical one
pub fn num_horizontal(num_rows: usize, num_cols: usize) -> usize {
    (num_rows + 1) * num_cols
}

/// Total number of lines on the board
///
/// Dimensions must have passed [`check_dimensions`].
pub fn num_actions(num_rows: usize, num_cols: usize) -> usize {
    num_horizontal(num_rows, num_cols) + num_rows * (num_cols + 1)
}

/// Largest number of lines a board may have
pub const MAX_LINES: usize = 1 << 16;

/// Line count of a board, or `None` if it does not fit in a `usize`
fn checked_num_actions(num_rows: usize, num_cols: usize) -> Option<usize> {
    let horizontal = num_rows.checked_add(1)?.checked_mul(num_cols)?;
    let vertical = num_cols.checked_add(1)?.checked_mul(num_rows)?;
    horizontal.checked_add(vertical)
}

/// Check that a board has at least one box and at most [`MAX_LINES`] lines
///
/// # Errors
///
/// Returns `ConfigurationError::BoardDimensions` otherwise.
pub fn check_dimensions(num_rows: usize, num_cols: usize) -> Result<(), ConfigurationError> {
    match checked_num_actions(num_rows, num_cols) {
        Some(lines) if num_rows > 0 && num_cols > 0 && lines <= MAX_LINES => Ok(()),
        _ => Err(ConfigurationError::BoardDimensions { num_rows, num_cols }),
    }
}

/// Action index of the line at (`row`, `col`) with the given orientation
///
/// # Errors
///
/// Returns `ConfigurationError` for an empty board or a line that lies
/// outside it.
pub fn encode(
    row: usize,
    col: usize,
    orientation: Orientation,
    num_rows: usize,
    num_cols: usize,
) -> Result<Action, ConfigurationError> {
    check_dimensions(num_rows, num_cols)?;

    let (max_row, max_col) = match orientation {
        Orientation::Horizontal => (num_rows, num_cols - 1),
        Orientation::Vertical => (num_rows - 1, num_cols),
    };
    if row > max_row || col > max_col {
        return Err(ConfigurationError::CoordinateOutOfRange { row, col, num_rows, num_cols });
    }

    let action = match orientation {
        Orientation::Horizontal => row * num_cols + col,
        Orientation::Vertical => num_horizontal(num_rows, num_cols) + row * (num_cols + 1) + col,
    };
    Ok(action)
}

/// Line at action index `action`
///
/// # Errors
///
/// Returns `ConfigurationError` for an empty board or an action outside the
/// action space.
pub fn decode(action: Action, num_rows: usize, num_cols: usize) -> Result<Coordinate, ConfigurationError> {
    check_dimensions(num_rows, num_cols)?;

    let total = num_actions(num_rows, num_cols);
    if action >= total {
        return Err(ConfigurationError::ActionOutOfRange { action, num_actions: total });
    }

    let horizontal = num_horizontal(num_rows, num_cols);
    let coordinate = if action < horizontal {
        Coordinate::new(action / num_cols, action % num_cols, Orientation::Horizontal)
    } else {
        let offset = action - horizontal;
        Coordinate::new(offset / (num_cols + 1), offset % (num_cols + 1), Orientation::Vertical)
    };
    Ok(coordinate)
}
