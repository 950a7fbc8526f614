//! Board — the connect-four grid
//!
//! Column-major storage: `cells[col][row]`, row 0 at the top and
//! `rows - 1` at the bottom, so a dropped token scans the column
//! bottom-up for the first empty row.

use serde::{Deserialize, Serialize};

use super::Player;

/// Default grid width.
pub const DEFAULT_COLS: usize = 7;
/// Default grid height.
pub const DEFAULT_ROWS: usize = 6;

/// One cell of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Slot {
    Empty,
    P1,
    P2,
}

impl From<Slot> for u8 {
    fn from(slot: Slot) -> u8 {
        match slot {
            Slot::Empty => 0,
            Slot::P1 => 1,
            Slot::P2 => 2,
        }
    }
}

impl TryFrom<u8> for Slot {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Slot::Empty),
            1 => Ok(Slot::P1),
            2 => Ok(Slot::P2),
            other => Err(format!("invalid slot value: {}", other)),
        }
    }
}

impl From<Player> for Slot {
    fn from(player: Player) -> Slot {
        match player {
            Player::One => Slot::P1,
            Player::Two => Slot::P2,
        }
    }
}

/// The grid itself. Owned by exactly one [`GameEngine`](super::GameEngine)
/// per process; it crosses the replication boundary only as a deep copy
/// inside a snapshot, never by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cols: usize,
    rows: usize,
    cells: Vec<Vec<Slot>>,
}

impl Board {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![vec![Slot::Empty; rows]; cols],
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Cell at `(col, row)`, or `None` when out of bounds.
    pub fn slot(&self, col: usize, row: usize) -> Option<Slot> {
        self.cells.get(col)?.get(row).copied()
    }

    pub(crate) fn set(&mut self, col: usize, row: usize, slot: Slot) {
        self.cells[col][row] = slot;
    }

    /// Lowest empty row of `col`, scanning from the bottom. `None` when the
    /// column is out of bounds or full.
    pub fn lowest_empty(&self, col: usize) -> Option<usize> {
        let column = self.cells.get(col)?;
        (0..self.rows).rev().find(|&row| column[row] == Slot::Empty)
    }

    /// A column is full once its top cell is occupied (gravity holds by
    /// construction).
    pub fn is_column_full(&self, col: usize) -> bool {
        match self.cells.get(col) {
            Some(column) => column[0] != Slot::Empty,
            None => true,
        }
    }

    pub fn is_full(&self) -> bool {
        (0..self.cols).all(|col| self.is_column_full(col))
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(DEFAULT_COLS, DEFAULT_ROWS)
    }
}
