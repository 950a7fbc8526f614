//! GameEngine — pure rules engine, no knowledge of replication
//!
//! State machine: `InProgress ⇄ (WinDetermined | Draw)`, terminal once
//! `game_ended` is set; `reset()` returns to a fresh game. Invalid
//! placements (wrong state, bad column, full column, animation in flight)
//! are expected high-frequency events at the UI boundary and come back as
//! a silent `None`, never as an error.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::board::{Board, Slot, DEFAULT_COLS, DEFAULT_ROWS};

/// The two players. The Host is always `One`, the Guest always `Two`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub fn other(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }
}

impl From<Player> for u8 {
    fn from(player: Player) -> u8 {
        match player {
            Player::One => 1,
            Player::Two => 2,
        }
    }
}

impl TryFrom<u8> for Player {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Player::One),
            2 => Ok(Player::Two),
            other => Err(format!("invalid player value: {}", other)),
        }
    }
}

/// A single successful placement. Doubles as the identity key for
/// remote-animation deduplication: a (col, row, player) triple cannot
/// recur within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub col: usize,
    pub row: usize,
    pub player: Player,
}

/// Deep-copy snapshot of the engine. The serialization boundary used by
/// the replication layer; importing one never aliases the live board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardState {
    pub board: Board,
    pub current_player: Player,
    pub game_ended: bool,
    pub win_positions: Vec<(usize, usize)>,
}

impl BoardState {
    pub fn initial(cols: usize, rows: usize) -> Self {
        Self {
            board: Board::new(cols, rows),
            current_player: Player::One,
            game_ended: false,
            win_positions: Vec::new(),
        }
    }
}

/// Axis pairs scanned for a win, in tie-break order: horizontal,
/// vertical, diagonal /, diagonal \.
const WIN_AXES: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

pub struct GameEngine {
    board: Board,
    current_player: Player,
    game_ended: bool,
    win_positions: Vec<(usize, usize)>,
    animating: bool,
}

impl GameEngine {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            board: Board::new(cols, rows),
            current_player: Player::One,
            game_ended: false,
            win_positions: Vec::new(),
            animating: false,
        }
    }

    /// Drop the current player's token into `col`.
    ///
    /// Returns `None` without touching the board when the game has ended,
    /// an animation is still in flight, the column is out of bounds, or
    /// the column is full. On success the animation lock is taken and the
    /// caller owes a matching [`finish_animation`](Self::finish_animation).
    pub fn place_token(&mut self, col: usize) -> Option<Move> {
        if self.game_ended {
            debug!(col, "placement rejected: game has ended");
            return None;
        }
        if self.animating {
            debug!(col, "placement rejected: animation in flight");
            return None;
        }
        let row = match self.board.lowest_empty(col) {
            Some(row) => row,
            None => {
                debug!(col, "placement rejected: column full or out of bounds");
                return None;
            }
        };

        let player = self.current_player;
        self.animating = true;
        self.board.set(col, row, Slot::from(player));

        if let Some(line) = self.win_line_from(col, row, player) {
            self.win_positions = line;
            self.game_ended = true;
        } else if self.board.is_full() {
            self.win_positions.clear();
            self.game_ended = true;
        } else {
            self.current_player = player.other();
        }

        Some(Move { col, row, player })
    }

    /// Contiguous same-player run through the just-placed cell, first
    /// qualifying axis wins. Positions are collected outward in both
    /// directions and recorded in board order from the negative end of
    /// the run to the positive end.
    fn win_line_from(
        &self,
        col: usize,
        row: usize,
        player: Player,
    ) -> Option<Vec<(usize, usize)>> {
        let target = Slot::from(player);
        for (dx, dy) in WIN_AXES {
            let mut positions = vec![(col, row)];
            for step in 1..4 {
                let c = col as isize + step * dx;
                let r = row as isize + step * dy;
                if c < 0 || r < 0 {
                    break;
                }
                if self.board.slot(c as usize, r as usize) == Some(target) {
                    positions.push((c as usize, r as usize));
                } else {
                    break;
                }
            }
            for step in 1..4 {
                let c = col as isize - step * dx;
                let r = row as isize - step * dy;
                if c < 0 || r < 0 {
                    break;
                }
                if self.board.slot(c as usize, r as usize) == Some(target) {
                    positions.insert(0, (c as usize, r as usize));
                } else {
                    break;
                }
            }
            if positions.len() >= 4 {
                return Some(positions);
            }
        }
        None
    }

    /// Take the animation lock without a placement. Used when a move
    /// adopted from the replicated state starts its visual drop locally.
    pub fn begin_animation(&mut self) {
        self.animating = true;
    }

    /// Release the animation lock once the drop's visual effect is done.
    pub fn finish_animation(&mut self) {
        self.animating = false;
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    pub fn reset(&mut self) {
        self.board = Board::new(self.board.cols(), self.board.rows());
        self.current_player = Player::One;
        self.game_ended = false;
        self.win_positions.clear();
        self.animating = false;
    }

    /// Deep-copy export. The animation lock is process-local and not part
    /// of the snapshot.
    pub fn state(&self) -> BoardState {
        BoardState {
            board: self.board.clone(),
            current_player: self.current_player,
            game_ended: self.game_ended,
            win_positions: self.win_positions.clone(),
        }
    }

    /// Deep-copy import. Leaves the local animation lock untouched.
    pub fn restore(&mut self, state: BoardState) {
        self.board = state.board;
        self.current_player = state.current_player;
        self.game_ended = state.game_ended;
        self.win_positions = state.win_positions;
    }

    pub fn slot(&self, col: usize, row: usize) -> Option<Slot> {
        self.board.slot(col, row)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn game_ended(&self) -> bool {
        self.game_ended
    }

    pub fn win_line(&self) -> &[(usize, usize)] {
        &self.win_positions
    }
}

impl Default for GameEngine {
    fn default() -> Self {
        Self::new(DEFAULT_COLS, DEFAULT_ROWS)
    }
}
