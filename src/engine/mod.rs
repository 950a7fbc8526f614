//! Board Engine — pure connect-four rules
//!
//! Leaf component with no knowledge of replication. The coordinator feeds
//! it local commands and remote snapshots; everything else observes it
//! read-only.

pub mod board;
pub mod game;

pub use board::{Board, Slot, DEFAULT_COLS, DEFAULT_ROWS};
pub use game::{BoardState, GameEngine, Move, Player};
