//! GameSnapshot — the replicated value
//!
//! The only unit that crosses the process boundary. Always written whole;
//! the single-writer-per-field discipline is structural: the Host is the
//! only code path that publishes a changed `state`/`last_move`, the Guest
//! only republishes what it read with `move_request` filled in.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::{BoardState, Move};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    #[serde(flatten)]
    pub state: BoardState,
    /// Most recent placement, the guest-side animation dedup key.
    pub last_move: Option<Move>,
    /// Column the Guest asks the Host to play. Host-consumed, then cleared.
    pub move_request: Option<usize>,
}

impl GameSnapshot {
    /// Fresh session snapshot: empty board, player one to move.
    pub fn initial(cols: usize, rows: usize) -> Self {
        Self {
            state: BoardState::initial(cols, rows),
            last_move: None,
            move_request: None,
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }
}
