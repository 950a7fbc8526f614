//! Shared store — the cross-process replication boundary
//!
//! An external, eventually-consistent key/value medium with last-write-wins
//! semantics: no transactions, no compare-and-swap. All race avoidance in
//! the protocol comes from single-writer-per-field discipline and ordering,
//! never from the store itself. Real transports plug in behind
//! [`SharedStore`]; [`MemoryStore`] backs tests, solo play and in-process
//! demos.

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Latest value under `key`, or `None` when nothing has been written.
    async fn read(&self, key: &str) -> Result<Option<Value>>;

    /// Write `value` whole under `key`. With `create_if_absent` the write
    /// only takes effect when the key does not exist yet — the host seeds
    /// the session this way so a late-joining guest never clobbers a live
    /// game.
    async fn write(&self, key: &str, value: Value, create_if_absent: bool) -> Result<()>;
}

pub use memory::MemoryStore;
