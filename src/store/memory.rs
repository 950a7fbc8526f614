//! In-process shared store

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::SharedStore;
use crate::error::Result;

/// Process-local [`SharedStore`] backed by a map. Values are read and
/// written whole, matching the contract of the real transport.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn read(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: Value, create_if_absent: bool) -> Result<()> {
        let mut entries = self.entries.write().await;
        if create_if_absent && entries.contains_key(key) {
            return Ok(());
        }
        entries.insert(key.to_string(), value);
        Ok(())
    }
}
