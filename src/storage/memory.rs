use std::collections::BTreeMap;

use super::kv::{KeyValueStore, Result, WriteBatch, WriteOp};

/// In-memory backend. Nothing survives the process; used by tests and
/// ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn apply(&mut self, batch: WriteBatch) -> Result<()> {
        for op in batch.ops() {
            match op {
                WriteOp::Put { key, value } => {
                    self.entries.insert(key.clone(), value.clone());
                }
                WriteOp::Delete { key } => {
                    self.entries.remove(key);
                }
            }
        }
        Ok(())
    }
}
