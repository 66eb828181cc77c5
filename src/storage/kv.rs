use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Data directory not found")]
    DataDirNotFound,

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// A single mutation inside a [`WriteBatch`]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum WriteOp {
    Put { key: String, value: String },
    Delete { key: String },
}

impl WriteOp {
    pub fn key(&self) -> &str {
        match self {
            WriteOp::Put { key, .. } | WriteOp::Delete { key } => key,
        }
    }
}

/// Ordered group of writes applied all-or-nothing by [`KeyValueStore::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Put {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn delete(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Delete { key: key.into() });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// String-keyed, string-valued persistent namespace.
///
/// Implementations only need to provide reads, key listing and atomic batch
/// application; single writes are expressed as one-element batches.
pub trait KeyValueStore {
    /// Read the raw value for `key`, `None` when absent
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// List every key currently present
    fn keys(&self) -> Result<Vec<String>>;

    /// Apply every operation in `batch`, or none of them
    fn apply(&mut self, batch: WriteBatch) -> Result<()>;

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.put(key, value);
        self.apply(batch)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.delete(key);
        self.apply(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_keeps_order() {
        let mut batch = WriteBatch::new();
        batch.put("a", "1").delete("b").put("c", "3");

        let keys: Vec<&str> = batch.ops().iter().map(|op| op.key()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(batch.len(), 3);
        assert!(!batch.is_empty());
    }

    #[test]
    fn test_batch_serializes_tagged_ops() {
        let mut batch = WriteBatch::new();
        batch.delete("pc_capsule_x");

        let json = serde_json::to_string(&batch).unwrap();
        assert_eq!(json, r#"{"ops":[{"op":"delete","key":"pc_capsule_x"}]}"#);
    }
}
