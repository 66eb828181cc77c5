//! Directory-backed key-value store
//!
//! Layout:
//! ```text
//! {root}/
//! ├── pc_capsules_index.json      # one file per key (percent-encoded name)
//! ├── pc_capsule_{id}.json
//! ├── pc_progress_{id}.json
//! └── .journal.json               # only present while a batch is in flight
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::kv::{KeyValueStore, Result, StorageError, WriteBatch, WriteOp};

const VALUE_EXT: &str = ".json";
const JOURNAL_FILE: &str = ".journal.json";

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// A journal left behind by an interrupted batch is replayed before the
    /// store is handed out.
    pub fn open(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)?;
        let store = Self { root };
        store.recover()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn journal_path(&self) -> PathBuf {
        self.root.join(JOURNAL_FILE)
    }

    fn value_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.starts_with('.') {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        let file_name = format!("{}{}", urlencoding::encode(key), VALUE_EXT);
        Ok(self.root.join(file_name))
    }

    /// Finish a batch whose journal survived a crash or a failed write.
    ///
    /// Runs before every read and write, so nothing observes or builds on a
    /// half-applied batch. The journal stays until its batch fully lands.
    fn recover(&self) -> Result<()> {
        let journal = self.journal_path();
        if !journal.exists() {
            return Ok(());
        }

        let content = fs::read_to_string(&journal)?;
        match serde_json::from_str::<WriteBatch>(&content) {
            Ok(batch) => {
                log::info!(
                    "Replaying {} pending write(s) from journal in {:?}",
                    batch.len(),
                    self.root
                );
                self.apply_ops(&batch)?;
            }
            Err(e) => {
                log::warn!("Discarding unreadable journal in {:?}: {}", self.root, e);
            }
        }
        fs::remove_file(&journal)?;
        Ok(())
    }

    fn apply_ops(&self, batch: &WriteBatch) -> Result<()> {
        for op in batch.ops() {
            let path = self.value_path(op.key())?;
            match op {
                WriteOp::Put { value, .. } => write_atomic(&path, value)?,
                WriteOp::Delete { .. } => remove_if_exists(&path)?,
            }
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.recover()?;
        let path = self.value_path(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.recover()?;
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') {
                continue;
            }
            let Some(encoded) = name.strip_suffix(VALUE_EXT) else { continue };
            match urlencoding::decode(encoded) {
                Ok(key) => keys.push(key.into_owned()),
                Err(_) => log::warn!("Skipping undecodable file name {:?}", name),
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn apply(&mut self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        // Validate every key before anything touches the disk
        for op in batch.ops() {
            self.value_path(op.key())?;
        }
        self.recover()?;
        if batch.len() == 1 {
            return self.apply_ops(&batch);
        }

        let journal = self.journal_path();
        write_atomic(&journal, &serde_json::to_string(&batch)?)?;
        self.apply_ops(&batch)?;
        fs::remove_file(&journal)?;
        Ok(())
    }
}

/// Write to a sibling `.tmp` file and rename it into place
fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
