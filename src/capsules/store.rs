//! The capsule store
//!
//! Key layout in the backing namespace:
//! ```text
//! pc_capsules_index      # JSON array of IndexEntry
//! pc_capsule_{id}        # Capsule
//! pc_progress_{id}       # Progress (optional)
//! ```
//!
//! Reads never fail: absent or corrupt records come back as their default.
//! Writes that touch more than one key go through a single atomic batch.

use std::fs;
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, Sender};

use serde::de::DeserializeOwned;
use thiserror::Error;

use super::ids::{Clock, IdGenerator, SystemClock, TimeRandomIdGenerator};
use super::models::{Capsule, IndexEntry, Progress};
use super::transfer::{deserialize_capsule, export_file_name, serialize_capsule, ValidationError};
use crate::storage::{KeyValueStore, StorageError, WriteBatch};

pub const INDEX_KEY: &str = "pc_capsules_index";
const NAMESPACE_PREFIX: &str = "pc_";

pub fn capsule_key(id: &str) -> String {
    format!("pc_capsule_{}", id)
}

pub fn progress_key(id: &str) -> String {
    format!("pc_progress_{}", id)
}

#[derive(Error, Debug)]
pub enum CapsuleError {
    #[error("Import rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to read file: {0}")]
    Read(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Capsule not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, CapsuleError>;

/// Notifications for views that mirror store contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Saved { id: String },
    Deleted { id: String },
    Imported { id: String },
    Cleared,
}

/// Export payload: the capsule text plus a suggested file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedCapsule {
    pub file_name: String,
    pub contents: String,
}

pub struct CapsuleStore<S: KeyValueStore> {
    backend: S,
    ids: Box<dyn IdGenerator>,
    clock: Box<dyn Clock>,
    subscribers: Vec<Sender<StoreEvent>>,
}

impl<S: KeyValueStore> CapsuleStore<S> {
    pub fn new(backend: S) -> Self {
        Self::with_generators(backend, Box::new(TimeRandomIdGenerator), Box::new(SystemClock))
    }

    pub fn with_generators(backend: S, ids: Box<dyn IdGenerator>, clock: Box<dyn Clock>) -> Self {
        Self {
            backend,
            ids,
            clock,
            subscribers: Vec::new(),
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn into_backend(self) -> S {
        self.backend
    }

    /// A fresh capsule id
    pub fn gen_id(&self) -> String {
        self.ids.generate()
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Receive every [`StoreEvent`] emitted from now on
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: StoreEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Failed to read {}: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Ignoring corrupt record {}: {}", key, e);
                None
            }
        }
    }

    // ==================== Index Operations ====================

    /// All index entries in insertion order. Unreadable entries are skipped.
    pub fn load_index(&self) -> Vec<IndexEntry> {
        let Some(raw) = self.read_json::<Vec<serde_json::Value>>(INDEX_KEY) else {
            return Vec::new();
        };
        raw.into_iter()
            .filter_map(|value| match serde_json::from_value::<IndexEntry>(value) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Skipping corrupt index entry: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Replace the stored index wholesale
    pub fn save_index(&mut self, entries: &[IndexEntry]) -> std::result::Result<(), StorageError> {
        let json = serde_json::to_string(entries)?;
        self.backend.set(INDEX_KEY, &json)
    }

    /// Whether `id` is listed in the index
    pub fn contains(&self, id: &str) -> bool {
        self.load_index().iter().any(|e| e.id == id)
    }

    // ==================== Capsule Operations ====================

    pub fn load_capsule(&self, id: &str) -> Option<Capsule> {
        self.read_json(&capsule_key(id))
    }

    /// Persist a capsule and make it visible in the index.
    ///
    /// Assigns an id and `createdAt` on first save and always refreshes
    /// `updatedAt`. The capsule record and the index are written together.
    pub fn save_capsule(&mut self, capsule: &mut Capsule) -> std::result::Result<(), StorageError> {
        self.persist(capsule, IndexEntry::refresh_from)
    }

    /// Shared save path; `update` decides which fields of an existing index
    /// entry follow the capsule.
    fn persist(
        &mut self,
        capsule: &mut Capsule,
        update: fn(&mut IndexEntry, &Capsule),
    ) -> std::result::Result<(), StorageError> {
        let now = self.clock.now();
        if !capsule.has_id() {
            capsule.id = self.ids.generate();
        }
        if capsule.created_at == chrono::DateTime::<chrono::Utc>::default() || capsule.created_at > now {
            capsule.created_at = now;
        }
        capsule.updated_at = now;

        let mut index = self.load_index();
        match index.iter_mut().find(|e| e.id == capsule.id) {
            Some(entry) => update(entry, capsule),
            None => index.push(IndexEntry::from_capsule(capsule)),
        }

        let mut batch = WriteBatch::new();
        batch
            .put(capsule_key(&capsule.id), serde_json::to_string(capsule)?)
            .put(INDEX_KEY, serde_json::to_string(&index)?);
        self.backend.apply(batch)?;

        log::info!("Saved capsule {} ({})", capsule.id, capsule.title);
        self.emit(StoreEvent::Saved {
            id: capsule.id.clone(),
        });
        Ok(())
    }

    /// Remove a capsule, its progress and its index entry in one step.
    ///
    /// Returns whether the capsule was indexed. Unknown ids are not an error.
    pub fn delete_capsule(&mut self, id: &str) -> std::result::Result<bool, StorageError> {
        let mut index = self.load_index();
        let before = index.len();
        index.retain(|e| e.id != id);
        let was_indexed = index.len() != before;

        let mut batch = WriteBatch::new();
        batch
            .delete(capsule_key(id))
            .delete(progress_key(id))
            .put(INDEX_KEY, serde_json::to_string(&index)?);
        self.backend.apply(batch)?;

        if was_indexed {
            log::info!("Deleted capsule {}", id);
            self.emit(StoreEvent::Deleted { id: id.to_string() });
        }
        Ok(was_indexed)
    }

    // ==================== Progress Operations ====================

    /// Stored progress, or empty defaults
    pub fn load_progress(&self, id: &str) -> Progress {
        self.read_json(&progress_key(id)).unwrap_or_default()
    }

    pub fn save_progress(&mut self, id: &str, progress: &Progress) -> std::result::Result<(), StorageError> {
        let json = serde_json::to_string(progress)?;
        self.backend.set(&progress_key(id), &json)
    }

    // ==================== Import / Export ====================

    /// Validate, persist and index an exported capsule. Returns its id.
    ///
    /// An id that is already indexed keeps its entry's subject and level;
    /// only the title and timestamp follow the imported copy.
    /// Rejected input leaves the store untouched.
    pub fn import_capsule(&mut self, text: &str) -> Result<String> {
        let mut capsule = deserialize_capsule(text, self.ids.as_ref(), self.clock.as_ref())?;
        let already_indexed = self.contains(&capsule.id);
        self.persist(&mut capsule, IndexEntry::touch)?;

        log::info!(
            "Imported capsule {} ({}){}",
            capsule.id,
            capsule.title,
            if already_indexed { ", replacing existing copy" } else { "" }
        );
        self.emit(StoreEvent::Imported {
            id: capsule.id.clone(),
        });
        Ok(capsule.id)
    }

    /// Read a file and import its contents
    pub fn import_file(&mut self, path: &Path) -> Result<String> {
        let text = fs::read_to_string(path)?;
        self.import_capsule(&text)
    }

    pub fn export_capsule(&self, id: &str) -> Result<ExportedCapsule> {
        let capsule = self
            .load_capsule(id)
            .ok_or_else(|| CapsuleError::NotFound(id.to_string()))?;
        Ok(ExportedCapsule {
            file_name: export_file_name(&capsule.title),
            contents: serialize_capsule(&capsule)?,
        })
    }

    // ==================== Maintenance ====================

    /// Remove every key this store owns. Returns how many were removed.
    pub fn clear_all(&mut self) -> std::result::Result<usize, StorageError> {
        let keys: Vec<String> = self
            .backend
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(NAMESPACE_PREFIX))
            .collect();

        let mut batch = WriteBatch::new();
        for key in &keys {
            batch.delete(key.as_str());
        }
        self.backend.apply(batch)?;

        log::info!("Cleared {} stored record(s)", keys.len());
        self.emit(StoreEvent::Cleared);
        Ok(keys.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capsules::ids::{ManualClock, SequentialIdGenerator};
    use crate::capsules::models::{timestamp, Flashcard};
    use crate::storage::{FileStore, MemoryStore};
    use std::rc::Rc;
    use tempfile::TempDir;

    fn create_test_store() -> (CapsuleStore<MemoryStore>, Rc<ManualClock>) {
        let start = timestamp::parse("2024-03-01T12:00:00.000Z").unwrap();
        let clock = Rc::new(ManualClock::new(start));
        let store = CapsuleStore::with_generators(
            MemoryStore::new(),
            Box::new(SequentialIdGenerator::new("cap_test_")),
            Box::new(Rc::clone(&clock)),
        );
        (store, clock)
    }

    fn saved_capsule(store: &mut CapsuleStore<MemoryStore>, title: &str) -> Capsule {
        let mut capsule = Capsule::new(title);
        capsule.flashcards = vec![Flashcard::new("front", "back")];
        store.save_capsule(&mut capsule).unwrap();
        capsule
    }

    #[test]
    fn test_save_assigns_id_and_timestamps() {
        let (mut store, clock) = create_test_store();
        let capsule = saved_capsule(&mut store, "Algebra");

        assert_eq!(capsule.id, "cap_test_1");
        assert_eq!(capsule.created_at, clock.now());
        assert_eq!(capsule.updated_at, clock.now());
        assert_eq!(store.load_capsule("cap_test_1"), Some(capsule));
    }

    #[test]
    fn test_save_indexes_exactly_once() {
        let (mut store, clock) = create_test_store();
        let mut capsule = saved_capsule(&mut store, "Algebra");

        clock.advance(chrono::Duration::minutes(3));
        capsule.title = "Linear Algebra".to_string();
        capsule.subject = "math".to_string();
        store.save_capsule(&mut capsule).unwrap();

        let index = store.load_index();
        let matching: Vec<&IndexEntry> = index.iter().filter(|e| e.id == capsule.id).collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].title, "Linear Algebra");
        assert_eq!(matching[0].updated_at, capsule.updated_at);
        assert_eq!(matching[0].subject.as_deref(), Some("math"));
        assert!(capsule.updated_at > capsule.created_at);
    }

    #[test]
    fn test_index_keeps_insertion_order() {
        let (mut store, _clock) = create_test_store();
        saved_capsule(&mut store, "First");
        saved_capsule(&mut store, "Second");
        saved_capsule(&mut store, "Third");

        let titles: Vec<String> = store.load_index().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn test_delete_removes_everything() {
        let (mut store, _clock) = create_test_store();
        let capsule = saved_capsule(&mut store, "Algebra");
        let mut progress = Progress::default();
        progress.mark_known(0);
        store.save_progress(&capsule.id, &progress).unwrap();

        assert!(store.delete_capsule(&capsule.id).unwrap());

        assert_eq!(store.load_capsule(&capsule.id), None);
        assert_eq!(store.load_progress(&capsule.id), Progress::default());
        assert!(store.load_index().iter().all(|e| e.id != capsule.id));
        assert_eq!(store.backend().keys().unwrap(), vec![INDEX_KEY.to_string()]);
    }

    #[test]
    fn test_delete_unknown_is_noop() {
        let (mut store, _clock) = create_test_store();
        saved_capsule(&mut store, "Algebra");

        assert!(!store.delete_capsule("cap_nope").unwrap());
        assert_eq!(store.load_index().len(), 1);
    }

    #[test]
    fn test_loads_are_fail_soft() {
        let (mut store, _clock) = create_test_store();
        assert_eq!(store.load_capsule("nonexistent"), None);
        assert_eq!(store.load_progress("nonexistent"), Progress::default());
        assert!(store.load_index().is_empty());

        let capsule = saved_capsule(&mut store, "Algebra");
        store.backend.set(INDEX_KEY, "{{{").unwrap();
        store.backend.set(&capsule_key(&capsule.id), "not json").unwrap();
        store.backend.set(&progress_key(&capsule.id), "[1,").unwrap();

        assert!(store.load_index().is_empty());
        assert_eq!(store.load_capsule(&capsule.id), None);
        assert_eq!(store.load_progress(&capsule.id), Progress::default());
    }

    #[test]
    fn test_corrupt_index_entries_skipped() {
        let (mut store, _clock) = create_test_store();
        store
            .backend
            .set(
                INDEX_KEY,
                r#"[{"id":"a","title":"A","updatedAt":"2024-01-01T00:00:00.000Z"},{"id":7}]"#,
            )
            .unwrap();

        let index = store.load_index();
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].id, "a");
        assert_eq!(index[0].subject, None);
    }

    #[test]
    fn test_progress_round_trip() {
        let (mut store, _clock) = create_test_store();
        let mut progress = Progress::default();
        progress.mark_known(1);
        progress.mark_known(3);
        progress.record_score(80);

        store.save_progress("cap_x", &progress).unwrap();
        assert_eq!(store.load_progress("cap_x"), progress);
        assert_eq!(
            store.backend().get(&progress_key("cap_x")).unwrap().as_deref(),
            Some(r#"{"knownFlashcards":[1,3],"bestScore":80}"#)
        );
    }

    #[test]
    fn test_import_persists_and_notifies() {
        let (mut store, _clock) = create_test_store();
        let events = store.subscribe();

        let id = store.import_capsule(r#"{"title":"Imported"}"#).unwrap();

        let capsule = store.load_capsule(&id).unwrap();
        assert_eq!(capsule.subject, "general");
        let entry = store.load_index().into_iter().find(|e| e.id == id).unwrap();
        assert_eq!(entry.subject.as_deref(), Some("general"));
        assert_eq!(entry.level.as_deref(), Some("Beginner"));

        let received: Vec<StoreEvent> = events.try_iter().collect();
        assert_eq!(
            received,
            vec![
                StoreEvent::Saved { id: id.clone() },
                StoreEvent::Imported { id: id.clone() },
            ]
        );
    }

    #[test]
    fn test_import_existing_id_keeps_single_entry() {
        let (mut store, _clock) = create_test_store();
        let capsule = saved_capsule(&mut store, "Algebra");

        let text = format!(r#"{{"id":"{}","title":"Algebra v2"}}"#, capsule.id);
        store.import_capsule(&text).unwrap();

        let index = store.load_index();
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].title, "Algebra v2");
    }

    #[test]
    fn test_import_existing_id_keeps_subject_and_level() {
        let (mut store, clock) = create_test_store();
        let mut capsule = Capsule::new("Algebra");
        capsule.subject = "math".to_string();
        capsule.level = "Advanced".to_string();
        store.save_capsule(&mut capsule).unwrap();

        clock.advance(chrono::Duration::minutes(1));
        let text = format!(r#"{{"id":"{}","title":"Algebra"}}"#, capsule.id);
        store.import_capsule(&text).unwrap();

        let index = store.load_index();
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].subject.as_deref(), Some("math"));
        assert_eq!(index[0].level.as_deref(), Some("Advanced"));
        assert_eq!(index[0].updated_at, clock.now());

        // A plain save still refreshes them
        let mut reloaded = store.load_capsule(&capsule.id).unwrap();
        reloaded.subject = "algebra".to_string();
        store.save_capsule(&mut reloaded).unwrap();
        assert_eq!(store.load_index()[0].subject.as_deref(), Some("algebra"));
    }

    #[test]
    fn test_rejected_import_writes_nothing() {
        let (mut store, _clock) = create_test_store();
        let events = store.subscribe();

        let err = store
            .import_capsule(r#"{"title":"X","schema":"other/v9"}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            CapsuleError::Validation(ValidationError::UnsupportedSchema(_))
        ));
        assert!(store.backend().is_empty());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_import_missing_file_is_read_error() {
        let (mut store, _clock) = create_test_store();
        let err = store.import_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, CapsuleError::Read(_)));
    }

    #[test]
    fn test_export_uses_slug_file_name() {
        let (mut store, _clock) = create_test_store();
        let capsule = saved_capsule(&mut store, "Élan Vital");

        let exported = store.export_capsule(&capsule.id).unwrap();
        assert_eq!(exported.file_name, "elan-vital.json");
        assert!(exported.contents.contains("\"schema\": \"pocket-classroom/v1\""));

        assert!(matches!(
            store.export_capsule("cap_nope"),
            Err(CapsuleError::NotFound(_))
        ));
    }

    #[test]
    fn test_clear_all_only_touches_namespace() {
        let (mut store, _clock) = create_test_store();
        saved_capsule(&mut store, "Algebra");
        store.backend.set("other_app_key", "keep").unwrap();

        assert_eq!(store.clear_all().unwrap(), 2);
        assert_eq!(store.backend().keys().unwrap(), vec!["other_app_key".to_string()]);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let (mut store, _clock) = create_test_store();
        let events = store.subscribe();
        drop(events);

        saved_capsule(&mut store, "Algebra");
        assert!(store.subscribers.is_empty());
    }

    #[test]
    fn test_failed_delete_never_leaves_stale_index() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        let start = timestamp::parse("2024-03-01T12:00:00.000Z").unwrap();
        let mut store = CapsuleStore::with_generators(
            FileStore::open(root.clone()).unwrap(),
            Box::new(SequentialIdGenerator::new("cap_test_")),
            Box::new(ManualClock::new(start)),
        );
        let mut first = Capsule::new("First");
        store.save_capsule(&mut first).unwrap();

        // Block the progress removal halfway through the delete
        let blocker = root.join(format!("{}.json", progress_key(&first.id)));
        fs::create_dir_all(blocker.join("inner")).unwrap();
        assert!(store.delete_capsule(&first.id).is_err());

        let mut second = Capsule::new("Second");
        assert!(store.save_capsule(&mut second).is_err());

        fs::remove_dir_all(&blocker).unwrap();
        store.save_capsule(&mut second).unwrap();

        let titles: Vec<String> = store.load_index().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, vec!["Second"]);
        assert_eq!(store.load_capsule(&first.id), None);

        let reopened = CapsuleStore::new(FileStore::open(root).unwrap());
        assert!(!reopened.contains(&first.id));
        assert!(reopened.contains(&second.id));
    }

    #[test]
    fn test_file_backed_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let id = {
            let mut store = CapsuleStore::new(FileStore::open(temp_dir.path().to_path_buf()).unwrap());
            let mut capsule = Capsule::new("On Disk");
            store.save_capsule(&mut capsule).unwrap();
            capsule.id
        };

        let store = CapsuleStore::new(FileStore::open(temp_dir.path().to_path_buf()).unwrap());
        assert_eq!(store.load_capsule(&id).unwrap().title, "On Disk");
        assert!(store.contains(&id));
        assert!(id.starts_with("cap_"));
    }
}
