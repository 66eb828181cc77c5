use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use pocket_classroom_lib::capsules::{Capsule, CapsuleStore, IndexEntry};
use pocket_classroom_lib::config::AppConfig;
use pocket_classroom_lib::storage::{default_data_dir, FileStore};

/// Shared application state for CLI commands
pub struct App {
    pub store: CapsuleStore<FileStore>,
    pub config: AppConfig,
}

impl App {
    /// Open the capsule store. `--data-dir` wins over the config file,
    /// which wins over the platform default.
    pub fn new(data_dir: Option<PathBuf>, config: AppConfig) -> Result<Self> {
        let data_dir = match data_dir.or_else(|| config.data_dir.clone()) {
            Some(dir) => dir,
            None => default_data_dir().context("Failed to get data directory")?,
        };
        log::debug!("Using data directory {:?}", data_dir);

        let backend = FileStore::open(data_dir.clone())
            .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;

        Ok(Self {
            store: CapsuleStore::new(backend),
            config,
        })
    }

    /// Find a capsule by id, or by title (case-insensitive, exact then prefix)
    pub fn find_entry(&self, query: &str) -> Result<IndexEntry> {
        let entries = self.store.load_index();

        if let Some(entry) = entries.iter().find(|e| e.id == query) {
            return Ok(entry.clone());
        }

        let query_lower = query.to_lowercase();

        // Exact match first
        if let Some(entry) = entries.iter().find(|e| e.title.to_lowercase() == query_lower) {
            return Ok(entry.clone());
        }

        // Prefix match
        let matches: Vec<&IndexEntry> = entries.iter()
            .filter(|e| e.title.to_lowercase().starts_with(&query_lower))
            .collect();

        match matches.len() {
            0 => bail!("No capsule matching '{}'. Available capsules:\n{}", query,
                entries.iter().map(|e| format!("  - {}", e.title)).collect::<Vec<_>>().join("\n")),
            1 => Ok(matches[0].clone()),
            _ => bail!("Ambiguous capsule title '{}'. Matches:\n{}", query,
                matches.iter().map(|e| format!("  - {} ({})", e.title, e.id)).collect::<Vec<_>>().join("\n")),
        }
    }

    /// Find and load a full capsule
    pub fn find_capsule(&self, query: &str) -> Result<Capsule> {
        let entry = self.find_entry(query)?;
        self.store
            .load_capsule(&entry.id)
            .with_context(|| format!("Capsule '{}' is indexed but its data is missing or corrupt", entry.title))
    }

    /// Save a capsule through the store
    pub fn save_capsule(&mut self, capsule: &mut Capsule) -> Result<()> {
        self.store.save_capsule(capsule)
            .with_context(|| format!("Failed to save capsule '{}'", capsule.title))
    }
}
