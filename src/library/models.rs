//! Library listing models

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::capsules::models::timestamp;

/// Order in which capsules are listed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Index order (oldest first)
    #[default]
    Index,
    /// Most recently updated first
    RecentFirst,
}

/// Narrow down the library listing. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct LibraryFilter {
    /// Exact subject, ignoring case
    pub subject: Option<String>,
    /// Exact level, ignoring case
    pub level: Option<String>,
    /// Substring of the title, ignoring case
    pub query: Option<String>,
    pub sort: SortOrder,
}

/// One library card: index data plus counts from the capsule and its progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapsuleSummary {
    pub id: String,
    pub title: String,
    pub subject: String,
    pub level: String,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    pub note_count: usize,
    pub flashcard_count: usize,
    pub quiz_count: usize,
    pub known_flashcards: usize,
    pub best_score: u8,
}
