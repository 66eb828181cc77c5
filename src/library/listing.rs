use chrono::{DateTime, Utc};

use super::models::{CapsuleSummary, LibraryFilter, SortOrder};
use crate::capsules::{CapsuleStore, IndexEntry};
use crate::storage::KeyValueStore;

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Index entries matching `filter`, in the requested order.
///
/// Entries written before subject and level were indexed fall back to the
/// stored capsule for those fields.
pub fn list_capsules<S: KeyValueStore>(store: &CapsuleStore<S>, filter: &LibraryFilter) -> Vec<IndexEntry> {
    let needle = filter.query.as_deref().map(str::to_lowercase);

    let mut entries: Vec<IndexEntry> = store
        .load_index()
        .into_iter()
        .map(|mut entry| {
            if entry.subject.is_none() || entry.level.is_none() {
                if let Some(capsule) = store.load_capsule(&entry.id) {
                    entry.subject.get_or_insert(capsule.subject);
                    entry.level.get_or_insert(capsule.level);
                }
            }
            entry
        })
        .filter(|entry| {
            let subject_ok = filter.subject.as_deref().map_or(true, |want| {
                entry.subject.as_deref().map_or(false, |have| eq_ignore_case(have, want))
            });
            let level_ok = filter.level.as_deref().map_or(true, |want| {
                entry.level.as_deref().map_or(false, |have| eq_ignore_case(have, want))
            });
            let query_ok = needle
                .as_deref()
                .map_or(true, |q| entry.title.to_lowercase().contains(q));
            subject_ok && level_ok && query_ok
        })
        .collect();

    if filter.sort == SortOrder::RecentFirst {
        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    }
    entries
}

/// Counts for one library card. `None` if the capsule itself is unreadable.
pub fn summarize<S: KeyValueStore>(store: &CapsuleStore<S>, entry: &IndexEntry) -> Option<CapsuleSummary> {
    let capsule = store.load_capsule(&entry.id)?;
    let progress = store.load_progress(&entry.id);

    Some(CapsuleSummary {
        id: entry.id.clone(),
        title: entry.title.clone(),
        subject: capsule.subject,
        level: capsule.level,
        updated_at: entry.updated_at,
        note_count: capsule.notes.len(),
        flashcard_count: capsule.flashcards.len(),
        quiz_count: capsule.quiz.len(),
        known_flashcards: progress.known_count(),
        best_score: progress.best_score,
    })
}

/// Coarse relative time: "just now", "5m ago", "3h ago", "2d ago"
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let mins = (now - then).num_minutes();
    if mins < 1 {
        return "just now".to_string();
    }
    if mins < 60 {
        return format!("{}m ago", mins);
    }
    let hrs = mins / 60;
    if hrs < 24 {
        return format!("{}h ago", hrs);
    }
    format!("{}d ago", hrs / 24)
}
