use crate::capsules::{Capsule, CapsuleStore, Flashcard, Progress};
use crate::storage::{KeyValueStore, StorageError};

use super::quiz::{QuizResult, QuizRun};

/// Where the learner is in the flashcard deck
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashStatus {
    /// One-based card number
    pub position: usize,
    pub total: usize,
    pub known: usize,
    pub current_known: bool,
}

/// Learn-mode state for one capsule
#[derive(Debug, Clone)]
pub struct LearnSession {
    capsule: Capsule,
    progress: Progress,
    card: usize,
    flipped: bool,
}

impl LearnSession {
    /// Load an indexed capsule and its progress. `None` if the capsule
    /// is not in the index or can't be loaded.
    pub fn open<S: KeyValueStore>(store: &CapsuleStore<S>, id: &str) -> Option<Self> {
        if !store.contains(id) {
            return None;
        }
        let capsule = store.load_capsule(id)?;
        let progress = store.load_progress(id);
        Some(Self {
            capsule,
            progress,
            card: 0,
            flipped: false,
        })
    }

    pub fn capsule(&self) -> &Capsule {
        &self.capsule
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    // ==================== Notes ====================

    /// Notes containing `query`, ignoring case. An empty query matches all.
    pub fn filter_notes(&self, query: &str) -> Vec<&str> {
        let needle = query.to_lowercase();
        self.capsule
            .notes
            .iter()
            .filter(|n| n.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect()
    }

    // ==================== Flashcards ====================

    pub fn current_card(&self) -> Option<&Flashcard> {
        self.capsule.flashcards.get(self.card)
    }

    pub fn card_index(&self) -> usize {
        self.card
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    /// Turn the current card over; returns the new side (true = back)
    pub fn flip(&mut self) -> bool {
        self.flipped = !self.flipped;
        self.flipped
    }

    pub fn next_card(&mut self) {
        let total = self.capsule.flashcards.len();
        if total > 0 {
            self.card = (self.card + 1) % total;
        }
        self.flipped = false;
    }

    pub fn prev_card(&mut self) {
        let total = self.capsule.flashcards.len();
        if total > 0 {
            self.card = (self.card + total - 1) % total;
        }
        self.flipped = false;
    }

    /// Jump to a card by position; false if out of range
    pub fn go_to_card(&mut self, index: usize) -> bool {
        if index >= self.capsule.flashcards.len() {
            return false;
        }
        self.card = index;
        self.flipped = false;
        true
    }

    /// Mark the current card known and persist progress
    pub fn mark_known<S: KeyValueStore>(&mut self, store: &mut CapsuleStore<S>) -> Result<(), StorageError> {
        if self.current_card().is_none() {
            return Ok(());
        }
        if self.progress.mark_known(self.card) {
            store.save_progress(&self.capsule.id, &self.progress)?;
        }
        Ok(())
    }

    /// Mark the current card unknown and persist progress
    pub fn mark_unknown<S: KeyValueStore>(&mut self, store: &mut CapsuleStore<S>) -> Result<(), StorageError> {
        if self.current_card().is_none() {
            return Ok(());
        }
        if self.progress.mark_unknown(self.card) {
            store.save_progress(&self.capsule.id, &self.progress)?;
        }
        Ok(())
    }

    /// `None` when the capsule has no flashcards
    pub fn flash_status(&self) -> Option<FlashStatus> {
        let total = self.capsule.flashcards.len();
        if total == 0 {
            return None;
        }
        Some(FlashStatus {
            position: self.card + 1,
            total,
            known: self.progress.known_count(),
            current_known: self.progress.is_known(self.card),
        })
    }

    // ==================== Quiz ====================

    /// A fresh run over the quiz, `None` if the capsule has no questions
    pub fn start_quiz(&self) -> Option<QuizRun> {
        QuizRun::new(self.capsule.quiz.clone())
    }

    /// Fold a finished run into the best score and persist it.
    /// Returns `None` if the run still has unanswered questions.
    pub fn record_quiz<S: KeyValueStore>(
        &mut self,
        run: &QuizRun,
        store: &mut CapsuleStore<S>,
    ) -> Result<Option<QuizResult>, StorageError> {
        if !run.is_finished() {
            return Ok(None);
        }
        let score = run.score();
        let new_best = self.progress.record_score(score);
        store.save_progress(&self.capsule.id, &self.progress)?;

        log::info!(
            "Quiz finished for {}: {}% (best {}%)",
            self.capsule.id,
            score,
            self.progress.best_score
        );
        Ok(Some(QuizResult {
            correct: run.correct(),
            total: run.total(),
            score,
            best_score: self.progress.best_score,
            new_best,
        }))
    }
}
