//! Pocket Classroom: study capsules with notes, flashcards and quizzes.
//!
//! Everything persistent goes through [`capsules::CapsuleStore`], which sits on
//! an injected [`storage::KeyValueStore`]. The `learn`, `library` and `author`
//! modules hold the logic behind the corresponding views.

pub mod author;
pub mod capsules;
pub mod config;
pub mod learn;
pub mod library;
pub mod storage;
