pub mod clear;
pub mod delete;
pub mod edit;
pub mod flashcards;
pub mod list;
pub mod new;
pub mod notes;
pub mod progress;
pub mod quiz;
pub mod show;
pub mod transfer;
