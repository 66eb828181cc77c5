//! Authoring helpers
//!
//! The editor keeps a transient copy of a capsule and writes it back through
//! the store. These functions cover the parts of that round trip that are not
//! rendering: turning form text into capsule fields and back, and the blank
//! templates new rows start from.

use crate::capsules::{Capsule, Flashcard, QuizQuestion};

/// Number of options a new quiz question starts with
pub const QUIZ_OPTION_COUNT: usize = 4;

/// Raw metadata fields as typed into the editor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapsuleForm {
    pub title: String,
    pub subject: String,
    pub level: String,
    pub desc: String,
    /// One note per line
    pub notes: String,
}

impl CapsuleForm {
    /// Form contents for editing an existing capsule
    pub fn from_capsule(capsule: &Capsule) -> Self {
        Self {
            title: capsule.title.clone(),
            subject: capsule.subject.clone(),
            level: capsule.level.clone(),
            desc: capsule.desc.clone(),
            notes: notes_to_text(&capsule.notes),
        }
    }
}

/// A blank capsule for the editor
pub fn new_capsule() -> Capsule {
    Capsule::new("")
}

/// Copy form fields onto `capsule`, trimming free text.
///
/// An empty level keeps whatever the capsule already had.
pub fn apply_form(capsule: &mut Capsule, form: &CapsuleForm) {
    capsule.title = form.title.trim().to_string();
    capsule.subject = form.subject.trim().to_string();
    capsule.desc = form.desc.trim().to_string();

    let level = form.level.trim();
    if !level.is_empty() {
        capsule.level = level.to_string();
    }
    capsule.notes = parse_notes(&form.notes);
}

/// Split textarea text into notes, dropping blank lines
pub fn parse_notes(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn notes_to_text(notes: &[String]) -> String {
    notes.join("\n")
}

pub fn new_flashcard() -> Flashcard {
    Flashcard::new("", "")
}

pub fn new_quiz_question() -> QuizQuestion {
    QuizQuestion::new("", vec![String::new(); QUIZ_OPTION_COUNT], 0)
}

/// Answer index typed into the editor; anything unparseable is 0
pub fn parse_answer_index(text: &str) -> usize {
    text.trim().parse().unwrap_or(0)
}

/// Whether the capsule can be saved from the editor
pub fn validate_title(capsule: &Capsule) -> bool {
    !capsule.title.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_capsule_defaults() {
        let capsule = new_capsule();
        assert!(!capsule.has_id());
        assert_eq!(capsule.title, "");
        assert_eq!(capsule.level, "Beginner");
        assert!(capsule.notes.is_empty());
        assert!(capsule.flashcards.is_empty());
        assert!(capsule.quiz.is_empty());
    }

    #[test]
    fn test_apply_form_trims_and_splits_notes() {
        let mut capsule = new_capsule();
        let form = CapsuleForm {
            title: "  Photosynthesis ".to_string(),
            subject: " Biology".to_string(),
            level: "Advanced".to_string(),
            desc: "\tLight reactions\n".to_string(),
            notes: "Chlorophyll absorbs light\n\n   \n  Produces oxygen  \r\nNeeds CO2".to_string(),
        };
        apply_form(&mut capsule, &form);

        assert_eq!(capsule.title, "Photosynthesis");
        assert_eq!(capsule.subject, "Biology");
        assert_eq!(capsule.level, "Advanced");
        assert_eq!(capsule.desc, "Light reactions");
        assert_eq!(
            capsule.notes,
            vec!["Chlorophyll absorbs light", "Produces oxygen", "Needs CO2"]
        );
    }

    #[test]
    fn test_apply_form_keeps_level_when_blank() {
        let mut capsule = new_capsule();
        capsule.level = "Intermediate".to_string();
        apply_form(&mut capsule, &CapsuleForm::default());
        assert_eq!(capsule.level, "Intermediate");
    }

    #[test]
    fn test_form_round_trip_through_capsule() {
        let mut capsule = new_capsule();
        capsule.title = "Rust".to_string();
        capsule.notes = vec!["Ownership".to_string(), "Borrowing".to_string()];

        let form = CapsuleForm::from_capsule(&capsule);
        assert_eq!(form.notes, "Ownership\nBorrowing");

        let mut copy = new_capsule();
        apply_form(&mut copy, &form);
        assert_eq!(copy.title, capsule.title);
        assert_eq!(copy.notes, capsule.notes);
    }

    #[test]
    fn test_templates() {
        let card = new_flashcard();
        assert_eq!(card.front, "");
        assert_eq!(card.back, "");

        let question = new_quiz_question();
        assert_eq!(question.question, "");
        assert_eq!(question.options, vec![String::new(); 4]);
        assert_eq!(question.answer_index, 0);
    }

    #[test]
    fn test_parse_answer_index() {
        assert_eq!(parse_answer_index("2"), 2);
        assert_eq!(parse_answer_index(" 3 "), 3);
        assert_eq!(parse_answer_index(""), 0);
        assert_eq!(parse_answer_index("two"), 0);
        assert_eq!(parse_answer_index("-1"), 0);
    }

    #[test]
    fn test_validate_title() {
        let mut capsule = new_capsule();
        assert!(!validate_title(&capsule));
        capsule.title = "   ".to_string();
        assert!(!validate_title(&capsule));
        capsule.title = "Maths".to_string();
        assert!(validate_title(&capsule));
    }
}
