//! Capsule import/export as text
//!
//! Export writes pretty-printed JSON in the current capsule shape. Import is
//! lenient about what it fills in but strict about what it accepts: a title is
//! required and a foreign schema tag is rejected outright.

use std::borrow::Cow;

use serde_json::{Map, Value};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

use super::ids::{Clock, IdGenerator};
use super::models::{timestamp, Capsule, DEFAULT_LEVEL, DEFAULT_SUBJECT, SCHEMA_V1};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Malformed capsule JSON: {0}")]
    Parse(String),

    #[error("Invalid or missing title")]
    MissingTitle,

    #[error("Unsupported capsule schema: {0}")]
    UnsupportedSchema(String),

    #[error("Invalid capsule data: {0}")]
    Malformed(String),
}

/// Serialize a capsule for export, stamping the schema tag if it is unset
pub fn serialize_capsule(capsule: &Capsule) -> serde_json::Result<String> {
    let capsule = if capsule.schema.is_empty() {
        let mut stamped = capsule.clone();
        stamped.schema = SCHEMA_V1.to_string();
        Cow::Owned(stamped)
    } else {
        Cow::Borrowed(capsule)
    };
    serde_json::to_string_pretty(capsule.as_ref())
}

/// Parse exported text back into a capsule, filling in defaults.
///
/// Nothing is persisted here; the caller saves the result.
pub fn deserialize_capsule(
    text: &str,
    ids: &dyn IdGenerator,
    clock: &dyn Clock,
) -> Result<Capsule, ValidationError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ValidationError::Parse(e.to_string()))?;
    let Value::Object(mut data) = value else {
        return Err(ValidationError::Parse("expected a JSON object".to_string()));
    };

    match data.get("title") {
        Some(Value::String(title)) if !title.is_empty() => {}
        _ => return Err(ValidationError::MissingTitle),
    }

    match data.get("schema") {
        None | Some(Value::Null) => {}
        Some(Value::String(schema)) if schema.is_empty() || schema == SCHEMA_V1 => {}
        Some(Value::String(schema)) => {
            return Err(ValidationError::UnsupportedSchema(schema.clone()))
        }
        Some(other) => return Err(ValidationError::UnsupportedSchema(other.to_string())),
    }

    // Anything but a non-empty string id is replaced with a fresh one
    let id = non_empty_str(&data, "id").map(str::to_string);
    data.remove("id");
    let created_at = data
        .get("createdAt")
        .and_then(Value::as_str)
        .and_then(timestamp::parse);

    for field in ["notes", "flashcards", "quiz", "resources"] {
        if !matches!(data.get(field), Some(Value::Array(_))) {
            data.insert(field.to_string(), Value::Array(Vec::new()));
        }
    }
    let subject = non_empty_str(&data, "subject").unwrap_or(DEFAULT_SUBJECT).to_string();
    let level = non_empty_str(&data, "level").unwrap_or(DEFAULT_LEVEL).to_string();
    data.insert("subject".to_string(), Value::String(subject));
    data.insert("level".to_string(), Value::String(level));
    if !matches!(data.get("desc"), Some(Value::String(_))) {
        data.insert("desc".to_string(), Value::String(String::new()));
    }

    let mut capsule: Capsule = serde_json::from_value(Value::Object(data))
        .map_err(|e| ValidationError::Malformed(e.to_string()))?;

    let now = clock.now();
    capsule.id = id.unwrap_or_else(|| ids.generate());
    capsule.schema = SCHEMA_V1.to_string();
    capsule.created_at = created_at.unwrap_or(now);
    capsule.updated_at = now;
    Ok(capsule)
}

fn non_empty_str<'a>(data: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    data.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Turn a title into a file-name-safe slug: accents stripped, lowercase,
/// runs of anything else collapsed into single hyphens.
pub fn slugify(text: &str) -> String {
    let folded: String = text
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect::<String>()
        .to_lowercase();

    let slug = folded
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        "capsule".to_string()
    } else {
        slug
    }
}

/// Suggested file name for an exported capsule
pub fn export_file_name(title: &str) -> String {
    format!("{}.json", slugify(title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capsules::ids::{ManualClock, SequentialIdGenerator};
    use crate::capsules::models::{Flashcard, QuizQuestion};

    fn fixtures() -> (SequentialIdGenerator, ManualClock) {
        let start = timestamp::parse("2024-03-01T12:00:00.000Z").unwrap();
        (SequentialIdGenerator::new("cap_test_"), ManualClock::new(start))
    }

    fn sample_capsule() -> Capsule {
        let mut capsule = Capsule::new("Cell Biology");
        capsule.id = "cap_bio".to_string();
        capsule.subject = "biology".to_string();
        capsule.level = "Intermediate".to_string();
        capsule.desc = "Organelles".to_string();
        capsule.notes = vec!["Mitochondria make ATP".to_string()];
        capsule.flashcards = vec![Flashcard::new("Nucleus", "Holds DNA")];
        capsule.quiz = vec![QuizQuestion::new(
            "Powerhouse?",
            vec!["Nucleus".into(), "Mitochondria".into(), "Ribosome".into(), "Golgi".into()],
            1,
        )];
        capsule.resources = vec![serde_json::json!({"url": "https://example.org"})];
        capsule.created_at = timestamp::parse("2024-01-01T08:00:00.000Z").unwrap();
        capsule.updated_at = timestamp::parse("2024-02-01T08:00:00.000Z").unwrap();
        capsule
    }

    #[test]
    fn test_round_trip_refreshes_only_updated_at() {
        let (ids, clock) = fixtures();
        let original = sample_capsule();

        let text = serialize_capsule(&original).unwrap();
        let restored = deserialize_capsule(&text, &ids, &clock).unwrap();

        let mut expected = original.clone();
        expected.updated_at = clock.now();
        assert_eq!(restored, expected);
    }

    #[test]
    fn test_serialize_is_indented_and_stamped() {
        let mut capsule = sample_capsule();
        capsule.schema = String::new();

        let text = serialize_capsule(&capsule).unwrap();
        assert!(text.contains("\n  \"title\": \"Cell Biology\""));
        assert!(text.contains(&format!("\"schema\": \"{SCHEMA_V1}\"")));
        assert!(text.contains("\"answerIndex\": 1"));
    }

    #[test]
    fn test_missing_title_rejected() {
        let (ids, clock) = fixtures();
        assert_eq!(
            deserialize_capsule(r#"{"subject":"math"}"#, &ids, &clock),
            Err(ValidationError::MissingTitle)
        );
        assert_eq!(
            deserialize_capsule(r#"{"title":42}"#, &ids, &clock),
            Err(ValidationError::MissingTitle)
        );
        assert_eq!(
            deserialize_capsule(r#"{"title":""}"#, &ids, &clock),
            Err(ValidationError::MissingTitle)
        );
    }

    #[test]
    fn test_foreign_schema_rejected() {
        let (ids, clock) = fixtures();
        assert_eq!(
            deserialize_capsule(r#"{"title":"X","schema":"other/v9"}"#, &ids, &clock),
            Err(ValidationError::UnsupportedSchema("other/v9".to_string()))
        );
    }

    #[test]
    fn test_unparseable_input_is_parse_error() {
        let (ids, clock) = fixtures();
        assert!(matches!(
            deserialize_capsule("{not json", &ids, &clock),
            Err(ValidationError::Parse(_))
        ));
        assert!(matches!(
            deserialize_capsule("[1, 2]", &ids, &clock),
            Err(ValidationError::Parse(_))
        ));
    }

    #[test]
    fn test_wrongly_typed_contents_are_malformed() {
        let (ids, clock) = fixtures();
        assert!(matches!(
            deserialize_capsule(r#"{"title":"X","notes":[1,2]}"#, &ids, &clock),
            Err(ValidationError::Malformed(_))
        ));
    }

    #[test]
    fn test_minimal_import_gets_defaults() {
        let (ids, clock) = fixtures();
        let capsule = deserialize_capsule(r#"{"title":"X"}"#, &ids, &clock).unwrap();

        assert_eq!(capsule.id, "cap_test_1");
        assert_eq!(capsule.title, "X");
        assert_eq!(capsule.level, "Beginner");
        assert_eq!(capsule.subject, "general");
        assert_eq!(capsule.schema, SCHEMA_V1);
        assert!(capsule.notes.is_empty());
        assert!(capsule.flashcards.is_empty());
        assert!(capsule.quiz.is_empty());
        assert!(capsule.resources.is_empty());
        assert_eq!(capsule.created_at, clock.now());
        assert_eq!(capsule.updated_at, clock.now());
    }

    #[test]
    fn test_non_array_sequences_replaced() {
        let (ids, clock) = fixtures();
        let capsule = deserialize_capsule(
            r#"{"title":"X","notes":"one note","quiz":{"q":1},"resources":null}"#,
            &ids,
            &clock,
        )
        .unwrap();

        assert!(capsule.notes.is_empty());
        assert!(capsule.quiz.is_empty());
        assert!(capsule.resources.is_empty());
    }

    #[test]
    fn test_import_keeps_existing_id_and_created_at() {
        let (ids, clock) = fixtures();
        let capsule = deserialize_capsule(
            r#"{"id":"cap_keep","title":"X","createdAt":"2023-12-24T18:30:00.000Z"}"#,
            &ids,
            &clock,
        )
        .unwrap();

        assert_eq!(capsule.id, "cap_keep");
        assert_eq!(timestamp::format(&capsule.created_at), "2023-12-24T18:30:00.000Z");
    }

    #[test]
    fn test_non_string_id_gets_fresh_one() {
        let (ids, clock) = fixtures();
        let capsule = deserialize_capsule(r#"{"id":123,"title":"X"}"#, &ids, &clock).unwrap();
        assert_eq!(capsule.id, "cap_test_1");

        let capsule = deserialize_capsule(r#"{"id":"","title":"Y"}"#, &ids, &clock).unwrap();
        assert_eq!(capsule.id, "cap_test_2");
    }

    #[test]
    fn test_import_accepts_legacy_quiz_shape() {
        let (ids, clock) = fixtures();
        let capsule = deserialize_capsule(
            r#"{"title":"X","quiz":[{"question":"Q","choices":["a","b"],"answer":1}]}"#,
            &ids,
            &clock,
        )
        .unwrap();

        assert_eq!(capsule.quiz[0].options, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(capsule.quiz[0].answer_index, 1);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Cell Biology 101"), "cell-biology-101");
        assert_eq!(slugify("Français: les bases!"), "francais-les-bases");
        assert_eq!(slugify("  --Résumé--  "), "resume");
        assert_eq!(slugify("日本語"), "capsule");
        assert_eq!(slugify(""), "capsule");
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name("World War II"), "world-war-ii.json");
    }
}
