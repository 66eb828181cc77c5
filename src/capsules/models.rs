//! Data models for capsules, the capsule index and learner progress

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version tag stamped into every capsule
pub const SCHEMA_V1: &str = "pocket-classroom/v1";
pub const DEFAULT_SUBJECT: &str = "general";
pub const DEFAULT_LEVEL: &str = "Beginner";

fn default_level() -> String {
    DEFAULT_LEVEL.to_string()
}

/// ISO-8601 timestamps with millisecond precision and a `Z` suffix
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).trunc_subsecs(3))
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    /// Missing, null or unparseable values become `None`
    pub fn deserialize_lenient<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(parse))
    }
}

/// A two-sided study card
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    #[serde(default)]
    pub front: String,
    #[serde(default)]
    pub back: String,
}

impl Flashcard {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
        }
    }
}

/// A multiple-choice question.
///
/// Stored questions come in two shapes: the current
/// `{question, options, answerIndex}` and the older `{question, choices, answer}`.
/// Both deserialize into this type; it always serializes in the current shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "QuizQuestionRecord")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explain: Option<String>,
}

impl QuizQuestion {
    pub fn new(question: impl Into<String>, options: Vec<String>, answer_index: usize) -> Self {
        Self {
            question: question.into(),
            options,
            answer_index,
            explain: None,
        }
    }

    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.answer_index
    }

    /// Text of the correct option, if the answer index points at one
    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.answer_index).map(String::as_str)
    }
}

/// Every shape a quiz question has been stored in
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizQuestionRecord {
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    options: Option<Vec<String>>,
    #[serde(default)]
    choices: Option<Vec<String>>,
    #[serde(default)]
    answer_index: Option<serde_json::Value>,
    #[serde(default)]
    answer: Option<serde_json::Value>,
    #[serde(default)]
    explain: Option<String>,
}

fn as_index(value: Option<&serde_json::Value>) -> Option<usize> {
    value
        .and_then(serde_json::Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
}

impl From<QuizQuestionRecord> for QuizQuestion {
    fn from(record: QuizQuestionRecord) -> Self {
        let answer_index = as_index(record.answer_index.as_ref())
            .or_else(|| as_index(record.answer.as_ref()))
            .unwrap_or(0);

        Self {
            question: record.question.unwrap_or_default(),
            options: record.options.or(record.choices).unwrap_or_default(),
            answer_index,
            explain: record.explain.filter(|e| !e.is_empty()),
        }
    }
}

/// The full study unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "CapsuleRecord")]
pub struct Capsule {
    pub id: String,
    pub title: String,
    pub subject: String,
    pub level: String,
    pub desc: String,
    pub notes: Vec<String>,
    pub flashcards: Vec<Flashcard>,
    pub quiz: Vec<QuizQuestion>,
    /// Carried through save and export untouched
    pub resources: Vec<serde_json::Value>,
    pub schema: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Capsule {
    /// An unsaved capsule; id and timestamps are assigned on first save
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            subject: String::new(),
            level: default_level(),
            desc: String::new(),
            notes: Vec::new(),
            flashcards: Vec::new(),
            quiz: Vec::new(),
            resources: Vec::new(),
            schema: SCHEMA_V1.to_string(),
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
        }
    }

    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }
}

/// Stored capsule as written by any version of the application.
///
/// Older records may lack `schema` or `createdAt`; they are normalized here,
/// once, when the record is read.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CapsuleRecord {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    desc: Option<String>,
    #[serde(default)]
    notes: Vec<String>,
    #[serde(default)]
    flashcards: Vec<Flashcard>,
    #[serde(default)]
    quiz: Vec<QuizQuestion>,
    #[serde(default)]
    resources: Vec<serde_json::Value>,
    #[serde(default)]
    schema: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_lenient")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_lenient")]
    updated_at: Option<DateTime<Utc>>,
}

impl From<CapsuleRecord> for Capsule {
    fn from(record: CapsuleRecord) -> Self {
        let updated_at = record.updated_at.or(record.created_at).unwrap_or_default();
        let created_at = record.created_at.unwrap_or(updated_at);

        Self {
            id: record.id,
            title: record.title,
            subject: record.subject.unwrap_or_default(),
            level: record
                .level
                .filter(|l| !l.is_empty())
                .unwrap_or_else(default_level),
            desc: record.desc.unwrap_or_default(),
            notes: record.notes,
            flashcards: record.flashcards,
            quiz: record.quiz,
            resources: record.resources,
            schema: record
                .schema
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| SCHEMA_V1.to_string()),
            created_at,
            updated_at,
        }
    }
}

/// Summary row in the capsule index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl IndexEntry {
    pub fn from_capsule(capsule: &Capsule) -> Self {
        Self {
            id: capsule.id.clone(),
            title: capsule.title.clone(),
            subject: Some(capsule.subject.clone()),
            level: Some(capsule.level.clone()),
            updated_at: capsule.updated_at,
        }
    }

    /// Follow a re-saved capsule's title and timestamp only
    pub fn touch(&mut self, capsule: &Capsule) {
        self.title = capsule.title.clone();
        self.updated_at = capsule.updated_at;
    }

    /// Refresh the denormalized fields from a freshly saved capsule
    pub fn refresh_from(&mut self, capsule: &Capsule) {
        self.title = capsule.title.clone();
        self.subject = Some(capsule.subject.clone());
        self.level = Some(capsule.level.clone());
        self.updated_at = capsule.updated_at;
    }
}

/// Learner state for one capsule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Positions of flashcards marked as known
    #[serde(default)]
    pub known_flashcards: BTreeSet<usize>,
    /// Best quiz score, as a percentage
    #[serde(default, deserialize_with = "deserialize_score")]
    pub best_score: u8,
}

/// Any number is rounded and clamped to 0..=100; anything else reads as 0
fn deserialize_score<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let score = raw
        .as_ref()
        .and_then(serde_json::Value::as_f64)
        .filter(|n| n.is_finite())
        .map_or(0.0, |n| n.round().clamp(0.0, 100.0));
    Ok(score as u8)
}

impl Progress {
    pub fn is_known(&self, card: usize) -> bool {
        self.known_flashcards.contains(&card)
    }

    /// Returns true when the card was not already known
    pub fn mark_known(&mut self, card: usize) -> bool {
        self.known_flashcards.insert(card)
    }

    /// Returns true when the card was previously known
    pub fn mark_unknown(&mut self, card: usize) -> bool {
        self.known_flashcards.remove(&card)
    }

    pub fn known_count(&self) -> usize {
        self.known_flashcards.len()
    }

    /// Keep the higher of the stored and the new score.
    /// Returns true when `score` set a new best.
    pub fn record_score(&mut self, score: u8) -> bool {
        if score > self.best_score {
            self.best_score = score;
            true
        } else {
            false
        }
    }
}
