use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::model::QuestionId;

//
// ─── ANSWER OPTION ─────────────────────────────────────────────────────────────
//

/// One of the four multiple-choice option labels.
///
/// This type is the single authority on what counts as an answer: a raw
/// string is an answer if and only if [`AnswerOption::parse`] accepts it
/// (trimmed, case-insensitive `A`–`D`). The persistence rule, the resume
/// gate and the reconciliation validation all count answers through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnswerOption {
    A,
    B,
    C,
    D,
}

impl AnswerOption {
    /// The label unanswered questions are defaulted to on submission.
    pub const FIRST: Self = Self::A;

    /// Parses a raw option label, tolerating surrounding whitespace and
    /// lowercase input. Anything else is not an answer.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            s if s.eq_ignore_ascii_case("a") => Some(Self::A),
            s if s.eq_ignore_ascii_case("b") => Some(Self::B),
            s if s.eq_ignore_ascii_case("c") => Some(Self::C),
            s if s.eq_ignore_ascii_case("d") => Some(Self::D),
            _ => None,
        }
    }

    /// Returns the canonical uppercase label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl fmt::Display for AnswerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AnswerOption {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AnswerOption {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid option label: {raw:?}")))
    }
}

/// Deserializes an optional answer leniently: empty, malformed or missing
/// labels become `None` instead of a parse error.
///
/// Stored snapshots may carry arbitrary strings in the answer field; only a
/// valid label counts as an answer, everything else reads back as absent.
pub fn lenient_answer<'de, D>(deserializer: D) -> Result<Option<AnswerOption>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(AnswerOption::parse))
}

//
// ─── QUIZ QUESTION ─────────────────────────────────────────────────────────────
//

/// A multiple-choice question as fetched from the question source.
///
/// Immutable once fetched; the client never edits question content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: QuestionId,
    pub topic: String,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: AnswerOption,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtopic: Option<String>,
}

impl QuizQuestion {
    /// Returns the display text for the given option label.
    #[must_use]
    pub fn option_text(&self, option: AnswerOption) -> &str {
        match option {
            AnswerOption::A => &self.option_a,
            AnswerOption::B => &self.option_b,
            AnswerOption::C => &self.option_c,
            AnswerOption::D => &self.option_d,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
