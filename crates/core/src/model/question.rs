use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{QuestionId, StratumKey};

/// Number of answer options every question carries.
pub const OPTION_COUNT: usize = 4;

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

/// Question format marker from the catalog data.
///
/// Only single-choice questions are supported; any other value deserializes
/// to `Unknown` so a catalog file with newer kinds still parses and the
/// loader can filter them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    #[default]
    Single,
    #[serde(other)]
    Unknown,
}

/// Optional media attached to a question (referenced by the presentation
/// layer, carried through here untouched).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAsset {
    #[serde(rename = "type")]
    pub kind: String,
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// A multiple-choice question as loaded from the catalog.
///
/// Immutable once loaded; the catalog loader owns construction from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    subject: String,
    #[serde(default)]
    year: Option<i32>,
    chapter: String,
    #[serde(rename = "type", default)]
    kind: QuestionKind,
    question_text: String,
    options: [String; OPTION_COUNT],
    answer_index: u8,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_display: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    assets: Vec<QuestionAsset>,
}

impl Question {
    /// Build a question, validating the answer index.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::AnswerIndexOutOfRange` if `answer_index` does
    /// not address one of the four options.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: QuestionId,
        subject: impl Into<String>,
        chapter: impl Into<String>,
        question_text: impl Into<String>,
        options: [String; OPTION_COUNT],
        answer_index: u8,
        explanation: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        if usize::from(answer_index) >= OPTION_COUNT {
            return Err(QuestionError::AnswerIndexOutOfRange {
                index: answer_index,
            });
        }
        Ok(Self {
            id,
            subject: subject.into(),
            year: None,
            chapter: chapter.into(),
            kind: QuestionKind::Single,
            question_text: question_text.into(),
            options,
            answer_index,
            explanation: explanation.into(),
            source: source.into(),
            source_display: None,
            assets: Vec::new(),
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn year(&self) -> Option<i32> {
        self.year
    }

    #[must_use]
    pub fn chapter(&self) -> &str {
        &self.chapter
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn question_text(&self) -> &str {
        &self.question_text
    }

    #[must_use]
    pub fn options(&self) -> &[String; OPTION_COUNT] {
        &self.options
    }

    #[must_use]
    pub fn answer_index(&self) -> u8 {
        self.answer_index
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Human-facing source label, falling back to the raw source reference.
    #[must_use]
    pub fn display_source(&self) -> &str {
        self.source_display.as_deref().unwrap_or(&self.source)
    }

    #[must_use]
    pub fn assets(&self) -> &[QuestionAsset] {
        &self.assets
    }

    /// Returns the stratum key this question belongs to.
    #[must_use]
    pub fn stratum(&self) -> StratumKey {
        self.id.stratum()
    }

    /// Whether the given option index is the correct answer.
    #[must_use]
    pub fn is_correct(&self, choice: u8) -> bool {
        choice == self.answer_index
    }
}

//
// ─── QUESTION VALIDATION ERRORS ────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuestionError {
    #[error("answer index {index} does not address one of the four options")]
    AnswerIndexOutOfRange { index: u8 },
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
