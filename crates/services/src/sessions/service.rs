use std::collections::BTreeMap;
use std::fmt;

use quiz_core::model::{Question, QuestionId};

use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── SESSION ID ────────────────────────────────────────────────────────────────
//

/// Identifier of a single quiz run, unique within a device.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory state of one quiz run.
///
/// Holds the sampled questions in presentation order, the learner's answers,
/// and the current position. Ephemeral by design: it is dropped once results
/// are produced, with only the answer map mirrored to ephemeral storage by
/// the workflow.
pub struct QuizSession {
    id: SessionId,
    questions: Vec<Question>,
    answers: BTreeMap<QuestionId, u8>,
    current: usize,
}

impl QuizSession {
    pub(crate) fn new(id: SessionId, questions: Vec<Question>) -> Self {
        Self {
            id,
            questions,
            answers: BTreeMap::new(),
            current: 0,
        }
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Selected question ids in presentation order.
    #[must_use]
    pub fn question_ids(&self) -> Vec<QuestionId> {
        self.questions.iter().map(|q| q.id().clone()).collect()
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<QuestionId, u8> {
        &self.answers
    }

    /// Total number of questions in this session.
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Number of questions that have already been answered.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Number of questions not answered yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.total().saturating_sub(self.answered_count())
    }

    /// True when the filtered pool produced no questions — the expected
    /// "no questions available" outcome, not an error.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.questions.is_empty() && self.answers.len() >= self.questions.len()
    }

    /// Returns a summary of the current session progress.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.total(),
            answered: self.answered_count(),
            remaining: self.remaining(),
            is_complete: self.is_complete(),
        }
    }

    /// The question at the current position, if any remain.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    /// Record an answer for a question in this session.
    ///
    /// A repeated answer for the same id replaces the previous one. The
    /// position advances past every already-answered question.
    pub(crate) fn record_answer(
        &mut self,
        id: &QuestionId,
        choice: u8,
    ) -> Result<&Question, SessionError> {
        let position = self
            .questions
            .iter()
            .position(|q| q.id() == id)
            .ok_or_else(|| SessionError::UnknownQuestion(id.to_string()))?;

        self.answers.insert(id.clone(), choice);
        while self
            .questions
            .get(self.current)
            .is_some_and(|q| self.answers.contains_key(q.id()))
        {
            self.current += 1;
        }

        Ok(&self.questions[position])
    }

    /// Number of answered questions matching their answer index.
    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.questions
            .iter()
            .filter(|q| self.answers.get(q.id()) == Some(&q.answer_index()))
            .count()
    }

    /// Session score as a rounded percentage, `0` for an empty session.
    #[must_use]
    pub fn score_percent(&self) -> u32 {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        let ratio = self.correct_count() as f64 / total as f64;
        (ratio * 100.0).round() as u32
    }

    /// Whether every question was answered correctly (empty sessions do not
    /// count as perfect).
    #[must_use]
    pub fn is_perfect(&self) -> bool {
        self.total() > 0 && self.correct_count() == self.total()
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("id", &self.id)
            .field("questions_len", &self.questions.len())
            .field("answered", &self.answers.len())
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
