use std::sync::Arc;

use rand::Rng;
use tracing::info;

use quiz_core::Clock;
use quiz_core::dedupe::dedupe;
use quiz_core::model::{Question, QuestionId};
use storage::ProgressStore;

use super::sampler::sample_stratified;
use super::service::{QuizSession, SessionId};
use crate::catalog::{CatalogService, DatasetSelection};
use crate::error::{CatalogError, SessionError};

const SESSION_ID_SUFFIX_LEN: usize = 8;
const SESSION_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Which questions a session draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    /// The whole filtered pool.
    #[default]
    All,
    /// Only questions currently in the wrong set.
    WrongOnly,
}

/// Pool selection for a new session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFilter {
    pub dataset: DatasetSelection,
    pub chapter: Option<String>,
    pub mode: SessionMode,
    pub count: usize,
}

impl SessionFilter {
    /// Draw `count` questions from the whole catalog.
    #[must_use]
    pub fn all(count: usize) -> Self {
        Self {
            dataset: DatasetSelection::All,
            chapter: None,
            mode: SessionMode::All,
            count,
        }
    }

    #[must_use]
    pub fn with_dataset(mut self, dataset: DatasetSelection) -> Self {
        self.dataset = dataset;
        self
    }

    #[must_use]
    pub fn with_chapter(mut self, chapter: impl Into<String>) -> Self {
        self.chapter = Some(chapter.into());
        self
    }

    #[must_use]
    pub fn wrong_only(mut self) -> Self {
        self.mode = SessionMode::WrongOnly;
        self
    }
}

/// Result of answering a single question in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub question_id: QuestionId,
    pub is_correct: bool,
    pub correct_index: u8,
    pub is_complete: bool,
}

/// Final scoring of a completed (or abandoned) session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub correct: usize,
    pub total: usize,
    pub score_percent: u32,
    pub perfect_counted: bool,
}

/// Orchestrates quiz runs: builds sessions from the catalog and records
/// their outcomes in the progress store.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    catalog: Arc<CatalogService>,
    progress: ProgressStore,
}

impl QuizService {
    #[must_use]
    pub fn new(clock: Clock, catalog: Arc<CatalogService>, progress: ProgressStore) -> Self {
        Self {
            clock,
            catalog,
            progress,
        }
    }

    /// The underlying progress store, for aggregate-stat reads.
    #[must_use]
    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    /// Build a new quiz session.
    ///
    /// A pool that filters down to nothing yields an empty session
    /// (`QuizSession::is_empty`), which the caller renders as
    /// "no questions available" — it is not an error.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the catalog cannot be loaded; the failure
    /// is propagated unchanged.
    pub async fn start_session(&self, filter: &SessionFilter) -> Result<QuizSession, CatalogError> {
        let all = self.catalog.questions(&filter.dataset).await?;
        Ok(self.build_session(filter, &all, &mut rand::rng()))
    }

    /// [`QuizService::start_session`] with an injected random source, so
    /// tests can pin the sample.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the catalog cannot be loaded.
    pub async fn start_session_with_rng<R: Rng + ?Sized>(
        &self,
        filter: &SessionFilter,
        rng: &mut R,
    ) -> Result<QuizSession, CatalogError> {
        let all = self.catalog.questions(&filter.dataset).await?;
        Ok(self.build_session(filter, &all, rng))
    }

    fn build_session<R: Rng + ?Sized>(
        &self,
        filter: &SessionFilter,
        all: &[Question],
        rng: &mut R,
    ) -> QuizSession {
        // Wrong-only mode restricts the dataset pool to the wrong set and
        // ignores the chapter filter.
        let pool: Vec<Question> = match filter.mode {
            SessionMode::WrongOnly => {
                let wrong = self.progress.wrong_ids();
                all.iter()
                    .filter(|q| wrong.contains(q.id()))
                    .cloned()
                    .collect()
            }
            SessionMode::All => match &filter.chapter {
                Some(chapter) => all
                    .iter()
                    .filter(|q| q.chapter() == chapter)
                    .cloned()
                    .collect(),
                None => all.to_vec(),
            },
        };

        let pool = dedupe(pool);
        let selected = sample_stratified(pool, filter.count, rng);
        let id = self.generate_session_id(rng);
        info!(session_id = %id, total = selected.len(), "session started");
        QuizSession::new(id, selected)
    }

    /// Record an answer for a question of the session.
    ///
    /// Every submission counts one subject attempt and one daily answer; a
    /// wrong choice additionally lands in the wrong set (question-level and
    /// subject-level). Once the last answer arrives, the full answer map is
    /// mirrored into ephemeral storage for the results view.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownQuestion` if the id is not part of the
    /// session, or `SessionError::Storage` if a progress write fails.
    pub fn answer(
        &self,
        session: &mut QuizSession,
        question_id: &QuestionId,
        choice: u8,
    ) -> Result<AnswerOutcome, SessionError> {
        let question = session.record_answer(question_id, choice)?.clone();

        let stratum = question.stratum();
        self.progress.record_subject_attempt(&stratum)?;
        let is_correct = question.is_correct(choice);
        if !is_correct {
            self.progress.record_wrong(question.id())?;
            self.progress.record_subject_wrong(&stratum)?;
        }
        self.progress.record_daily_answers(1)?;

        if session.is_complete() {
            self.progress.set_last_answers(session.answers())?;
        }

        Ok(AnswerOutcome {
            question_id: question.id().clone(),
            is_correct,
            correct_index: question.answer_index(),
            is_complete: session.is_complete(),
        })
    }

    /// Answer the question at the current position.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if no question remains, otherwise
    /// as [`QuizService::answer`].
    pub fn answer_current(
        &self,
        session: &mut QuizSession,
        choice: u8,
    ) -> Result<AnswerOutcome, SessionError> {
        let id = session
            .current_question()
            .map(|q| q.id().clone())
            .ok_or(SessionError::Completed)?;
        self.answer(session, &id, choice)
    }

    /// Score a session and, on a perfect run, count it once toward the
    /// perfect streak.
    ///
    /// Safe to call repeatedly — the streak guard keys on the session id, so
    /// a result view re-render cannot double-count.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the streak state cannot be
    /// written.
    pub fn finalize(&self, session: &QuizSession) -> Result<SessionOutcome, SessionError> {
        let correct = session.correct_count();
        let total = session.total();
        let score_percent = session.score_percent();

        let mut perfect_counted = false;
        if score_percent == 100 && total > 0 {
            perfect_counted = self
                .progress
                .try_increment_perfect_count(session.id().as_str())?;
        }

        info!(session_id = %session.id(), correct, total, score_percent, "session finalized");
        Ok(SessionOutcome {
            correct,
            total,
            score_percent,
            perfect_counted,
        })
    }

    fn generate_session_id<R: Rng + ?Sized>(&self, rng: &mut R) -> SessionId {
        let suffix: String = (0..SESSION_ID_SUFFIX_LEN)
            .map(|_| SESSION_ID_ALPHABET[rng.random_range(0..SESSION_ID_ALPHABET.len())] as char)
            .collect();
        SessionId::new(format!(
            "{}-{suffix}",
            self.clock.now().timestamp_millis()
        ))
    }
}
