use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use quiz_core::Clock;
use quiz_core::model::{QuestionId, StratumKey};

use crate::kv::{InMemoryStore, KeyValueStore, StorageError};

const KEY_WRONG_IDS: &str = "quiz_wrong_ids";
const KEY_WRONG_COUNTS: &str = "quiz_wrong_counts";
const KEY_SUBJECT_WRONG: &str = "quiz_subject_wrong";
const KEY_SUBJECT_ATTEMPTS: &str = "quiz_subject_attempts";
const KEY_DAILY_PROGRESS: &str = "quiz_daily_progress";
const KEY_PERFECT_COUNT: &str = "quiz_perfect_count";
const KEY_PERFECT_LAST_SESSION: &str = "quiz_perfect_last_session";
const KEY_LAST_ANSWERS: &str = "quiz_last_answers";

/// Per-subject answer statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectStats {
    pub key: StratumKey,
    pub wrong: u32,
    pub attempts: u32,
}

impl SubjectStats {
    /// Fraction of attempts answered wrong, `0.0` when nothing was attempted.
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            f64::from(self.wrong) / f64::from(self.attempts)
        }
    }
}

/// Persistent learner-progress state over two key-value lifetimes.
///
/// The durable store holds wrong-answer tracking, per-subject counters, the
/// daily counter, and the perfect-streak state; the ephemeral store carries
/// the last session's answer map across to the results view.
///
/// Reads never fail: an absent, malformed, or unreadable value yields the
/// type's default. Writes propagate `StorageError`.
#[derive(Clone)]
pub struct ProgressStore {
    durable: Arc<dyn KeyValueStore>,
    ephemeral: Arc<dyn KeyValueStore>,
    clock: Clock,
}

impl ProgressStore {
    #[must_use]
    pub fn new(durable: Arc<dyn KeyValueStore>, ephemeral: Arc<dyn KeyValueStore>) -> Self {
        Self {
            durable,
            ephemeral,
            clock: Clock::default(),
        }
    }

    /// Build a store over two in-memory backends, for testing and prototyping.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryStore::new()),
        )
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    // ─── Wrong-answer tracking ─────────────────────────────────────────────

    /// Ids of questions answered incorrectly at least once.
    #[must_use]
    pub fn wrong_ids(&self) -> BTreeSet<QuestionId> {
        self.read_durable(KEY_WRONG_IDS)
    }

    /// Times each question id was answered wrong.
    #[must_use]
    pub fn wrong_counts(&self) -> BTreeMap<QuestionId, u32> {
        self.read_durable(KEY_WRONG_COUNTS)
    }

    /// Record a wrong answer for a question.
    ///
    /// Set membership is idempotent; the per-question counter is bumped on
    /// every call.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the durable store cannot be written.
    pub fn record_wrong(&self, id: &QuestionId) -> Result<(), StorageError> {
        let mut ids = self.wrong_ids();
        ids.insert(id.clone());
        write_json(self.durable.as_ref(), KEY_WRONG_IDS, &ids)?;

        let mut counts = self.wrong_counts();
        *counts.entry(id.clone()).or_insert(0) += 1;
        write_json(self.durable.as_ref(), KEY_WRONG_COUNTS, &counts)
    }

    /// Clear the wrong set and its per-question counters.
    ///
    /// Per-subject stats and daily progress are untouched.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the durable store cannot be written.
    pub fn clear_wrong_set(&self) -> Result<(), StorageError> {
        self.durable.remove(KEY_WRONG_IDS)?;
        self.durable.remove(KEY_WRONG_COUNTS)
    }

    // ─── Per-subject counters ──────────────────────────────────────────────

    #[must_use]
    pub fn subject_attempt_counts(&self) -> BTreeMap<StratumKey, u32> {
        self.read_durable(KEY_SUBJECT_ATTEMPTS)
    }

    #[must_use]
    pub fn subject_wrong_counts(&self) -> BTreeMap<StratumKey, u32> {
        self.read_durable(KEY_SUBJECT_WRONG)
    }

    /// Count one answer submission against a subject.
    ///
    /// Not deduplicated — every submission counts.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the durable store cannot be written.
    pub fn record_subject_attempt(&self, key: &StratumKey) -> Result<(), StorageError> {
        self.bump_subject(KEY_SUBJECT_ATTEMPTS, key)
    }

    /// Count one wrong answer against a subject.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the durable store cannot be written.
    pub fn record_subject_wrong(&self, key: &StratumKey) -> Result<(), StorageError> {
        self.bump_subject(KEY_SUBJECT_WRONG, key)
    }

    /// Merged per-subject wrong/attempt counters, sorted by stratum key.
    #[must_use]
    pub fn subject_stats(&self) -> Vec<SubjectStats> {
        let wrong = self.subject_wrong_counts();
        let attempts = self.subject_attempt_counts();
        let keys: BTreeSet<&StratumKey> = wrong.keys().chain(attempts.keys()).collect();
        keys.into_iter()
            .map(|key| SubjectStats {
                key: key.clone(),
                wrong: wrong.get(key).copied().unwrap_or(0),
                attempts: attempts.get(key).copied().unwrap_or(0),
            })
            .collect()
    }

    /// Clear per-subject wrong/attempt counters only.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the durable store cannot be written.
    pub fn clear_subject_stats(&self) -> Result<(), StorageError> {
        self.durable.remove(KEY_SUBJECT_WRONG)?;
        self.durable.remove(KEY_SUBJECT_ATTEMPTS)
    }

    fn bump_subject(&self, store_key: &str, key: &StratumKey) -> Result<(), StorageError> {
        let mut counts: BTreeMap<StratumKey, u32> = self.read_durable(store_key);
        *counts.entry(key.clone()).or_insert(0) += 1;
        write_json(self.durable.as_ref(), store_key, &counts)
    }

    // ─── Daily progress ────────────────────────────────────────────────────

    /// Calendar-date (`YYYY-MM-DD`) buckets of answered-question counts.
    #[must_use]
    pub fn daily_progress(&self) -> BTreeMap<String, u32> {
        self.read_durable(KEY_DAILY_PROGRESS)
    }

    /// Questions answered today.
    #[must_use]
    pub fn today_answered_count(&self) -> u32 {
        self.daily_progress()
            .get(&self.clock.day_key())
            .copied()
            .unwrap_or(0)
    }

    /// Add `count` to today's bucket. Buckets for past days are never touched.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the durable store cannot be written.
    pub fn record_daily_answers(&self, count: u32) -> Result<(), StorageError> {
        let mut progress = self.daily_progress();
        *progress.entry(self.clock.day_key()).or_insert(0) += count;
        write_json(self.durable.as_ref(), KEY_DAILY_PROGRESS, &progress)
    }

    // ─── Perfect streak ────────────────────────────────────────────────────

    /// Number of sessions completed with a 100% score.
    #[must_use]
    pub fn perfect_count(&self) -> u32 {
        self.read_durable(KEY_PERFECT_COUNT)
    }

    /// Count a perfect session once.
    ///
    /// The session id is recorded before the counter is allowed to move, so
    /// a result view re-rendering with the same id cannot double-count.
    /// Returns whether the counter was incremented.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the durable store cannot be written.
    pub fn try_increment_perfect_count(&self, session_id: &str) -> Result<bool, StorageError> {
        let last: Option<String> = read_json(self.durable.as_ref(), KEY_PERFECT_LAST_SESSION)
            .ok()
            .flatten();
        if last.as_deref() == Some(session_id) {
            return Ok(false);
        }

        write_json(
            self.durable.as_ref(),
            KEY_PERFECT_LAST_SESSION,
            &session_id,
        )?;
        let count = self.perfect_count() + 1;
        write_json(self.durable.as_ref(), KEY_PERFECT_COUNT, &count)?;
        Ok(true)
    }

    // ─── Last-session answers (ephemeral) ──────────────────────────────────

    /// Mirror the answer map of a finished quiz run for the results view.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the ephemeral store cannot be written.
    pub fn set_last_answers(
        &self,
        answers: &BTreeMap<QuestionId, u8>,
    ) -> Result<(), StorageError> {
        write_json(self.ephemeral.as_ref(), KEY_LAST_ANSWERS, answers)
    }

    /// Answer map of the last finished quiz run, empty when absent.
    #[must_use]
    pub fn last_answers(&self) -> BTreeMap<QuestionId, u8> {
        read_json(self.ephemeral.as_ref(), KEY_LAST_ANSWERS)
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    fn read_durable<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        read_json(self.durable.as_ref(), key)
            .ok()
            .flatten()
            .unwrap_or_default()
    }
}

/// Read and decode a JSON value. Malformed JSON is treated as absent;
/// only backend failures surface as errors (and callers map those to
/// defaults on the read path).
fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    Ok(serde_json::from_str(&raw).ok())
}

fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw =
        serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
    store.set(key, &raw)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
