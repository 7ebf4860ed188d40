use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

use quiz_core::model::{Question, StratumKey};

/// Largest share of a requested sample any single stratum may contribute
/// before the scarcity fallback kicks in.
const MAX_STRATUM_SHARE_PCT: usize = 35;

/// Per-stratum contribution cap for a request of `n` questions.
///
/// 35% of the request, floored, with a minimum of 1 so every stratum can
/// contribute something when `n` is small.
#[must_use]
pub fn stratum_cap(n: usize) -> usize {
    (n * MAX_STRATUM_SHARE_PCT / 100).max(1)
}

/// Draws a bounded, balanced random subset across subject strata.
///
/// The pool is partitioned by stratum key, stratum order and each stratum's
/// internal order are shuffled independently, and questions are collected
/// round-robin with no stratum exceeding [`stratum_cap`]. If the caps or
/// pool exhaust before `n` questions are collected, the remainder is filled
/// from the unused questions regardless of cap. The result is shuffled once
/// more so the round-robin order is not visible to the learner.
///
/// Returns at most `n` questions; fewer only when the pool itself is
/// smaller. The caller is expected to dedupe the pool first.
pub fn sample_stratified<R: Rng + ?Sized>(
    pool: Vec<Question>,
    n: usize,
    rng: &mut R,
) -> Vec<Question> {
    if n == 0 || pool.is_empty() {
        return Vec::new();
    }

    // BTreeMap keeps the partition deterministic so a seeded rng yields a
    // reproducible sample.
    let mut by_stratum: BTreeMap<StratumKey, Vec<Question>> = BTreeMap::new();
    for question in pool {
        by_stratum.entry(question.stratum()).or_default().push(question);
    }

    let mut strata: Vec<Vec<Question>> = by_stratum.into_values().collect();
    strata.shuffle(rng);
    for stratum in &mut strata {
        stratum.shuffle(rng);
    }

    let cap = stratum_cap(n);
    let mut taken = vec![0_usize; strata.len()];
    let mut selected: Vec<Question> = Vec::new();

    'rounds: loop {
        let mut progressed = false;
        for (i, stratum) in strata.iter_mut().enumerate() {
            if selected.len() == n {
                break 'rounds;
            }
            if taken[i] == cap {
                continue;
            }
            let Some(question) = stratum.pop() else {
                continue;
            };
            taken[i] += 1;
            selected.push(question);
            progressed = true;
        }
        if !progressed {
            break;
        }
    }

    // Caps or strata ran dry: top up from whatever is left, cap ignored.
    if selected.len() < n {
        let mut leftovers: Vec<Question> = strata.into_iter().flatten().collect();
        leftovers.shuffle(rng);
        let need = n - selected.len();
        selected.extend(leftovers.into_iter().take(need));
    }

    selected.shuffle(rng);
    selected
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionId;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn question(id: &str) -> Question {
        Question::new(
            QuestionId::new(id),
            "subject",
            "ch1",
            format!("text {id}"),
            ["a", "b", "c", "d"].map(String::from),
            0,
            "",
            "src",
        )
        .unwrap()
    }

    fn pool(stratum: &str, count: usize) -> Vec<Question> {
        (0..count)
            .map(|i| question(&format!("{stratum}-{i}")))
            .collect()
    }

    fn count_stratum(sample: &[Question], stratum: &str) -> usize {
        sample
            .iter()
            .filter(|q| q.stratum() == StratumKey::new(stratum))
            .count()
    }

    #[test]
    fn cap_is_35_percent_with_floor_of_one() {
        assert_eq!(stratum_cap(0), 1);
        assert_eq!(stratum_cap(2), 1);
        assert_eq!(stratum_cap(5), 1);
        assert_eq!(stratum_cap(20), 7);
        assert_eq!(stratum_cap(100), 35);
    }

    #[test]
    fn sample_len_is_min_of_n_and_pool() {
        let mut rng = StdRng::seed_from_u64(1);
        let qs = pool("s1", 10);

        assert_eq!(sample_stratified(qs.clone(), 4, &mut rng).len(), 4);
        assert_eq!(sample_stratified(qs.clone(), 10, &mut rng).len(), 10);
        assert_eq!(sample_stratified(qs.clone(), 50, &mut rng).len(), 10);
        assert!(sample_stratified(qs, 0, &mut rng).is_empty());
        assert!(sample_stratified(Vec::new(), 5, &mut rng).is_empty());
    }

    #[test]
    fn no_question_appears_twice() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut qs = pool("s1", 30);
        qs.extend(pool("s2", 30));

        let sample = sample_stratified(qs, 40, &mut rng);
        let ids: HashSet<&str> = sample.iter().map(|q| q.id().as_str()).collect();
        assert_eq!(ids.len(), sample.len());
    }

    #[test]
    fn cap_bounds_each_stratum_until_scarcity_forces_fallback() {
        // 50 + 5 questions, n = 20, cap = 7: round-robin yields 7 + 5,
        // the remaining 8 must come from the big stratum's leftovers.
        let mut rng = StdRng::seed_from_u64(3);
        let mut qs = pool("big", 50);
        qs.extend(pool("small", 5));

        let sample = sample_stratified(qs, 20, &mut rng);
        assert_eq!(sample.len(), 20);
        assert_eq!(count_stratum(&sample, "small"), 5);
        assert_eq!(count_stratum(&sample, "big"), 15);
    }

    #[test]
    fn balanced_pool_respects_cap_without_fallback() {
        // 4 strata of 10, n = 20, cap = 7: 20 fit under the caps, so no
        // stratum may exceed 7.
        let mut rng = StdRng::seed_from_u64(4);
        let mut qs = Vec::new();
        for s in ["s1", "s2", "s3", "s4"] {
            qs.extend(pool(s, 10));
        }

        let sample = sample_stratified(qs, 20, &mut rng);
        assert_eq!(sample.len(), 20);
        for s in ["s1", "s2", "s3", "s4"] {
            assert!(count_stratum(&sample, s) <= stratum_cap(20));
        }
    }

    #[test]
    fn small_request_draws_across_strata() {
        // 7 + 3 questions, n = 5, cap = 1: round-robin guarantees one from
        // each stratum before the fallback fills the rest.
        let mut rng = StdRng::seed_from_u64(5);
        let mut qs = pool("s1", 7);
        qs.extend(pool("s2", 3));

        let sample = sample_stratified(qs, 5, &mut rng);
        assert_eq!(sample.len(), 5);
        assert!(count_stratum(&sample, "s1") >= 1);
        assert!(count_stratum(&sample, "s2") >= 1);
    }

    #[test]
    fn same_seed_reproduces_the_sample() {
        let mut qs = pool("s1", 12);
        qs.extend(pool("s2", 8));

        let a = sample_stratified(qs.clone(), 10, &mut StdRng::seed_from_u64(7));
        let b = sample_stratified(qs, 10, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }
}
