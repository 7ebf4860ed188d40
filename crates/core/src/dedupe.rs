use std::collections::HashSet;

use crate::model::Question;
use crate::normalize::normalize;

/// Content fingerprint for a question.
///
/// A 32-bit polynomial rolling hash (base 31, wrapping) over the normalized
/// question text and the four normalized options joined with `|` in their
/// given order. Two questions whose text and options differ only in
/// whitespace or a trailing sentence terminator produce the same key.
///
/// Known limitation: at 32 bits, hash collisions across a large catalog are
/// possible and would silently merge unrelated questions. Accepted as a
/// pragmatic tradeoff; widening the hash would change which questions
/// survive dedupe.
#[must_use]
pub fn dedupe_key(question: &Question) -> String {
    let mut joined = normalize(question.question_text());
    for option in question.options() {
        joined.push('|');
        joined.push_str(&normalize(option));
    }
    fingerprint(&joined).to_string()
}

fn fingerprint(text: &str) -> u32 {
    let mut hash: u32 = 0;
    for ch in text.chars() {
        hash = hash.wrapping_mul(31).wrapping_add(ch as u32);
    }
    hash
}

/// Removes content-duplicate questions, keeping the first occurrence.
///
/// Duplicates are detected by [`dedupe_key`] — by content, not by id — and
/// the surviving questions keep their input order.
#[must_use]
pub fn dedupe(questions: Vec<Question>) -> Vec<Question> {
    let mut seen = HashSet::with_capacity(questions.len());
    questions
        .into_iter()
        .filter(|q| seen.insert(dedupe_key(q)))
        .collect()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionId;

    fn question(id: &str, text: &str, options: [&str; 4]) -> Question {
        Question::new(
            QuestionId::new(id),
            "subject",
            "ch1",
            text,
            options.map(String::from),
            0,
            "",
            "src",
        )
        .unwrap()
    }

    #[test]
    fn identical_content_different_ids_share_a_key() {
        let a = question("a-1", "下列何者正確？", ["甲", "乙", "丙", "丁"]);
        let b = question("b-2", "下列何者正確？", ["甲", "乙", "丙", "丁"]);
        assert_eq!(dedupe_key(&a), dedupe_key(&b));
    }

    #[test]
    fn whitespace_variants_share_a_key() {
        let a = question("a-1", "何者 正確", ["甲", "乙", "丙", "丁"]);
        let b = question("a-2", "何者\u{3000}正確。", ["甲 ", " 乙", "丙", "丁"]);
        assert_eq!(dedupe_key(&a), dedupe_key(&b));
    }

    #[test]
    fn option_order_matters() {
        let a = question("a-1", "q", ["甲", "乙", "丙", "丁"]);
        let b = question("a-2", "q", ["乙", "甲", "丙", "丁"]);
        assert_ne!(dedupe_key(&a), dedupe_key(&b));
    }

    #[test]
    fn dedupe_keeps_first_seen_order() {
        let qs = vec![
            question("a-1", "one", ["a", "b", "c", "d"]),
            question("a-2", "two", ["a", "b", "c", "d"]),
            question("a-3", "one", ["a", "b", "c", "d"]),
            question("a-4", "three", ["a", "b", "c", "d"]),
        ];

        let out = dedupe(qs);
        let ids: Vec<&str> = out.iter().map(|q| q.id().as_str()).collect();
        assert_eq!(ids, vec!["a-1", "a-2", "a-4"]);
    }

    #[test]
    fn dedupe_is_idempotent() {
        let qs = vec![
            question("a-1", "one", ["a", "b", "c", "d"]),
            question("a-2", "one", ["a", "b", "c", "d"]),
            question("a-3", "two", ["a", "b", "c", "d"]),
        ];

        let once = dedupe(qs);
        let twice = dedupe(once.clone());
        assert_eq!(once, twice);
    }
}
