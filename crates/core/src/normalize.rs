/// Sentence terminators stripped once from the end of normalized text.
const TRAILING_TERMINATORS: [char; 3] = ['.', '．', '。'];

/// Canonicalizes question text for fingerprinting.
///
/// Collapses every whitespace run (including full-width and no-break
/// variants) to a single ASCII space, trims both ends, and strips a single
/// trailing sentence terminator together with any whitespace before it.
/// Pure and total: any input yields a string, an empty input yields `""`.
#[must_use]
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }

    if out.ends_with(&TRAILING_TERMINATORS[..]) {
        out.pop();
        while out.ends_with(' ') {
            out.pop();
        }
    }

    out
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_runs_to_single_space() {
        assert_eq!(normalize("a  b\t\tc\n d"), "a b c d");
    }

    #[test]
    fn collapses_fullwidth_and_nobreak_spaces() {
        assert_eq!(normalize("甲\u{3000}乙\u{00A0}丙"), "甲 乙 丙");
        assert_eq!(normalize("a\u{3000}\u{00A0} b"), "a b");
    }

    #[test]
    fn strips_single_trailing_terminator() {
        assert_eq!(normalize("下列何者正確。"), "下列何者正確");
        assert_eq!(normalize("correct answer."), "correct answer");
        assert_eq!(normalize("全形句點．"), "全形句點");
    }

    #[test]
    fn strips_whitespace_before_trailing_terminator() {
        assert_eq!(normalize("answer ."), "answer");
    }

    #[test]
    fn keeps_interior_terminators() {
        assert_eq!(normalize("e.g. this one"), "e.g. this one");
    }

    #[test]
    fn empty_input_yields_empty_string() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \u{3000} "), "");
    }

    #[test]
    fn idempotent() {
        for s in ["a  b 。", "  x\u{00A0}y.", "甲 乙", ""] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn whitespace_only_differences_collapse_to_identical_output() {
        assert_eq!(normalize("甲 乙 丙"), normalize("甲\u{3000}乙  丙。"));
    }
}
