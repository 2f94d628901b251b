//! Property-based tests for extraction and comparison invariants.
//!
//! Arbitrary mixes of dump markers, stage error lines, and noise must never
//! panic, must land every line in at most one list, and must extract the
//! same result no matter how often they are replayed.

use proptest::prelude::*;

use super::classify::{ClassifiedLine, classify_line};
use super::stream::{ActiveList, Extractor, extract_lines, extract_reader};
use crate::compare::lists::{compare, lists_equal};
use crate::compare::render::{ACTUAL_MARKER, EXPECTED_MARKER, MATCH_MARKER, diff_rows, render_diff};

// ──────────────────── strategies ────────────────────

fn arb_word() -> impl Strategy<Value = String> {
    "[a-z0-9\\[\\]:.-]{1,8}"
}

fn arb_line() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(vec![
            "## begin sections",
            "## begin items",
            "## begin tokens",
            "## end",
            "## end items",
            "##",
        ])
        .prop_map(str::to_string),
        prop::collection::vec(arb_word(), 1..4).prop_map(|w| format!("## {}", w.join(" "))),
        prop::collection::vec(arb_word(), 0..4)
            .prop_map(|w| format!("stage error : {}", w.join(" "))),
        prop::collection::vec(arb_word(), 0..3)
            .prop_map(|w| format!("## stage error : {}", w.join(" "))),
        "[ a-z#]{0,20}",
        any::<String>(),
    ]
}

fn arb_list() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z ]{0,6}", 0..8)
}

// ──────────────────── extraction ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Classifying any line never panics and never yields text for lines
    /// that start with neither marker.
    #[test]
    fn classify_total_over_arbitrary_input(line in any::<String>()) {
        let first = line.split_whitespace().next();
        match classify_line(&line) {
            ClassifiedLine::Item(_) | ClassifiedLine::SectionOpen(_) | ClassifiedLine::SectionClose => {
                prop_assert_eq!(first, Some("##"));
            }
            ClassifiedLine::Error(_) => {
                prop_assert!(matches!(first, Some("##" | "stage")));
            }
            ClassifiedLine::Ignored => {}
        }
    }

    /// Each line contributes to at most one list.
    #[test]
    fn every_line_lands_in_at_most_one_list(lines in prop::collection::vec(arb_line(), 0..60)) {
        let result = extract_lines(&lines);
        prop_assert!(result.len() <= lines.len());

        let mut extractor = Extractor::new();
        for line in &lines {
            let before = extractor.clone().finish().len();
            extractor.push_line(line);
            let after = extractor.clone().finish().len();
            prop_assert!(after - before <= 1, "line {:?} added {} entries", line, after - before);
        }
        prop_assert_eq!(extractor.finish(), result);
    }

    /// Items outside an open section are dropped; error lines are kept
    /// regardless of state.
    #[test]
    fn errors_count_is_independent_of_section_state(lines in prop::collection::vec(arb_line(), 0..60)) {
        let expected_errors = lines
            .iter()
            .filter(|l| matches!(classify_line(l), ClassifiedLine::Error(_)))
            .count();
        prop_assert_eq!(extract_lines(&lines).errors().len(), expected_errors);
    }

    /// Extraction is a pure function of its input.
    #[test]
    fn extraction_is_idempotent(lines in prop::collection::vec(arb_line(), 0..60)) {
        let once = extract_lines(&lines);
        let twice = extract_lines(&lines);
        prop_assert_eq!(&once, &twice);

        let joined = lines.join("\n");
        let from_reader = extract_reader(joined.as_bytes()).unwrap();
        // Lines containing embedded newlines split differently when read
        // back, so only compare when the input is line-clean.
        if lines.iter().all(|l| !l.contains('\n') && !l.contains('\r')) {
            prop_assert_eq!(from_reader, once);
        }
    }

    /// A close line always resets the extractor.
    #[test]
    fn close_resets_active_list(lines in prop::collection::vec(arb_line(), 0..30)) {
        let mut extractor = Extractor::new();
        for line in &lines {
            extractor.push_line(line);
        }
        extractor.push_line("## end");
        prop_assert_eq!(extractor.active(), ActiveList::None);
    }
}

// ──────────────────── comparison ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Equality is symmetric and reflexive.
    #[test]
    fn list_equality_symmetric(a in arb_list(), b in arb_list()) {
        prop_assert!(lists_equal(&a, &a));
        prop_assert_eq!(lists_equal(&a, &b), lists_equal(&b, &a));
        prop_assert_eq!(compare(&a, &b).is_equal(), a == b);
    }

    /// Rendering produces two lines per aligned index, and equal lists
    /// render without any mismatch markers.
    #[test]
    fn render_shape(a in arb_list(), b in arb_list()) {
        let rendered = render_diff(&a, &b, false);
        prop_assert_eq!(rendered.lines().count(), 2 * a.len().max(b.len()));

        let same = render_diff(&a, &a, false);
        prop_assert!(same.lines().all(|l| l.starts_with(MATCH_MARKER)));
    }

    /// Swapping the inputs swaps expected and actual on every mismatch row.
    #[test]
    fn render_is_asymmetric_in_markers(a in arb_list(), b in arb_list()) {
        let forward = render_diff(&a, &b, false);
        let backward = render_diff(&b, &a, false);
        let forward: Vec<&str> = forward.lines().collect();
        let backward: Vec<&str> = backward.lines().collect();

        for (pair_f, pair_b) in forward.chunks(2).zip(backward.chunks(2)) {
            if pair_f[0].starts_with(EXPECTED_MARKER) {
                prop_assert_eq!(&pair_f[0][EXPECTED_MARKER.len()..], &pair_b[1][ACTUAL_MARKER.len()..]);
                prop_assert_eq!(&pair_f[1][ACTUAL_MARKER.len()..], &pair_b[0][EXPECTED_MARKER.len()..]);
            } else {
                prop_assert_eq!(pair_f, pair_b);
            }
        }
        prop_assert_eq!(
            diff_rows(&a, &b).iter().filter(|r| r.is_match()).count(),
            diff_rows(&b, &a).iter().filter(|r| r.is_match()).count()
        );
    }
}
