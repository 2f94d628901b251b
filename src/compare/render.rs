//! Index-aligned diff rendering for two string lists.
//!
//! Rows are produced for every index up to the longer list; the shorter side
//! is padded with empty strings. The expected list is always the first
//! argument and always rendered on the `+` side.

#![allow(missing_docs)]

use std::fmt::Write as _;

use colored::Colorize;
use serde::Serialize;

/// Marker for rows present on both sides.
pub const MATCH_MARKER: &str = "  ";
/// Marker for the expected side of a mismatched row.
pub const EXPECTED_MARKER: &str = "+ ";
/// Marker for the actual side of a mismatched row.
pub const ACTUAL_MARKER: &str = "- ";

/// One aligned index of a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiffRow {
    Match { index: usize, text: String },
    Mismatch {
        index: usize,
        expected: String,
        actual: String,
    },
}

impl DiffRow {
    #[must_use]
    pub const fn is_match(&self) -> bool {
        matches!(self, Self::Match { .. })
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::Match { index, .. } | Self::Mismatch { index, .. } => *index,
        }
    }
}

/// Align two lists index by index.
#[must_use]
pub fn diff_rows<A, B>(expected: &[A], actual: &[B]) -> Vec<DiffRow>
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let len = expected.len().max(actual.len());
    (0..len)
        .map(|index| {
            let e = expected.get(index).map_or("", AsRef::as_ref);
            let a = actual.get(index).map_or("", AsRef::as_ref);
            if e == a {
                DiffRow::Match {
                    index,
                    text: e.to_string(),
                }
            } else {
                DiffRow::Mismatch {
                    index,
                    expected: e.to_string(),
                    actual: a.to_string(),
                }
            }
        })
        .collect()
}

/// Render rows as text, two lines per index (expected above actual).
///
/// With `color` set, mismatched lines additionally get a green (expected) or
/// red (actual) background, subject to the global `colored` override.
#[must_use]
pub fn render_rows(rows: &[DiffRow], color: bool) -> String {
    let mut out = String::new();
    for row in rows {
        match row {
            DiffRow::Match { text, .. } => {
                let _ = writeln!(out, "{MATCH_MARKER}{text}");
                let _ = writeln!(out, "{MATCH_MARKER}{text}");
            }
            DiffRow::Mismatch {
                expected, actual, ..
            } => {
                let e = format!("{EXPECTED_MARKER}{expected}");
                let a = format!("{ACTUAL_MARKER}{actual}");
                if color {
                    let _ = writeln!(out, "{}", e.black().on_green());
                    let _ = writeln!(out, "{}", a.white().on_red());
                } else {
                    let _ = writeln!(out, "{e}");
                    let _ = writeln!(out, "{a}");
                }
            }
        }
    }
    out
}

/// Convenience: align and render in one call.
#[must_use]
pub fn render_diff<A, B>(expected: &[A], actual: &[B], color: bool) -> String
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    render_rows(&diff_rows(expected, actual), color)
}
