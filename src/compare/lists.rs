//! Exact positional list comparison.

/// Outcome of comparing an expected list against an actual one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOutcome<'a, S> {
    /// Same length, same strings at every index.
    Equal,
    /// Carries both inputs untouched so the caller can render a diff.
    NotEqual {
        /// Reference side, rendered with the `+` marker.
        expected: &'a [S],
        /// Side produced by the program under test.
        actual: &'a [S],
    },
}

impl<S> ComparisonOutcome<'_, S> {
    /// Whether the comparison passed.
    #[must_use]
    pub const fn is_equal(&self) -> bool {
        matches!(self, Self::Equal)
    }
}

/// True iff both lists have the same length and identical strings at every
/// index. No trimming or case folding is applied.
#[must_use]
pub fn lists_equal<A, B>(expected: &[A], actual: &[B]) -> bool
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    if expected.len() != actual.len() {
        return false;
    }
    expected
        .iter()
        .zip(actual)
        .all(|(a, b)| a.as_ref() == b.as_ref())
}

/// Compare two lists, keeping references to both on mismatch.
#[must_use]
pub fn compare<'a, S: AsRef<str>>(expected: &'a [S], actual: &'a [S]) -> ComparisonOutcome<'a, S> {
    if lists_equal(expected, actual) {
        ComparisonOutcome::Equal
    } else {
        ComparisonOutcome::NotEqual { expected, actual }
    }
}
