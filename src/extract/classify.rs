//! Line classifier for the worldfile dump grammar.
//!
//! Recognized shapes, after whitespace tokenization:
//!
//! ```text
//! ## begin <sections|items|...>   section open
//! ## end ...                      section close
//! ## stage error <code> <msg...>  embedded error
//! ## <text...>                    item (only kept while a list is active)
//! stage error <code> <msg...>     plain error
//! ```
//!
//! Everything else is ignored, so program output may be freely mixed with
//! unrelated logging.

use serde::{Deserialize, Serialize};

/// Leading token of every dump marker line.
pub const MARKER: &str = "##";

/// The two lists a `## begin` block can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    /// `## begin sections`
    Sections,
    /// `## begin items`
    Items,
}

impl ListKind {
    /// Map the name following `## begin` to a list, if it is one we track.
    #[must_use]
    pub fn from_block_name(name: &str) -> Option<Self> {
        match name {
            "sections" => Some(Self::Sections),
            "items" => Some(Self::Items),
            _ => None,
        }
    }
}

/// Result of classifying one line in isolation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedLine {
    /// `## begin <name>`; `None` for blocks we do not track.
    SectionOpen(Option<ListKind>),
    /// `## end ...`
    SectionClose,
    /// `## <text>`: an entry for whichever list is active.
    Item(String),
    /// Error message with its `stage error <code>` prefix stripped.
    Error(String),
    /// Blank or unrecognized.
    Ignored,
}

/// Classify a single line.
///
/// Item and error text is re-joined with single spaces, which is the only
/// normalization applied anywhere in the pipeline.
#[must_use]
pub fn classify_line(line: &str) -> ClassifiedLine {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    classify_tokens(&tokens)
}

fn classify_tokens(tokens: &[&str]) -> ClassifiedLine {
    match tokens {
        [MARKER, "begin", rest @ ..] => ClassifiedLine::SectionOpen(
            rest.first()
                .and_then(|name| ListKind::from_block_name(name)),
        ),
        [MARKER, "end", ..] => ClassifiedLine::SectionClose,
        [MARKER, "stage", "error", ..] => ClassifiedLine::Error(join_from(tokens, 4)),
        [MARKER, _, ..] => ClassifiedLine::Item(join_from(tokens, 1)),
        ["stage", "error", ..] => ClassifiedLine::Error(join_from(tokens, 3)),
        _ => ClassifiedLine::Ignored,
    }
}

fn join_from(tokens: &[&str], start: usize) -> String {
    tokens.get(start..).unwrap_or_default().join(" ")
}
