//! Stream extractor: folds classified lines into sections, items, and errors.
//!
//! The extractor has no idea where its lines come from. The same fold runs
//! over a worldfile on disk (the expected side) and over the captured stdout
//! of the program under test (the actual side).

#![allow(missing_docs)]

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, WfcError};
use crate::extract::classify::{ClassifiedLine, ListKind, classify_line};

/// The three independently compared lists, in check order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Errors,
    Sections,
    Items,
}

impl Category {
    /// Check order used by the orchestrator.
    pub const ALL: [Self; 3] = [Self::Errors, Self::Sections, Self::Items];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Errors => "errors",
            Self::Sections => "sections",
            Self::Items => "items",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which list item lines currently feed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveList {
    #[default]
    None,
    Sections,
    Items,
}

impl From<Option<ListKind>> for ActiveList {
    fn from(kind: Option<ListKind>) -> Self {
        match kind {
            Some(ListKind::Sections) => Self::Sections,
            Some(ListKind::Items) => Self::Items,
            None => Self::None,
        }
    }
}

/// Immutable result of one extraction pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    sections: Vec<String>,
    items: Vec<String>,
    errors: Vec<String>,
}

impl ExtractionResult {
    #[must_use]
    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    #[must_use]
    pub fn items(&self) -> &[String] {
        &self.items
    }

    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// The list backing a comparison category.
    #[must_use]
    pub fn list(&self, category: Category) -> &[String] {
        match category {
            Category::Errors => &self.errors,
            Category::Sections => &self.sections,
            Category::Items => &self.items,
        }
    }

    /// Total number of extracted lines across all three lists.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len() + self.items.len() + self.errors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume into `(sections, items, errors)`.
    #[must_use]
    pub fn into_parts(self) -> (Vec<String>, Vec<String>, Vec<String>) {
        (self.sections, self.items, self.errors)
    }
}

/// Incremental extractor. Feed lines in order, then call [`Extractor::finish`].
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    active: ActiveList,
    result: ExtractionResult,
}

impl Extractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently active list.
    #[must_use]
    pub const fn active(&self) -> ActiveList {
        self.active
    }

    /// Apply one line.
    pub fn push_line(&mut self, line: &str) {
        match classify_line(line) {
            ClassifiedLine::SectionOpen(kind) => self.active = ActiveList::from(kind),
            ClassifiedLine::SectionClose => self.active = ActiveList::None,
            ClassifiedLine::Item(text) => match self.active {
                ActiveList::Sections => self.result.sections.push(text),
                ActiveList::Items => self.result.items.push(text),
                ActiveList::None => {}
            },
            ClassifiedLine::Error(text) => self.result.errors.push(text),
            ClassifiedLine::Ignored => {}
        }
    }

    #[must_use]
    pub fn finish(self) -> ExtractionResult {
        self.result
    }
}

/// Extract from an in-memory sequence of lines.
pub fn extract_lines<I, S>(lines: I) -> ExtractionResult
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut extractor = Extractor::new();
    for line in lines {
        extractor.push_line(line.as_ref());
    }
    extractor.finish()
}

/// Extract from a buffered byte stream until end-of-stream.
///
/// Lines are decoded lossily: the program under test may print arbitrary
/// bytes between marker lines.
pub fn extract_reader<R: BufRead>(mut reader: R) -> io::Result<ExtractionResult> {
    let mut extractor = Extractor::new();
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        extractor.push_line(&String::from_utf8_lossy(&buf));
    }
    Ok(extractor.finish())
}

/// Extract the expected lists from a worldfile on disk.
pub fn extract_file(path: &Path) -> Result<ExtractionResult> {
    let file = File::open(path).map_err(|source| WfcError::file_access(path, source))?;
    extract_reader(BufReader::new(file)).map_err(|source| WfcError::file_access(path, source))
}
