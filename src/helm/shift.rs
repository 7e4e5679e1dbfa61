//! Mapping from cleaned (evaluated) line numbers back to template source lines.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::helm::location::{TextPointer, TextRange};
use crate::helm::text::split_lines;

/// One shifted output line and the source lines it was rendered from.
///
/// Several entries may point at the same source range (a loop body rendered
/// many times) and one entry may cover several source lines (a multi-line
/// action collapsed into one output line).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineShiftEntry {
    /// 1-based line in the cleaned output.
    pub shifted_line: usize,
    /// First 1-based source line.
    pub original_start: usize,
    /// Last 1-based source line, never before `original_start`.
    pub original_end: usize,
}

/// Shift entries of a single evaluated file plus the sizes of its source lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShiftTable {
    entries: BTreeMap<usize, LineShiftEntry>,
    original_line_sizes: Vec<usize>,
}

impl ShiftTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `shifted_line` was rendered from source lines
    /// `original_start..=original_end`. A later call for the same shifted
    /// line replaces the earlier one.
    pub fn add_shifted_line(&mut self, shifted_line: usize, original_start: usize, original_end: usize) {
        let entry = LineShiftEntry {
            shifted_line,
            original_start: original_start.min(original_end),
            original_end: original_start.max(original_end),
        };
        self.entries.insert(shifted_line, entry);
    }

    /// Record the line sizes of the whole template source.
    pub fn with_original_source(mut self, source: &str) -> Self {
        self.original_line_sizes = split_lines(source)
            .iter()
            .map(|l| l.content.chars().count())
            .collect();
        self
    }

    pub fn entry(&self, shifted_line: usize) -> Option<&LineShiftEntry> {
        self.entries.get(&shifted_line)
    }

    /// All entries ordered by shifted line.
    pub fn entries(&self) -> impl Iterator<Item = &LineShiftEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn line_size(&self, line: usize) -> usize {
        line.checked_sub(1)
            .and_then(|idx| self.original_line_sizes.get(idx))
            .copied()
            .unwrap_or(0)
    }

    /// Translate a range in cleaned coordinates to the template source.
    ///
    /// A shifted start snaps to the beginning of its first source line and a
    /// shifted end snaps to the end of its last source line. Ends without a
    /// shift entry are left as they are.
    pub fn shift_range(&self, range: &TextRange) -> TextRange {
        let start = match self.entry(range.start.line) {
            Some(entry) => TextPointer::new(entry.original_start, 0),
            None => range.start,
        };
        let end = match self.entry(range.end.line) {
            Some(entry) => TextPointer::new(entry.original_end, self.line_size(entry.original_end)),
            None => range.end,
        };
        TextRange::new(start, end)
    }
}
