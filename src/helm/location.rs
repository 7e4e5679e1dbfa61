//! Source positions: byte-offset locations and line/column text ranges.
//!
//! The template engine reports node positions as byte offsets into the
//! template source. Findings are reported as [`TextRange`]s with 1-based
//! lines and 0-based, character-counted line offsets.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LocationError;
use crate::helm::text::split_lines;

/// A point in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TextPointer {
    /// 1-based line number.
    pub line: usize,
    /// 0-based offset within the line, in characters.
    pub line_offset: usize,
}

impl TextPointer {
    pub fn new(line: usize, line_offset: usize) -> Self {
        Self { line, line_offset }
    }
}

impl fmt::Display for TextPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.line_offset)
    }
}

/// A range between two points in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start: TextPointer,
    pub end: TextPointer,
}

impl TextRange {
    pub fn new(start: TextPointer, end: TextPointer) -> Self {
        Self { start, end }
    }

    /// Shorthand for `TextRange::new(TextPointer::new(..), TextPointer::new(..))`.
    pub fn of(start_line: usize, start_offset: usize, end_line: usize, end_offset: usize) -> Self {
        Self::new(
            TextPointer::new(start_line, start_offset),
            TextPointer::new(end_line, end_offset),
        )
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}-{}]", self.start, self.end)
    }
}

/// Position of an AST node: a byte offset into the template source and a length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Location {
    pub position: usize,
    pub length: usize,
}

impl Location {
    pub fn new(position: usize, length: usize) -> Self {
        Self { position, length }
    }

    /// Build a location from the signed offsets carried on the wire.
    pub(crate) fn from_wire(position: i64, length: i64) -> Self {
        Self {
            position: usize::try_from(position).unwrap_or(0),
            length: usize::try_from(length).unwrap_or(0),
        }
    }

    /// Byte offset one past the end of this location.
    pub fn end(&self) -> usize {
        self.position + self.length
    }

    /// Convert this location into a line/column range of `source`.
    pub fn to_text_range(&self, source: &str) -> Result<TextRange, LocationError> {
        let end = self.end();
        if end > source.len() {
            return Err(LocationError::OutOfBounds {
                position: self.position,
                length: self.length,
                size: source.len(),
            });
        }
        Ok(TextRange::new(
            pointer_at(source, self.position),
            pointer_at(source, end),
        ))
    }

    /// Convert a line/column range of `text` into a byte-offset location.
    pub fn from_text_range(range: &TextRange, text: &str) -> Result<Self, LocationError> {
        let start = position_of(&range.start, text)?;
        let end = position_of(&range.end, text)?;
        Ok(Self::new(start, end.saturating_sub(start)))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Location{{position={}, length={}}}", self.position, self.length)
    }
}

/// Text pointer of byte `offset`; offsets inside a terminator count as line end.
fn pointer_at(source: &str, offset: usize) -> TextPointer {
    let mut line_start = 0;
    let mut line_number = 1;

    for line in split_lines(source) {
        let line_end = line_start + line.content.len() + line.terminator.len();
        if offset < line_end || line.terminator.is_empty() {
            let clamped = offset.min(line_start + line.content.len());
            let column = char_count(&source[line_start..], clamped - line_start);
            return TextPointer::new(line_number, column);
        }
        line_start = line_end;
        line_number += 1;
    }

    TextPointer::new(line_number, 0)
}

/// Count characters in the first `bytes` bytes of `text`, tolerating a cut
/// that lands inside a multi-byte character.
fn char_count(text: &str, bytes: usize) -> usize {
    text.char_indices().take_while(|(idx, _)| *idx < bytes).count()
}

fn position_of(pointer: &TextPointer, text: &str) -> Result<usize, LocationError> {
    let lines = split_lines(text);
    let preceding = pointer.line.saturating_sub(1);
    if preceding > lines.len() {
        return Err(LocationError::LineTooBig(pointer.line));
    }

    let counter: usize = lines[..preceding]
        .iter()
        .map(|l| l.content.len() + l.terminator.len())
        .sum();
    if counter == text.len() {
        return Err(LocationError::MissingLine(pointer.line));
    }

    let line = &lines[preceding];
    let full = &text[counter..counter + line.content.len() + line.terminator.len()];
    let available = full.chars().count();
    if pointer.line_offset > available {
        return Err(LocationError::OffsetTooBig {
            line: pointer.line,
            offset: pointer.line_offset,
        });
    }

    let byte_offset = full
        .char_indices()
        .nth(pointer.line_offset)
        .map(|(idx, _)| idx)
        .unwrap_or(full.len());
    Ok(counter + byte_offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "line1\nline 2 some text\nline 3 extra text";

    #[test]
    fn test_location_display() {
        assert_eq!(Location::new(10, 20).to_string(), "Location{position=10, length=20}");
    }

    #[test]
    fn test_from_text_range_first_line() {
        let location = Location::from_text_range(&TextRange::of(1, 0, 1, 5), TEXT).unwrap();
        assert_eq!(location, Location::new(0, 5));
    }

    #[test]
    fn test_from_text_range_second_line() {
        let location = Location::from_text_range(&TextRange::of(2, 0, 2, 11), TEXT).unwrap();
        assert_eq!(location, Location::new(6, 11));

        let location = Location::from_text_range(&TextRange::of(2, 3, 2, 11), TEXT).unwrap();
        assert_eq!(location, Location::new(9, 8));
    }

    #[test]
    fn test_from_text_range_last_line() {
        let location = Location::from_text_range(&TextRange::of(3, 1, 3, 17), TEXT).unwrap();
        assert_eq!(location, Location::new(24, 16));
    }

    #[test]
    fn test_from_text_range_multiple_lines() {
        let location = Location::from_text_range(&TextRange::of(1, 0, 2, 7), TEXT).unwrap();
        assert_eq!(location, Location::new(0, 13));

        let location = Location::from_text_range(&TextRange::of(1, 0, 3, 10), TEXT).unwrap();
        assert_eq!(location, Location::new(0, 33));
    }

    #[test]
    fn test_from_text_range_rejects_invalid_ranges() {
        for range in [
            TextRange::of(4, 0, 4, 1),
            TextRange::of(6, 0, 6, 1),
            TextRange::of(3, 18, 3, 20),
            TextRange::of(2, 0, 4, 0),
            TextRange::of(2, 0, 2, 100),
            TextRange::of(3, 0, 3, 18),
        ] {
            assert!(Location::from_text_range(&range, TEXT).is_err(), "{range}");
        }
        assert!(Location::from_text_range(&TextRange::of(2, 0, 2, 10), "").is_err());
    }

    #[test]
    fn test_line_errors_are_distinguished() {
        assert_eq!(
            Location::from_text_range(&TextRange::of(4, 0, 4, 1), TEXT),
            Err(LocationError::MissingLine(4))
        );
        assert_eq!(
            Location::from_text_range(&TextRange::of(6, 0, 6, 1), TEXT),
            Err(LocationError::LineTooBig(6))
        );
    }

    #[test]
    fn test_to_text_range() {
        let range = Location::new(9, 8).to_text_range(TEXT).unwrap();
        assert_eq!(range, TextRange::of(2, 3, 2, 11));

        let range = Location::new(0, 13).to_text_range(TEXT).unwrap();
        assert_eq!(range, TextRange::of(1, 0, 2, 7));
    }

    #[test]
    fn test_to_text_range_end_of_source() {
        let range = Location::new(24, 16).to_text_range(TEXT).unwrap();
        assert_eq!(range, TextRange::of(3, 1, 3, 17));
    }

    #[test]
    fn test_to_text_range_out_of_bounds() {
        assert!(Location::new(30, 20).to_text_range(TEXT).is_err());
    }

    #[test]
    fn test_to_text_range_counts_characters() {
        let source = "é: {{ .Values.x }}";
        let position = source.find("{{").unwrap();
        let range = Location::new(position, 2).to_text_range(source).unwrap();
        assert_eq!(range, TextRange::of(1, 3, 1, 5));
    }
}
