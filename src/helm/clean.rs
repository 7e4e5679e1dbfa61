//! Post-evaluation pass: strip line-number markers and build the shift table.
//!
//! Every evaluated line that still carries a marker yields one shift entry.
//! Lines that are blank once the marker is gone were produced by deleted
//! template constructs (`{{- if false }}` and friends) and are dropped.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::helm::shift::ShiftTable;
use crate::helm::text::{split_lines, trim_trailing_newlines};

/// Trailing marker group at the end of a line. Only the first marker of a
/// group is significant; the others come from lines merged by evaluation.
static MARKER_GROUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"#(\d+)(?::(\d+))?(?:\s?#\d+(?::\d+)?)*$").expect("valid marker regex")
});

/// Evaluated source with markers removed, plus the shifts that were recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedSource {
    pub source: String,
    pub shift_table: ShiftTable,
}

/// A marker found at the end of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Marker {
    start: usize,
    end: usize,
}

/// Split `line` into its content and the first trailing marker, if any.
fn strip_marker(line: &str) -> (&str, Option<Marker>) {
    let Some(caps) = MARKER_GROUP.captures(line) else {
        return (line, None);
    };
    let (Some(whole), Some(start)) = (caps.get(0), caps.get(1)) else {
        return (line, None);
    };
    let Ok(start) = start.as_str().parse::<usize>() else {
        return (line, None);
    };
    let end = caps
        .get(2)
        .and_then(|m| m.as_str().parse::<usize>().ok())
        .unwrap_or(start);

    let mut content = &line[..whole.start()];
    if let Some(last) = content.chars().last().filter(|c| c.is_whitespace()) {
        content = &content[..content.len() - last.len_utf8()];
    }
    (content, Some(Marker { start, end }))
}

/// Remove line-number markers from evaluated template output.
///
/// Shifted line numbers are 1-based and count only the lines that survive.
pub fn clean_source(evaluated: &str) -> CleanedSource {
    let mut shift_table = ShiftTable::new();
    let mut out = String::with_capacity(evaluated.len());
    let mut kept = 0;

    for line in split_lines(evaluated) {
        let (content, marker) = strip_marker(line.content);
        if content.trim().is_empty() {
            continue;
        }
        kept += 1;
        if let Some(marker) = marker {
            shift_table.add_shifted_line(kept, marker.start, marker.end);
        }
        out.push_str(content);
        out.push_str(line.terminator);
    }

    let source = trim_trailing_newlines(&out).to_string();
    log::trace!("Cleaned evaluated source: {} lines kept, {} shifts", kept, shift_table.len());
    CleanedSource {
        source,
        shift_table,
    }
}
