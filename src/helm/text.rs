//! Line splitting that keeps every line's original terminator.
//!
//! Helm templates come from any platform, so `\r\n`, `\n`, `\r` and the
//! Unicode separators `U+2028`/`U+2029` all end a line.

/// Characters that terminate a line on their own.
pub const LINE_TERMINATORS: [char; 4] = ['\n', '\r', '\u{2028}', '\u{2029}'];

/// A single line of text and the terminator that followed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// Line content without the terminator.
    pub content: &'a str,
    /// The terminator (empty for the final line).
    pub terminator: &'a str,
}

/// Split text into lines, preserving terminators.
///
/// The segment after the last terminator is always returned, even when empty,
/// so `"a\n"` yields two lines and `""` yields one.
pub fn split_lines(text: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !LINE_TERMINATORS.contains(&c) {
            continue;
        }
        let mut end = idx + c.len_utf8();
        if c == '\r' {
            if let Some(&(next_idx, '\n')) = chars.peek() {
                end = next_idx + 1;
                chars.next();
            }
        }
        lines.push(Line {
            content: &text[start..idx],
            terminator: &text[idx..end],
        });
        start = end;
    }

    lines.push(Line {
        content: &text[start..],
        terminator: "",
    });
    lines
}

/// Remove every trailing line terminator from the end of `text`.
pub fn trim_trailing_newlines(text: &str) -> &str {
    text.trim_end_matches(|c| LINE_TERMINATORS.contains(&c))
}
