//! Pre-evaluation pass: tag every template line with its source line number.
//!
//! Evaluation deletes, merges and duplicates lines, and the template engine
//! reports no mapping back to the source. Each line therefore gets a trailing
//! YAML comment naming the source line(s) it came from; the comments survive
//! rendering and are stripped again by [`crate::helm::clean`].
//!
//! A balanced line gets ` #N`. An action spanning several lines gets a single
//! ` #start:end` marker on the line that closes it and nothing on the lines
//! in between.

use crate::helm::location::Location;
use crate::helm::text::split_lines;

const OPEN_DELIMITER: &str = "{{";
const CLOSE_DELIMITER: &str = "}}";

/// Number of `{{` minus number of `}}` on a single line.
///
/// Occurrences are counted without overlap, so `{{{{}}` has one unmatched
/// opening delimiter.
pub fn unmatched_opening_braces(line: &str) -> i64 {
    let opening = line.matches(OPEN_DELIMITER).count() as i64;
    let closing = line.matches(CLOSE_DELIMITER).count() as i64;
    opening - closing
}

/// State carried from one line to the next while annotating.
#[derive(Debug, Clone, Copy, Default)]
struct Scan {
    /// First line of a multi-line action that has not been closed yet.
    pending_start: Option<usize>,
}

/// What to append to a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    None,
    Line(usize),
    Range(usize, usize),
}

impl Scan {
    fn step(self, line_number: usize, content: &str) -> (Self, Marker) {
        let balance = unmatched_opening_braces(content);
        match (self.pending_start, balance) {
            (None, b) if b > 0 => (
                Self {
                    pending_start: Some(line_number),
                },
                Marker::None,
            ),
            (None, _) => (self, Marker::Line(line_number)),
            (Some(start), b) if b < 0 => (
                Self {
                    pending_start: None,
                },
                Marker::Range(start, line_number),
            ),
            (Some(_), _) => (self, Marker::None),
        }
    }
}

fn push_marker(out: &mut String, marker: Marker) {
    match marker {
        Marker::None => {}
        Marker::Line(line) => {
            out.push_str(" #");
            out.push_str(&line.to_string());
        }
        Marker::Range(start, end) => {
            out.push_str(" #");
            out.push_str(&start.to_string());
            out.push(':');
            out.push_str(&end.to_string());
        }
    }
}

/// Append a line-number marker to every line of `source`.
///
/// Line terminators are preserved as they are. When the source ends inside an
/// unclosed multi-line action, the last line gets a range ending one line past
/// the end of the file.
pub fn add_line_comments(source: &str) -> String {
    let lines = split_lines(source);
    let mut out = String::with_capacity(source.len() + lines.len() * 5);

    let last = lines.len();
    let scan = lines
        .iter()
        .enumerate()
        .fold(Scan::default(), |scan, (idx, line)| {
            let line_number = idx + 1;
            let (next, marker) = scan.step(line_number, line.content);
            out.push_str(line.content);
            push_marker(&mut out, marker);
            if line_number == last {
                if let Some(start) = next.pending_start {
                    push_marker(&mut out, Marker::Range(start, last + 1));
                }
            }
            out.push_str(line.terminator);
            next
        });

    log::trace!(
        "Annotated {} lines (unterminated action: {})",
        last,
        scan.pending_start.is_some()
    );
    out
}

/// Maps byte offsets in an annotated template back onto the template.
///
/// The engine parses the annotated text, so the positions it reports include
/// the markers of every preceding line. An offset that falls on a marker maps
/// to the end of that line's content.
#[derive(Debug, Clone)]
pub struct AnnotationOffsets {
    lines: Vec<LineOffsets>,
    source_len: usize,
}

#[derive(Debug, Clone, Copy)]
struct LineOffsets {
    annotated_start: usize,
    source_start: usize,
    content_len: usize,
    marker_len: usize,
}

impl AnnotationOffsets {
    /// `annotated` must be `add_line_comments(source)`.
    pub fn new(annotated: &str, source: &str) -> Self {
        let mut lines = Vec::new();
        let (mut annotated_start, mut source_start) = (0, 0);
        for (marked, plain) in split_lines(annotated).iter().zip(split_lines(source).iter()) {
            lines.push(LineOffsets {
                annotated_start,
                source_start,
                content_len: plain.content.len(),
                marker_len: marked.content.len().saturating_sub(plain.content.len()),
            });
            annotated_start += marked.content.len() + marked.terminator.len();
            source_start += plain.content.len() + plain.terminator.len();
        }
        Self {
            lines,
            source_len: source.len(),
        }
    }

    /// Template offset of byte `offset` of the annotated text.
    pub fn to_source(&self, offset: usize) -> usize {
        let idx = self
            .lines
            .partition_point(|line| line.annotated_start <= offset)
            .saturating_sub(1);
        let Some(line) = self.lines.get(idx) else {
            return offset.min(self.source_len);
        };
        let within = offset.saturating_sub(line.annotated_start);
        let mapped = if within <= line.content_len {
            within
        } else if within < line.content_len + line.marker_len {
            line.content_len
        } else {
            within - line.marker_len
        };
        (line.source_start + mapped).min(self.source_len)
    }

    pub fn to_source_location(&self, location: Location) -> Location {
        let start = self.to_source(location.position);
        let end = self.to_source(location.end());
        Location::new(start, end.saturating_sub(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(lines: &[&str]) -> String {
        lines.join("\n")
    }

    #[test]
    fn test_single_lines() {
        assert_eq!(
            add_line_comments(&code(&["line1", "line2", "line3"])),
            code(&["line1 #1", "line2 #2", "line3 #3"])
        );
        assert_eq!(add_line_comments("line1"), "line1 #1");
    }

    #[test]
    fn test_empty_file_and_empty_lines() {
        assert_eq!(add_line_comments(""), " #1");
        assert_eq!(
            add_line_comments(&code(&["line1", "", "line3"])),
            code(&["line1 #1", " #2", "line3 #3"])
        );
    }

    #[test]
    fn test_keeps_line_terminators() {
        for terminator in ["\n", "\r", "\r\n", "\u{2028}", "\u{2029}"] {
            let source = ["line1", "", "", "line4"].join(terminator);
            let expected = ["line1 #1", " #2", " #3", "line4 #4"].join(terminator);
            assert_eq!(add_line_comments(&source), expected);
        }
    }

    #[test]
    fn test_already_commented_line() {
        assert_eq!(add_line_comments("line1 # some comment"), "line1 # some comment #1");
    }

    #[test]
    fn test_chart_with_loops() {
        let source = code(&[
            "metadata:",
            "{{ if .Values.service.annotations}}",
            "  annotations:",
            "    {{- range $key, $value := .Values.service.annotations }}",
            "    {{ $key }}: {{ $value | quote }}",
            "    {{- end }}",
            "{{- end }}",
        ]);
        let expected = code(&[
            "metadata: #1",
            "{{ if .Values.service.annotations}} #2",
            "  annotations: #3",
            "    {{- range $key, $value := .Values.service.annotations }} #4",
            "    {{ $key }}: {{ $value | quote }} #5",
            "    {{- end }} #6",
            "{{- end }} #7",
        ]);
        assert_eq!(add_line_comments(&source), expected);
    }

    #[test]
    fn test_multiline_action_gets_range() {
        let source = code(&[
            "data:",
            "cfg: |-",
            "{{- if or",
            "(eq \"abc\" .Values.foo)",
            "(eq \"def\" .Values.bar)",
            "}}",
            "if",
            "{{- else }}",
            "else",
            "{{- end }}",
        ]);
        let expected = code(&[
            "data: #1",
            "cfg: |- #2",
            "{{- if or",
            "(eq \"abc\" .Values.foo)",
            "(eq \"def\" .Values.bar)",
            "}} #3:6",
            "if #7",
            "{{- else }} #8",
            "else #9",
            "{{- end }} #10",
        ]);
        assert_eq!(add_line_comments(&source), expected);
    }

    #[test]
    fn test_consecutive_multiline_comments() {
        let source = code(&["{{- /*", "comment1", "*/}} {{- /*", "comment2", "*/}}"]);
        let expected = code(&["{{- /*", "comment1", "*/}} {{- /*", "comment2", "*/}} #1:5"]);
        assert_eq!(add_line_comments(&source), expected);

        let source = code(&[
            "{{- /* comment1",
            "*/}} {{- /* comment2 */}} {{- /* comment3",
            "*/}}",
        ]);
        let expected = code(&[
            "{{- /* comment1",
            "*/}} {{- /* comment2 */}} {{- /* comment3",
            "*/}} #1:3",
        ]);
        assert_eq!(add_line_comments(&source), expected);
    }

    #[test]
    fn test_balanced_loop_body_on_one_line() {
        let source = code(&[
            "{{- range $key, $value := .Values.annotations }}",
            "  {{ $key }}: {{ $value | quote }} {{- end }}{{- end }}",
        ]);
        let expected = code(&[
            "{{- range $key, $value := .Values.annotations }} #1",
            "  {{ $key }}: {{ $value | quote }} {{- end }}{{- end }} #2",
        ]);
        assert_eq!(add_line_comments(&source), expected);
    }

    #[test]
    fn test_single_line_action_is_balanced() {
        assert_eq!(unmatched_opening_braces("{{ $x := 1 }}"), 0);
        assert_eq!(add_line_comments("{{ $x := 1 }}"), "{{ $x := 1 }} #1");
    }

    #[test]
    fn test_unterminated_action_closes_past_the_end() {
        let source = code(&["a: 1", "{{- if", ".Values.x"]);
        let expected = code(&["a: 1 #1", "{{- if", ".Values.x #2:4"]);
        assert_eq!(add_line_comments(&source), expected);
    }

    #[test]
    fn test_stray_closing_braces_get_line_marker() {
        assert_eq!(add_line_comments("}}"), "}} #1");
    }

    #[test]
    fn test_unmatched_braces() {
        assert_eq!(unmatched_opening_braces("{{"), 1);
        assert_eq!(unmatched_opening_braces("{{{{"), 2);
        assert_eq!(unmatched_opening_braces("{{{{}}"), 1);
        assert_eq!(unmatched_opening_braces("{{{{}}}}"), 0);
        assert_eq!(unmatched_opening_braces("{{{{}}}}}}"), -1);
    }

    #[test]
    fn test_offsets_skip_preceding_markers() {
        let source = "kind: ConfigMap\ndata:\n  header: {{ .Values.header }}";
        let annotated = add_line_comments(source);
        let offsets = AnnotationOffsets::new(&annotated, source);

        let annotated_pos = annotated.find(".Values").unwrap();
        let source_pos = source.find(".Values").unwrap();
        assert_eq!((annotated_pos, source_pos), (41, 35));
        assert_eq!(offsets.to_source(annotated_pos), source_pos);

        let location = offsets.to_source_location(Location::new(annotated_pos, 14));
        assert_eq!(&source[location.position..location.end()], ".Values.header");
    }

    #[test]
    fn test_offsets_on_markers_and_terminators() {
        let source = "a: 1\r\nb: 2\n";
        let annotated = add_line_comments(source);
        assert_eq!(annotated, "a: 1 #1\r\nb: 2 #2\n #3");
        let offsets = AnnotationOffsets::new(&annotated, source);

        // inside ` #1`
        assert_eq!(offsets.to_source(5), 4);
        // `\n` of the first terminator
        assert_eq!(offsets.to_source(8), 5);
        // start of the second line
        assert_eq!(offsets.to_source(9), 6);
        // whole annotated text maps to whole source
        assert_eq!(
            offsets.to_source_location(Location::new(0, annotated.len())),
            Location::new(0, source.len())
        );
    }

    #[test]
    fn test_offsets_in_multiline_action() {
        let source = "x: {{\n  .Values.x }}\ny: 1";
        let annotated = add_line_comments(source);
        assert_eq!(annotated, "x: {{\n  .Values.x }} #1:2\ny: 1 #3");
        let offsets = AnnotationOffsets::new(&annotated, source);
        let pos = annotated.find("y: 1").unwrap();
        assert_eq!(offsets.to_source(pos), source.find("y: 1").unwrap());
    }
}
