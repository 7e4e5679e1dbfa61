//! Deciding whether a YAML file needs template evaluation at all.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::helm::text::split_lines;

/// `{{` that sits in a comment or a quoted string, or a CI `${{ var }}`.
static DIRECTIVE_IN_COMMENT_OR_STRING: Lazy<Regex> = Lazy::new(|| {
    let patterns = [
        r"#.*\{\{",
        r"'[^']*\{\{[^']*'",
        r#""[^"]*\{\{[^"]*""#,
        r"\$\{\{[\w\s]+\}\}",
    ];
    Regex::new(&format!("({})", patterns.join("|"))).expect("valid directive regex")
});

/// True when `line` has a template directive outside comments and strings.
pub fn has_helm_content_in_line(line: &str) -> bool {
    line.contains("{{") && !DIRECTIVE_IN_COMMENT_OR_STRING.is_match(line)
}

/// True when any line of `text` has a template directive.
pub fn has_helm_content(text: &str) -> bool {
    split_lines(text)
        .iter()
        .any(|line| has_helm_content_in_line(line.content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_yaml() {
        assert!(!has_helm_content("apiVersion: v1\nkind: Pod"));
        assert!(!has_helm_content(""));
    }

    #[test]
    fn test_directive() {
        assert!(has_helm_content("apiVersion: v1\nname: {{ .Values.name }}"));
        assert!(has_helm_content_in_line("{{- if .Values.enabled }}"));
    }

    #[test]
    fn test_directive_in_comment_or_string() {
        assert!(!has_helm_content_in_line("# name: {{ .Values.name }}"));
        assert!(!has_helm_content_in_line("name: '{{ .Values.name }}'"));
        assert!(!has_helm_content_in_line("name: \"{{ .Values.name }}\""));
    }

    #[test]
    fn test_ci_variable() {
        assert!(!has_helm_content_in_line("image: ${{ CF_BRANCH }}"));
    }
}
