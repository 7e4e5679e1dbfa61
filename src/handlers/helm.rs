//! Command handlers for the Helm template pipeline.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::config::HelmConfig;
use crate::error::{ProcessingError, Result};
use crate::helm::ast::Tree;
use crate::helm::chart::{collect_dependencies, find_chart_root, is_chart_input_file};
use crate::helm::shift::LineShiftEntry;
use crate::helm::text::split_lines;
use crate::helm::{
    HelmProcessor, Location, ProcessedTemplate, TextRange, WorkerPool, add_line_comments, clean_source,
    has_helm_content,
};

#[derive(Serialize)]
struct CleanReport<'a> {
    source: &'a str,
    shifts: Vec<LineShiftEntry>,
}

#[derive(Serialize)]
struct EvaluationReport<'a> {
    template: &'a str,
    chart: String,
    source: &'a str,
    shifts: Vec<LineShiftEntry>,
    lines: Vec<LineOrigin>,
    documents: usize,
    ast: Option<&'a Tree>,
}

/// Where a rendered line came from in the template.
#[derive(Debug, Serialize)]
struct LineOrigin {
    line: usize,
    range: TextRange,
    /// Byte offsets of `range` in the template, when it lies inside it.
    location: Option<Location>,
}

/// Print the template with a line marker on every line.
pub fn handle_annotate(file: PathBuf) -> Result<String> {
    let source = fs::read_to_string(&file)?;
    Ok(add_line_comments(&source))
}

/// Strip markers from an evaluated file.
pub fn handle_clean(file: PathBuf, format: OutputFormat) -> Result<String> {
    let evaluated = fs::read_to_string(&file)?;
    let cleaned = clean_source(&evaluated);
    let shifts: Vec<LineShiftEntry> = cleaned.shift_table.entries().copied().collect();

    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&CleanReport {
            source: &cleaned.source,
            shifts,
        })?),
        OutputFormat::Text => {
            let mut output = cleaned.source;
            output.push_str("\n\n# shifted line -> template lines\n");
            for entry in shifts {
                output.push_str(&format!(
                    "# {} -> {}:{}\n",
                    entry.shifted_line, entry.original_start, entry.original_end
                ));
            }
            Ok(output)
        }
    }
}

/// Evaluate a template against its chart and parse the rendered YAML.
pub fn handle_evaluate(
    template: PathBuf,
    chart: Option<PathBuf>,
    format: OutputFormat,
    config: &HelmConfig,
) -> Result<String> {
    let source = fs::read_to_string(&template)?;
    let chart_root = match chart {
        Some(dir) => dir,
        None => find_chart_root(&template, None).ok_or_else(|| ProcessingError::NoChart {
            path: template.display().to_string(),
        })?,
    };
    let dependencies = collect_dependencies(&chart_root, &template)?;
    let name = template_name(&chart_root, &template);
    log::info!("Evaluating {} with {} chart files", name, dependencies.len());

    let pool = Arc::new(WorkerPool::new(config.pool_size));
    pool.start()?;
    let processor = HelmProcessor::initialize(config, Arc::clone(&pool));
    let processed = processor.process(&name, &source, &dependencies);
    pool.stop();
    let processed = processed?;

    render_evaluation(&name, &chart_root, &source, &processed, format)
}

fn render_evaluation(
    name: &str,
    chart_root: &Path,
    template_source: &str,
    processed: &ProcessedTemplate,
    format: OutputFormat,
) -> Result<String> {
    let documents = if processed.is_blank() {
        log::info!("{} rendered to an empty document", name);
        Vec::new()
    } else {
        processed.parse_documents()?
    };
    let lines = line_origins(processed, template_source);

    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&EvaluationReport {
            template: name,
            chart: chart_root.display().to_string(),
            source: &processed.source,
            shifts: processed.shift_table.entries().copied().collect(),
            lines,
            documents: documents.len(),
            ast: processed.ast.as_ref(),
        })?),
        OutputFormat::Text => {
            let mut output = String::new();
            for (index, line) in split_lines(&processed.source).iter().enumerate() {
                let origin = lines
                    .iter()
                    .find(|o| o.line == index + 1)
                    .map(|o| o.range.to_string())
                    .unwrap_or_default();
                output.push_str(&format!("{:>16} | {}\n", origin, line.content));
            }
            output.push_str(&format!("\n{} document(s)", documents.len()));
            Ok(output)
        }
    }
}

/// Template ranges of the rendered lines that carry a shift entry.
fn line_origins(processed: &ProcessedTemplate, template_source: &str) -> Vec<LineOrigin> {
    split_lines(&processed.source)
        .iter()
        .enumerate()
        .filter_map(|(index, content)| {
            let line = index + 1;
            processed.shift_table.entry(line)?;
            let rendered = TextRange::of(line, 0, line, content.content.chars().count());
            let range = processed.original_range(&rendered);
            Some(LineOrigin {
                line,
                range,
                location: Location::from_text_range(&range, template_source).ok(),
            })
        })
        .collect()
}

/// Classify files as templates to evaluate, chart inputs or plain YAML.
pub fn handle_detect(files: Vec<PathBuf>) -> Result<String> {
    let mut lines = Vec::new();
    for file in files {
        let chart_root = find_chart_root(&file, None);
        let status = if is_chart_input_file(&file, chart_root.as_deref()) {
            "input"
        } else if has_helm_content(&fs::read_to_string(&file)?) {
            "helm"
        } else {
            "plain"
        };
        lines.push(format!("{}\t{}", status, file.display()));
    }
    Ok(lines.join("\n"))
}

/// Template path as the engine names it: relative to the chart's parent,
/// so it starts with the chart directory name.
fn template_name(chart_root: &Path, template: &Path) -> String {
    let base = chart_root.parent().unwrap_or(chart_root);
    template
        .strip_prefix(base)
        .unwrap_or(template)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_template_name() {
        let root = Path::new("/work/charts/web");
        assert_eq!(template_name(root, &root.join("templates/pod.yaml")), "web/templates/pod.yaml");
        assert_eq!(template_name(root, Path::new("/elsewhere/pod.yaml")), "/elsewhere/pod.yaml");
    }

    #[test]
    fn test_handle_annotate() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("pod.yaml");
        fs::write(&file, "kind: Pod\nname: x").unwrap();
        assert_eq!(handle_annotate(file).unwrap(), "kind: Pod #1\nname: x #2");
    }

    #[test]
    fn test_handle_clean_json() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("rendered.yaml");
        fs::write(&file, "kind: Pod #1\n\nname: x #3").unwrap();
        let output = handle_clean(file, OutputFormat::Json).unwrap();
        let report: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(report["source"], "kind: Pod\nname: x");
        assert_eq!(report["shifts"][1]["shifted_line"], 2);
        assert_eq!(report["shifts"][1]["original_start"], 3);
    }

    #[test]
    fn test_handle_clean_text() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("rendered.yaml");
        fs::write(&file, "a: 1 #2:4").unwrap();
        let output = handle_clean(file, OutputFormat::Text).unwrap();
        assert!(output.starts_with("a: 1\n"));
        assert!(output.contains("# 1 -> 2:4"));
    }

    #[test]
    fn test_handle_detect() {
        let dir = TempDir::new().unwrap();
        let helm = dir.path().join("pod.yaml");
        let plain = dir.path().join("plain.yaml");
        fs::write(&helm, "name: {{ .Values.name }}").unwrap();
        fs::write(&plain, "name: x # {{ not a directive }}").unwrap();
        let helpers = dir.path().join("_helpers.tpl");
        fs::write(&helpers, "{{- define \"name\" }}x{{ end }}").unwrap();
        let output = handle_detect(vec![helm, plain, helpers]).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert!(lines[0].starts_with("helm\t"));
        assert!(lines[1].starts_with("plain\t"));
        assert!(lines[2].starts_with("input\t"));
    }

    #[test]
    fn test_evaluate_without_chart() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("pod.yaml");
        fs::write(&file, "kind: Pod").unwrap();
        let err = handle_evaluate(file, None, OutputFormat::Text, &HelmConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::HelmIacError::Processing(ProcessingError::NoChart { .. })
        ));
        assert!(err.to_string().ends_with("No Chart.yaml found in any parent directory"));
    }

    fn processed(rendered: &str, template: &str) -> ProcessedTemplate {
        let cleaned = clean_source(rendered);
        ProcessedTemplate {
            source: cleaned.source,
            shift_table: cleaned.shift_table.with_original_source(template),
            ast: None,
        }
    }

    #[test]
    fn test_line_origins() {
        let template = "a: 1\n# note\nb: {{\n  .Values.b }}";
        let processed = processed("a: 1 #1\nb: xyz #3:4", template);

        let origins = line_origins(&processed, template);
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0].range, TextRange::of(1, 0, 1, 4));
        assert_eq!(origins[0].location, Some(Location::new(0, 4)));
        assert_eq!(origins[1].range, TextRange::of(3, 0, 4, 14));
        let location = origins[1].location.unwrap();
        assert_eq!(&template[location.position..location.end()], "b: {{\n  .Values.b }}");
    }

    #[test]
    fn test_render_evaluation_text() {
        let template = "a: 1\nb: {{ .Values.b }}";
        let processed = processed("a: 1 #1\nb: 2 #2", template);
        let output = render_evaluation("c/t.yaml", Path::new("c"), template, &processed, OutputFormat::Text).unwrap();
        assert!(output.contains("[1:0-1:4] | a: 1\n"));
        assert!(output.contains("[2:0-2:18] | b: 2\n"));
        assert!(output.ends_with("1 document(s)"));
    }

    #[test]
    fn test_render_blank_evaluation() {
        let processed = processed(" #1", "{{- if false }}{{ end }}");
        let output = render_evaluation("c/t.yaml", Path::new("c"), "", &processed, OutputFormat::Json).unwrap();
        let report: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(report["documents"], 0);
        assert_eq!(report["lines"].as_array().map(Vec::len), Some(0));
    }
}
