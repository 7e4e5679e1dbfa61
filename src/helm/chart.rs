//! Locating a template's chart and reading the chart files it may depend on.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::ProcessingError;

/// Chart files handed to the evaluator alongside a template.
pub const INCLUDED_EXTENSIONS: [&str; 6] = ["yaml", "yml", "tpl", "txt", "toml", "properties"];

pub const CHART_FILE: &str = "Chart.yaml";

/// Nearest ancestor of `template` (the file's own directory included) that
/// contains a `Chart.yaml`, without leaving `base_dir`.
pub fn find_chart_root(template: &Path, base_dir: Option<&Path>) -> Option<PathBuf> {
    let mut current = template.parent();
    while let Some(dir) = current {
        if let Some(base) = base_dir {
            if !dir.starts_with(base) {
                return None;
            }
        }
        if dir.join(CHART_FILE).is_file() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

fn has_included_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| INCLUDED_EXTENSIONS.contains(&ext))
}

/// Read every chart file under `chart_root` except `template` itself, keyed
/// by its path relative to the chart root with `/` separators.
pub fn collect_dependencies(
    chart_root: &Path,
    template: &Path,
) -> Result<BTreeMap<String, String>, ProcessingError> {
    let mut files = BTreeMap::new();
    let entries = WalkDir::new(chart_root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| has_included_extension(e.path()))
        .filter(|e| e.path() != template);

    for entry in entries {
        let Ok(relative) = entry.path().strip_prefix(chart_root) else {
            continue;
        };
        let name = relative.to_string_lossy().replace('\\', "/");
        let content = fs::read_to_string(entry.path()).map_err(|e| ProcessingError::UnreadableDependency {
            path: template.display().to_string(),
            dependency: name.clone(),
            message: e.to_string(),
        })?;
        files.insert(name, content);
    }

    log::debug!(
        "Collected {} chart files from {} for {}",
        files.len(),
        chart_root.display(),
        template.display()
    );
    Ok(files)
}

/// True for files that are chart inputs rather than templates to evaluate:
/// the chart's own `values.yaml`/`values.yml` and `Chart.yaml`, and any `*.tpl`.
pub fn is_chart_input_file(path: &Path, chart_root: Option<&Path>) -> bool {
    if path.extension().and_then(|e| e.to_str()) == Some("tpl") {
        return true;
    }
    let Some(root) = chart_root else {
        return false;
    };
    if path.parent() != Some(root) {
        return false;
    }
    matches!(
        path.file_name().and_then(|n| n.to_str()),
        Some("values.yaml" | "values.yml" | CHART_FILE)
    )
}
