//! Per-file pipeline: annotate, evaluate, clean.
//!
//! Failures stop at this boundary. A template that cannot be evaluated is
//! skipped with a warning and never aborts the analysis of other files.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::config::HelmConfig;
use crate::error::ProcessingError;
use crate::helm::annotate::{AnnotationOffsets, add_line_comments};
use crate::helm::ast::Tree;
use crate::helm::clean::clean_source;
use crate::helm::evaluator::{EvaluationRequest, HelmEvaluator, TemplateEvaluator, WorkerPool};
use crate::helm::location::TextRange;
use crate::helm::relocate::{MarkedError, RelocatedError, relocate};
use crate::helm::shift::ShiftTable;

const MISSING_NAMED_TEMPLATE: &str = "\" associated with template \"aggregatingTemplate\"";

/// An evaluated template ready for YAML parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedTemplate {
    /// Rendered source with line markers removed.
    pub source: String,
    /// Maps lines of `source` back to the template, with the template's line sizes.
    pub shift_table: ShiftTable,
    /// Parse tree of the unevaluated template. Node locations are offsets
    /// into the template source.
    pub ast: Option<Tree>,
}

impl ProcessedTemplate {
    /// True when the template rendered to nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.source.trim().is_empty()
    }

    /// Template range that produced `range` of the rendered source.
    pub fn original_range(&self, range: &TextRange) -> TextRange {
        self.shift_table.shift_range(range)
    }

    /// Parse every YAML document of the rendered source. Errors are moved
    /// back onto the template lines they came from.
    pub fn parse_documents(&self) -> Result<Vec<serde_yaml::Value>, RelocatedError> {
        let mut documents = Vec::new();
        for document in serde_yaml::Deserializer::from_str(&self.source) {
            let value = serde_yaml::Value::deserialize(document)
                .map_err(|e| relocate(MarkedError::from(&e), &self.shift_table))?;
            documents.push(value);
        }
        Ok(documents)
    }
}

/// Runs templates through the evaluator, or reports that it is unavailable.
pub struct HelmProcessor {
    evaluator: Option<Arc<dyn TemplateEvaluator>>,
    /// Why the evaluator could not be set up.
    failure: Option<String>,
}

impl HelmProcessor {
    pub fn new(evaluator: Arc<dyn TemplateEvaluator>) -> Self {
        Self {
            evaluator: Some(evaluator),
            failure: None,
        }
    }

    /// A processor without evaluator; every template is skipped.
    pub fn disabled() -> Self {
        Self {
            evaluator: None,
            failure: None,
        }
    }

    /// Set up the external evaluator. If that fails, Helm processing is
    /// disabled for the run instead of failing it.
    pub fn initialize(config: &HelmConfig, pool: Arc<WorkerPool>) -> Self {
        match HelmEvaluator::initialize(config, pool) {
            Ok(evaluator) => Self::new(Arc::new(evaluator)),
            Err(e) => {
                log::debug!(
                    "Failed to initialize Helm evaluator, analysis of Helm files will be disabled: {}",
                    e
                );
                Self {
                    evaluator: None,
                    failure: Some(e.to_string()),
                }
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.evaluator.is_some()
    }

    /// Evaluate the template `source` at `path` against its chart files.
    pub fn process(
        &self,
        path: &str,
        source: &str,
        dependencies: &BTreeMap<String, String>,
    ) -> Result<ProcessedTemplate, ProcessingError> {
        let Some(evaluator) = &self.evaluator else {
            return Err(match &self.failure {
                Some(reason) => ProcessingError::EvaluatorUnavailable {
                    path: path.to_string(),
                    reason: reason.clone(),
                },
                None => ProcessingError::Uninitialized {
                    path: path.to_string(),
                },
            });
        };
        validate_dependencies(path, dependencies)?;

        let request = EvaluationRequest {
            path: path.to_string(),
            content: add_line_comments(source),
            dependencies: dependencies.clone(),
        };
        let outcome = evaluator
            .evaluate(&request)
            .map_err(|source| ProcessingError::Evaluation {
                path: path.to_string(),
                source,
            })?;

        // the engine parsed the annotated text; move node locations onto the template
        let offsets = AnnotationOffsets::new(&request.content, source);
        let ast = outcome.ast.map(|mut tree| {
            tree.map_locations(&mut |location| offsets.to_source_location(location));
            tree
        });

        let cleaned = clean_source(&outcome.template);
        Ok(ProcessedTemplate {
            source: cleaned.source,
            shift_table: cleaned.shift_table.with_original_source(source),
            ast,
        })
    }

    /// Like [`process`](Self::process), but logs failures and returns `None`.
    pub fn process_or_skip(
        &self,
        path: &str,
        source: &str,
        dependencies: &BTreeMap<String, String>,
    ) -> Option<ProcessedTemplate> {
        match self.process(path, source, dependencies) {
            Ok(processed) => Some(processed),
            Err(e) => {
                let missing_named_template = e
                    .details()
                    .is_some_and(|details| details.contains(MISSING_NAMED_TEMPLATE));
                if missing_named_template {
                    log::debug!(
                        "Helm file {} requires a named template that is missing; skipping processing of Helm file",
                        path
                    );
                } else if matches!(
                    e,
                    ProcessingError::Uninitialized { .. } | ProcessingError::EvaluatorUnavailable { .. }
                ) {
                    log::debug!("Helm evaluator is not initialized, skipping processing of Helm file {}", path);
                } else {
                    log::warn!("{}", e);
                }
                None
            }
        }
    }
}

fn validate_dependencies(path: &str, dependencies: &BTreeMap<String, String>) -> Result<(), ProcessingError> {
    if !dependencies.contains_key("values.yaml") && !dependencies.contains_key("values.yml") {
        return Err(ProcessingError::MissingValuesFile {
            path: path.to_string(),
        });
    }
    if let Some((name, _)) = dependencies.iter().find(|(_, content)| content.trim().is_empty()) {
        return Err(ProcessingError::EmptyDependency {
            path: path.to_string(),
            dependency: name.clone(),
        });
    }
    Ok(())
}
