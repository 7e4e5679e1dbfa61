//! Helm template evaluation with line-accurate mapping back to the template.
//!
//! Kubernetes checks run on rendered manifests, but findings must point at
//! the template the user wrote. Rendering can delete, merge and duplicate
//! lines, so every template line is tagged before rendering and the tags are
//! read back afterwards.
//!
//! # Pipeline
//!
//! | Step | Module | Output |
//! |------|--------|--------|
//! | Tag lines | [`annotate`] | template with ` #N` / ` #start:end` markers |
//! | Render | [`evaluator`] | rendered text and parse tree |
//! | Strip tags | [`clean`] | clean YAML and a [`ShiftTable`] |
//! | Parse | [`processor`] | YAML documents, errors moved via [`relocate`] |
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use helm_iac::config::HelmConfig;
//! use helm_iac::helm::{HelmProcessor, WorkerPool};
//!
//! let pool = Arc::new(WorkerPool::new(2));
//! pool.start()?;
//! let processor = HelmProcessor::initialize(&HelmConfig::default(), Arc::clone(&pool));
//! if let Some(processed) = processor.process_or_skip("templates/pod.yaml", &source, &files) {
//!     let documents = processed.parse_documents()?;
//! }
//! pool.stop();
//! ```

pub mod annotate;
pub mod ast;
pub mod chart;
pub mod clean;
pub mod detect;
pub mod evaluator;
pub mod location;
pub mod processor;
pub mod relocate;
pub mod shift;
pub mod text;

// Re-export main types and functions
pub use annotate::add_line_comments;
pub use ast::{Node, NodeType, Tree};
pub use clean::{CleanedSource, clean_source};
pub use detect::has_helm_content;
pub use evaluator::{
    EvaluationOutcome, EvaluationRequest, HelmEvaluator, TemplateEvaluator, WorkerPool,
};
pub use location::{Location, TextPointer, TextRange};
pub use processor::{HelmProcessor, ProcessedTemplate};
pub use relocate::{Mark, MarkedError, RelocatedError, ShiftedMarkedError, relocate};
pub use shift::{LineShiftEntry, ShiftTable};
