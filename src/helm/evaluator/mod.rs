//! Client for the external Helm template evaluator.
//!
//! The evaluator is a separate executable that renders a single template
//! against its chart files and also returns the template's parse tree. Each
//! call spawns a fresh process, writes the request to its stdin and decodes
//! the response from its stdout.

pub mod binary;
pub mod platform;
pub mod pool;
pub mod process;
pub mod protocol;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::HelmConfig;
use crate::error::EvaluationError;
use crate::helm::ast::Tree;

pub use binary::extract_executable;
pub use platform::Platform;
pub use pool::{DEFAULT_POOL_SIZE, WorkerPool};
pub use process::{ProcessOutput, ProcessRunner, SubprocessRunner};

/// Base name of the evaluator executable; the platform suffix is appended.
pub const HELM_EVALUATOR_EXECUTABLE: &str = "helm-iac-evaluator";

/// A template to render, with the chart files it may read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationRequest {
    /// Path of the template, as the engine should name it.
    pub path: String,
    pub content: String,
    /// Chart files by path relative to the chart root, e.g. `values.yaml`.
    pub dependencies: BTreeMap<String, String>,
}

impl EvaluationRequest {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            dependencies: BTreeMap::new(),
        }
    }

    pub fn with_dependency(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), content.into());
        self
    }
}

/// Rendered template and its parse tree.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOutcome {
    pub template: String,
    pub ast: Option<Tree>,
}

/// Renders Helm templates.
pub trait TemplateEvaluator: Send + Sync {
    fn evaluate(&self, request: &EvaluationRequest) -> Result<EvaluationOutcome, EvaluationError>;
}

/// [`TemplateEvaluator`] backed by the external evaluator executable.
pub struct HelmEvaluator {
    runner: Box<dyn ProcessRunner>,
}

impl HelmEvaluator {
    pub fn new(runner: impl ProcessRunner + 'static) -> Self {
        Self {
            runner: Box::new(runner),
        }
    }

    /// Extract the evaluator for the current platform and prepare to run it
    /// on `pool`.
    pub fn initialize(config: &HelmConfig, pool: Arc<WorkerPool>) -> Result<Self, EvaluationError> {
        let platform = Platform::current()?;
        let file_name = platform.executable_name(&config.executable_name);
        let bundle_dir = config.resolve_bundle_dir()?;
        let working_dir = config.resolve_working_dir();
        let executable = extract_executable(&bundle_dir, &file_name, &working_dir)?;
        log::debug!("Using evaluator {} for {}", executable.display(), platform);
        Ok(Self::new(SubprocessRunner::new(executable, config.timeout(), pool)))
    }
}

impl TemplateEvaluator for HelmEvaluator {
    fn evaluate(&self, request: &EvaluationRequest) -> Result<EvaluationOutcome, EvaluationError> {
        let input = protocol::encode_request(request)?;
        let output = self.runner.run(&input)?;
        let name = self.runner.name();

        if output.stdout.is_empty() {
            let message = match output.exit_code {
                Some(0) => format!("Empty evaluation result returned from {name}"),
                Some(code) => format!(
                    "{name} exited with non-zero exit code: {code}, possible serialization failure"
                ),
                None => format!("{name} was terminated without output"),
            };
            return Err(EvaluationError::ProcessFailure(message));
        }

        let response = protocol::decode_response(&output.stdout)?;
        if !response.error.is_empty() {
            return Err(EvaluationError::RenderError(response.error));
        }
        Ok(EvaluationOutcome {
            template: response.template,
            ast: Tree::from_wire(response.ast),
        })
    }
}
