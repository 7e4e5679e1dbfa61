//! # Helm IaC
//!
//! Evaluates Helm chart templates so Kubernetes manifests can be analyzed,
//! and maps every rendered line, parse tree node and YAML error back to the
//! template line it came from.
//!
//! ## Example
//!
//! ```rust,no_run
//! use helm_iac::helm::{add_line_comments, clean_source};
//!
//! let annotated = add_line_comments("kind: Pod\nname: {{ .Values.name }}");
//! // ... render `annotated` with the evaluator ...
//! let cleaned = clean_source("kind: Pod #1\nname: web #2");
//! assert_eq!(cleaned.source, "kind: Pod\nname: web");
//! # let _ = annotated;
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod helm;

// Re-export commonly used types and functions
pub use error::{HelmIacError, Result};
pub use helm::{HelmProcessor, ProcessedTemplate, ShiftTable};
use cli::Commands;
use config::HelmConfig;

/// The current version of the CLI tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a parsed command and return what it prints.
pub fn run_command(command: Commands, config: &HelmConfig) -> Result<String> {
    match command {
        Commands::Annotate { file } => handlers::handle_annotate(file),
        Commands::Clean { file, format } => handlers::handle_clean(file, format),
        Commands::Evaluate {
            template,
            chart,
            format,
        } => handlers::handle_evaluate(template, chart, format, config),
        Commands::Detect { files } => handlers::handle_detect(files),
    }
}
