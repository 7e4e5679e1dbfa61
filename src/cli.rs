use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "helm-iac")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Evaluate Helm templates and map the result back to template lines")]
#[command(long_about = "Renders Helm chart templates through an external evaluator, strips the line markers it relies on and reports every rendered line, parse tree node and YAML error against the original template source.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print a template with a line marker on every line
    Annotate {
        /// Template file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Strip line markers from evaluated output and print the shift table
    Clean {
        /// Evaluated file carrying line markers
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Evaluate a template against its chart
    Evaluate {
        /// Template file inside a chart
        #[arg(value_name = "TEMPLATE")]
        template: PathBuf,

        /// Chart root directory (defaults to the nearest directory with a Chart.yaml)
        #[arg(long, value_name = "DIR")]
        chart: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Report which files contain template directives
    Detect {
        /// Files to check
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    /// Initialize logging based on verbosity level
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_evaluate() {
        let cli = Cli::parse_from(["helm-iac", "-vv", "evaluate", "chart/templates/pod.yaml", "--format", "json"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Evaluate { template, chart, format } => {
                assert_eq!(template, PathBuf::from("chart/templates/pod.yaml"));
                assert!(chart.is_none());
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected evaluate"),
        }
    }

    #[test]
    fn test_detect_requires_files() {
        assert!(Cli::try_parse_from(["helm-iac", "detect"]).is_err());
    }
}
