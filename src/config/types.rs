use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::helm::evaluator::{DEFAULT_POOL_SIZE, HELM_EVALUATOR_EXECUTABLE};

/// Default evaluator timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Settings of the Helm evaluation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelmConfig {
    /// Wall-clock limit of a single evaluator run.
    pub timeout_ms: u64,

    /// Threads shared by all evaluator runs for their auxiliary tasks.
    pub pool_size: usize,

    /// Where the evaluator executable is extracted to.
    pub working_dir: Option<PathBuf>,

    /// Directory holding the platform-specific evaluator executables.
    /// Defaults to the directory of the running binary.
    pub bundle_dir: Option<PathBuf>,

    /// Base name of the evaluator executable.
    pub executable_name: String,
}

impl Default for HelmConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            pool_size: DEFAULT_POOL_SIZE,
            working_dir: None,
            bundle_dir: None,
            executable_name: HELM_EVALUATOR_EXECUTABLE.to_string(),
        }
    }
}

impl HelmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_bundle_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bundle_dir = Some(dir.into());
        self
    }

    pub fn with_executable_name(mut self, name: impl Into<String>) -> Self {
        self.executable_name = name.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn resolve_working_dir(&self) -> PathBuf {
        self.working_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("helm-iac"))
    }

    pub fn resolve_bundle_dir(&self) -> std::io::Result<PathBuf> {
        if let Some(dir) = &self.bundle_dir {
            return Ok(dir.clone());
        }
        let exe = std::env::current_exe()?;
        exe.parent().map(PathBuf::from).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no parent directory for {}", exe.display()),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HelmConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.pool_size, 2);
        assert_eq!(config.executable_name, "helm-iac-evaluator");
        assert_eq!(config.resolve_working_dir(), std::env::temp_dir().join("helm-iac"));
    }

    #[test]
    fn test_builder() {
        let config = HelmConfig::new()
            .with_timeout(Duration::from_millis(250))
            .with_pool_size(4)
            .with_working_dir("/tmp/work")
            .with_bundle_dir("/opt/bundle")
            .with_executable_name("evaluator");
        assert_eq!(config.timeout_ms, 250);
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.resolve_working_dir(), PathBuf::from("/tmp/work"));
        assert_eq!(config.resolve_bundle_dir().unwrap(), PathBuf::from("/opt/bundle"));
        assert_eq!(config.executable_name, "evaluator");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: HelmConfig = toml::from_str("timeout_ms = 1000").unwrap();
        assert_eq!(config.timeout_ms, 1000);
        assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
    }
}
