pub mod types;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

pub use types::HelmConfig;

const CONFIG_FILE_NAME: &str = ".helm-iac.toml";

/// Get the global config file path (~/.helm-iac.toml)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(CONFIG_FILE_NAME))
}

/// Get the local config file path (project/.helm-iac.toml)
pub fn local_config_path(project_path: &Path) -> PathBuf {
    project_path.join(CONFIG_FILE_NAME)
}

/// Read and parse one configuration file.
pub fn load_config_file(path: &Path) -> Result<HelmConfig> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let config = toml::from_str(&content).map_err(|e| ConfigError::ParsingFailed(e.to_string()))?;
    Ok(config)
}

/// Load configuration from file or use defaults
/// Checks local config first, then global config
pub fn load_config(project_path: Option<&Path>) -> Result<HelmConfig> {
    if let Some(path) = project_path {
        let local = local_config_path(path);
        if local.exists() {
            log::debug!("Loading configuration from {}", local.display());
            return load_config_file(&local);
        }
    }

    if let Some(global) = global_config_path() {
        if global.exists() {
            log::debug!("Loading configuration from {}", global.display());
            return load_config_file(&global);
        }
    }

    Ok(HelmConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HelmIacError;
    use tempfile::TempDir;

    #[test]
    fn test_local_config() {
        let dir = TempDir::new().unwrap();
        fs::write(local_config_path(dir.path()), "pool_size = 3\nexecutable_name = \"eval\"\n").unwrap();
        let config = load_config(Some(dir.path())).unwrap();
        assert_eq!(config.pool_size, 3);
        assert_eq!(config.executable_name, "eval");
    }

    #[test]
    fn test_malformed_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "pool_size = \"many\"").unwrap();
        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, HelmIacError::Config(ConfigError::ParsingFailed(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_config_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, HelmIacError::Config(ConfigError::Unreadable { .. })));
    }
}
