// Standard library imports
use std::fs;
use std::path::{Path, PathBuf};

// External crate imports
use tracing::debug;

// Internal imports
use crate::file::FileConfig;
use crate::settings::{ConfigOverrides, Settings, PASSWORD_ENV};
use osnap_core::error::{OsnapError, Result};

const LOCAL_CONFIG: &str = "osnap.yaml";

/// Finds and reads the optional `osnap.yaml`.
///
/// Lookup order:
/// 1. **Explicit path** from `--config`; it must exist.
/// 2. **Current directory:** `./osnap.yaml`.
/// 3. **User configuration:** `<config dir>/osnap/config.yaml`.
///
/// When nothing is found the built-in defaults apply.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    explicit: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self { explicit }
    }

    /// Loads the file layer, returning the path it came from.
    pub fn load(&self) -> Result<(FileConfig, Option<PathBuf>)> {
        if let Some(path) = &self.explicit {
            if !path.exists() {
                return Err(OsnapError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            debug!("Loading config from: {}", path.display());
            return Ok((self.load_file(path)?, Some(path.clone())));
        }

        for candidate in Self::search_paths() {
            if candidate.exists() {
                debug!("Loading config from: {}", candidate.display());
                return Ok((self.load_file(&candidate)?, Some(candidate)));
            }
        }

        debug!("No config file found, using defaults");
        Ok((FileConfig::default(), None))
    }

    /// Loads the file layer and resolves it against CLI overrides and the
    /// password environment variable.
    pub fn resolve(&self, overrides: ConfigOverrides) -> Result<Settings> {
        let (file, _) = self.load()?;
        let env_password = std::env::var(PASSWORD_ENV).ok().filter(|p| !p.is_empty());
        Settings::resolve(file, overrides, env_password)
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("osnap").join("config.yaml"));
        }
        paths
    }

    pub fn load_file(&self, path: &Path) -> Result<FileConfig> {
        let contents = fs::read_to_string(path).map_err(|e| {
            OsnapError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        // An empty file is a valid "use defaults" file.
        if contents.trim().is_empty() {
            return Ok(FileConfig::default());
        }

        serde_yaml_ng::from_str(&contents).map_err(|e| {
            OsnapError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_path_is_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.yaml");
        fs::write(&path, "cluster: prod\nkeep: 2\n").unwrap();

        let (config, source) = ConfigLoader::new(Some(path.clone())).load().unwrap();
        assert_eq!(config.cluster.as_deref(), Some("prod"));
        assert_eq!(config.keep, Some(2));
        assert_eq!(source, Some(path));
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = ConfigLoader::new(Some(dir.path().join("absent.yaml")))
            .load()
            .unwrap_err();
        assert!(err.is_setup());
        assert!(err.to_string().contains("absent.yaml"));
    }

    #[test]
    fn test_invalid_yaml_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "keep: [not, a, number]\n").unwrap();

        let err = ConfigLoader::new(Some(path)).load().unwrap_err();
        assert!(matches!(err, OsnapError::Config(_)));
    }

    #[test]
    fn test_empty_file_means_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.yaml");
        fs::write(&path, "\n").unwrap();

        let config = ConfigLoader::default().load_file(&path).unwrap();
        assert_eq!(config, FileConfig::default());
    }
}
