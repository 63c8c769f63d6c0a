//! Configuration lookup.
//!
//! Candidates, first match wins:
//!
//! 1. `--config` (or `$KTGUARD_CONFIG`); when missing, the built-in default
//!    applies with a warning
//! 2. `ktguard.toml` or `.ktguard.toml` in the project directory
//! 3. `config.toml` in `$KTGUARD_CONFIG_DIR`, else in `~/.ktguard/`
//! 4. the built-in default configuration

use ktguard_core::{Config, ConfigError, WarningRegistry};
use ktguard_rules::DEFAULT_CONFIG;
use std::path::{Path, PathBuf};

/// Where the configuration comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given on the command line.
    Explicit(PathBuf),
    /// Found in the project directory.
    Project(PathBuf),
    /// Found in the user's config directory.
    Global(PathBuf),
    /// Nothing found; the embedded default applies.
    Default,
}

impl ConfigSource {
    /// Returns the resolved path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::Global(p) => Some(p),
            Self::Default => None,
        }
    }

    /// Reads and validates the configuration against `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file can't be read or parsed, or names
    /// an unknown warning. A missing explicit file is not an error.
    pub fn load(&self, registry: &WarningRegistry) -> Result<Config, ConfigError> {
        match self {
            Self::Default => Config::load(None, DEFAULT_CONFIG, registry),
            Self::Global(path) => {
                tracing::info!("Using global config: {}", path.display());
                load_file(path, registry)
            }
            Self::Explicit(path) => Config::load(Some(path), DEFAULT_CONFIG, registry),
            Self::Project(path) => load_file(path, registry),
        }
    }
}

fn load_file(path: &Path, registry: &WarningRegistry) -> Result<Config, ConfigError> {
    let config = Config::from_file(path)?;
    config.validate(registry)?;
    Ok(config)
}

const PROJECT_CONFIG_NAMES: &[&str] = &["ktguard.toml", ".ktguard.toml"];

const GLOBAL_CONFIG_NAME: &str = "config.toml";

/// Resolves the configuration source for `project_dir`.
#[must_use]
pub fn resolve(project_dir: &Path, explicit: Option<&Path>) -> ConfigSource {
    resolve_in(project_dir, explicit, global_config_dir())
}

fn resolve_in(project_dir: &Path, explicit: Option<&Path>, global_dir: Option<PathBuf>) -> ConfigSource {
    if let Some(path) = explicit {
        return ConfigSource::Explicit(path.to_path_buf());
    }

    if let Some(found) = PROJECT_CONFIG_NAMES
        .iter()
        .map(|name| project_dir.join(name))
        .find(|candidate| candidate.exists())
    {
        tracing::debug!("Found project config: {}", found.display());
        return ConfigSource::Project(found);
    }

    match global_dir.map(|dir| dir.join(GLOBAL_CONFIG_NAME)) {
        Some(candidate) if candidate.exists() => {
            tracing::debug!("Found global config: {}", candidate.display());
            ConfigSource::Global(candidate)
        }
        _ => ConfigSource::Default,
    }
}

/// `$KTGUARD_CONFIG_DIR`, else `~/.ktguard/`.
#[must_use]
pub fn global_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("KTGUARD_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }
    home::home_dir().map(|h| h.join(".ktguard"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ktguard_rules::catalog;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn explicit_wins_and_falls_back_to_default_when_missing() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("ktguard.toml"), "[rules.LONG_LINE]\nlineLength = 80\n").unwrap();

        let explicit = project.path().join("missing.toml");
        let source = resolve_in(project.path(), Some(&explicit), None);
        assert_eq!(source, ConfigSource::Explicit(explicit.clone()));

        let config = source.load(&catalog().unwrap()).unwrap();
        let line_length = config.rules.get("LONG_LINE").unwrap().get_int("lineLength", 0);
        assert_eq!(line_length, 120);
    }

    #[test]
    fn existing_explicit_config_is_validated() {
        let project = TempDir::new().unwrap();
        let path = project.path().join("custom.toml");
        fs::write(&path, "[rules.LONG_LINE]\nlineLength = 80\n").unwrap();
        let config = ConfigSource::Explicit(path.clone()).load(&catalog().unwrap()).unwrap();
        assert_eq!(config.rules.get("LONG_LINE").unwrap().get_int("lineLength", 0), 80);

        fs::write(&path, "[rules.LONG_LINES]\n").unwrap();
        assert!(matches!(
            ConfigSource::Explicit(path).load(&catalog().unwrap()),
            Err(ConfigError::UnknownRule { .. })
        ));
    }

    #[test]
    fn plain_name_preferred_over_dot_name() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join(".ktguard.toml"), "").unwrap();
        assert_eq!(
            resolve_in(project.path(), None, None),
            ConfigSource::Project(project.path().join(".ktguard.toml"))
        );

        fs::write(project.path().join("ktguard.toml"), "").unwrap();
        assert_eq!(
            resolve_in(project.path(), None, None),
            ConfigSource::Project(project.path().join("ktguard.toml"))
        );
    }

    #[test]
    fn global_used_without_project_config() {
        let project = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();
        assert_eq!(
            resolve_in(project.path(), None, Some(global.path().to_path_buf())),
            ConfigSource::Default
        );

        fs::write(global.path().join("config.toml"), "").unwrap();
        assert_eq!(
            resolve_in(project.path(), None, Some(global.path().to_path_buf())),
            ConfigSource::Global(global.path().join("config.toml"))
        );
    }

    #[test]
    fn default_source_loads_embedded_config() {
        let config = ConfigSource::Default.load(&catalog().unwrap()).unwrap();
        assert!(config.rules.get("LONG_LINE").is_some());
        assert!(ConfigSource::Default.path().is_none());
    }

    #[test]
    fn unknown_rule_in_project_config_is_rejected() {
        let project = TempDir::new().unwrap();
        let path = project.path().join("ktguard.toml");
        fs::write(&path, "[rules.LONG_LINES]\nlineLength = 100\n").unwrap();

        let err = ConfigSource::Project(path).load(&catalog().unwrap()).unwrap_err();
        match err {
            ConfigError::UnknownRule { suggestion, .. } => {
                assert_eq!(suggestion.as_deref(), Some("LONG_LINE"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
