//! Configuration types for ktguard.
//!
//! The configuration document is TOML:
//!
//! ```toml
//! [analyzer]
//! exclude = ["**/build/**"]
//! preset = "standard"
//!
//! [rules.common]
//! domainName = "com.example"
//! testDirs = ["test"]
//!
//! [rules.LONG_LINE]
//! enabled = true
//! severity = "error"
//! lineLength = 100
//! ```
//!
//! Rule tables keep their document order. Every table name must be a
//! registered warning or [`COMMON`].

use crate::types::Severity;
use crate::warnings::{WarningRegistry, COMMON};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Top-level configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Analyzer configuration.
    pub analyzer: AnalyzerConfig,
    /// Per-warning configuration.
    pub rules: RulesConfig,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    analyzer: AnalyzerConfig,
    #[serde(default)]
    rules: toml::Table,
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file without validating rule names.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string without validating rule names.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a reserved option has a
    /// bad value.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;

        let mut entries = Vec::with_capacity(raw.rules.len());
        for (name, value) in raw.rules {
            let toml::Value::Table(table) = value else {
                return Err(ConfigError::InvalidValue {
                    rule: name,
                    key: String::new(),
                    message: "expected a table".to_string(),
                });
            };
            entries.push(RuleConfig::from_table(name, table)?);
        }

        Ok(Self {
            analyzer: raw.analyzer,
            rules: RulesConfig::new(entries),
        })
    }

    /// Checks every configured name against the warning catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownRule`] with the closest catalog name.
    pub fn validate(&self, registry: &WarningRegistry) -> Result<(), ConfigError> {
        self.rules.validate(registry)
    }

    /// Loads and validates configuration.
    ///
    /// When `path` is `None` or doesn't exist, `default` is used instead and
    /// a degraded-mode warning is logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read, parsed or validated.
    pub fn load(
        path: Option<&Path>,
        default: &str,
        registry: &WarningRegistry,
    ) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) if path.exists() => {
                debug!("Loading configuration from {}", path.display());
                Self::from_file(path)?
            }
            Some(path) => {
                warn!(
                    "Configuration file {} not found, using the built-in default configuration",
                    path.display()
                );
                Self::parse(default)?
            }
            None => {
                warn!("No configuration file, using the built-in default configuration");
                Self::parse(default)?
            }
        };
        config.validate(registry)?;
        Ok(config)
    }
}

/// Analyzer-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Glob patterns to exclude from analysis.
    #[serde(default = "default_excludes")]
    pub exclude: Vec<String>,

    /// Whether to respect .gitignore files.
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,

    /// Maximum number of files processed in parallel.
    #[serde(default)]
    pub parallelism: Option<usize>,

    /// Rule preset to run (e.g., "standard", "formatting", "metrics").
    #[serde(default)]
    pub preset: Option<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            exclude: default_excludes(),
            respect_gitignore: true,
            parallelism: None,
            preset: None,
        }
    }
}

fn default_excludes() -> Vec<String> {
    vec!["**/build/**".to_string(), "**/.gradle/**".to_string()]
}

fn default_true() -> bool {
    true
}

/// Ordered per-warning configuration entries.
#[derive(Debug, Clone, Default)]
pub struct RulesConfig {
    entries: Vec<RuleConfig>,
}

impl RulesConfig {
    /// Wraps entries, keeping their order.
    #[must_use]
    pub fn new(entries: Vec<RuleConfig>) -> Self {
        Self { entries }
    }

    /// Entries in document order.
    #[must_use]
    pub fn entries(&self) -> &[RuleConfig] {
        &self.entries
    }

    /// Entry for `name`, if configured.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RuleConfig> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Whether a warning is enabled. Unconfigured warnings are enabled.
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).map_or(true, |c| c.enabled)
    }

    /// Severity override for a warning.
    #[must_use]
    pub fn severity(&self, name: &str) -> Option<Severity> {
        self.get(name).and_then(|c| c.severity)
    }

    /// Cross-rule settings from the `common` entry.
    #[must_use]
    pub fn common(&self) -> CommonConfig {
        self.get(COMMON)
            .map_or_else(CommonConfig::default, CommonConfig::from_rule_config)
    }

    /// Checks every entry name against the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownRule`] for the first unknown name.
    pub fn validate(&self, registry: &WarningRegistry) -> Result<(), ConfigError> {
        for entry in &self.entries {
            if entry.name == COMMON || registry.contains(&entry.name) {
                continue;
            }
            let suggestion = registry.closest_name(&entry.name).map(String::from);
            return Err(ConfigError::UnknownRule {
                name: entry.name.clone(),
                help: suggestion.as_ref().map(|s| format!("did you mean `{s}`?")),
                suggestion,
            });
        }
        Ok(())
    }
}

/// Settings shared by all rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonConfig {
    /// Project package prefix.
    pub domain_name: Option<String>,
    /// Source set directory names.
    pub src_directories: Vec<String>,
    /// Directory names that mark test sources.
    pub test_dirs: Vec<String>,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            domain_name: None,
            src_directories: vec!["main".to_string()],
            test_dirs: vec!["test".to_string()],
        }
    }
}

impl CommonConfig {
    fn from_rule_config(config: &RuleConfig) -> Self {
        let defaults = Self::default();
        let or_default = |values: Vec<String>, default: Vec<String>| {
            if values.is_empty() {
                default
            } else {
                values
            }
        };
        Self {
            domain_name: config.options.get("domainName").and_then(|v| v.as_str()).map(String::from),
            src_directories: or_default(
                config.get_str_array("srcDirectories"),
                defaults.src_directories,
            ),
            test_dirs: or_default(config.get_str_array("testDirs"), defaults.test_dirs),
        }
    }
}

/// Configuration of one warning (or of [`COMMON`]).
#[derive(Debug, Clone)]
pub struct RuleConfig {
    /// Warning name.
    pub name: String,
    /// Whether the warning is reported.
    pub enabled: bool,
    /// Severity override.
    pub severity: Option<Severity>,
    /// Remaining options, including `autoCorrect`, `ignoreAnnotated` and
    /// `ignoreTests`.
    pub options: toml::Table,
}

impl RuleConfig {
    /// Creates an enabled entry with no options.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            severity: None,
            options: toml::Table::new(),
        }
    }

    /// Sets the enabled flag.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets an option.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    fn from_table(name: String, mut table: toml::Table) -> Result<Self, ConfigError> {
        let invalid = |key: &str, message: String| ConfigError::InvalidValue {
            rule: name.clone(),
            key: key.to_string(),
            message,
        };

        let enabled = match table.remove("enabled") {
            None => true,
            Some(toml::Value::Boolean(b)) => b,
            Some(other) => return Err(invalid("enabled", format!("expected a boolean, found {other}"))),
        };
        let severity = match table.remove("severity") {
            None => None,
            Some(toml::Value::String(s)) => Some(s.parse::<Severity>().map_err(|e| invalid("severity", e))?),
            Some(other) => return Err(invalid("severity", format!("expected a string, found {other}"))),
        };
        for key in ["autoCorrect", "ignoreTests"] {
            if let Some(value) = table.get(key) {
                if !value.is_bool() {
                    return Err(invalid(key, format!("expected a boolean, found {value}")));
                }
            }
        }
        if let Some(value) = table.get("ignoreAnnotated") {
            let ok = value
                .as_array()
                .is_some_and(|arr| arr.iter().all(toml::Value::is_str));
            if !ok {
                return Err(invalid(
                    "ignoreAnnotated",
                    format!("expected an array of strings, found {value}"),
                ));
            }
        }

        Ok(Self {
            name,
            enabled,
            severity,
            options: table,
        })
    }

    /// Whether fixes for this warning may be applied. Defaults to `true`.
    #[must_use]
    pub fn auto_correct(&self) -> bool {
        self.get_bool("autoCorrect", true)
    }

    /// Annotation names whose declarations are exempt from this warning.
    #[must_use]
    pub fn ignore_annotated(&self) -> Vec<String> {
        self.get_str_array("ignoreAnnotated")
    }

    /// Whether test sources are exempt from this warning.
    #[must_use]
    pub fn ignore_tests(&self) -> bool {
        self.get_bool("ignoreTests", false)
    }

    /// Gets an option value as a specific type.
    #[must_use]
    pub fn get_option<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.options
            .get(key)
            .and_then(|v| v.clone().try_into().ok())
    }

    /// Gets a boolean option with a default value.
    #[must_use]
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.options.get(key) {
            None => default,
            Some(toml::Value::Boolean(b)) => *b,
            Some(toml::Value::String(s)) if s.parse::<bool>().is_ok() => s == "true",
            Some(other) => {
                warn!("{}: option `{key}` = {other} is not a boolean, using {default}", self.name);
                default
            }
        }
    }

    /// Gets an integer option with a default value.
    ///
    /// Numeric strings are accepted. Anything else logs a warning and
    /// yields `default`.
    #[must_use]
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.options.get(key) {
            None => default,
            Some(toml::Value::Integer(i)) => *i,
            Some(toml::Value::String(s)) => s.trim().parse().unwrap_or_else(|_| {
                warn!("{}: option `{key}` = {s:?} is not a number, using {default}", self.name);
                default
            }),
            Some(other) => {
                warn!("{}: option `{key}` = {other} is not a number, using {default}", self.name);
                default
            }
        }
    }

    /// Gets a non-negative integer option with a default value.
    #[must_use]
    pub fn get_usize(&self, key: &str, default: usize) -> usize {
        let fallback = i64::try_from(default).unwrap_or(i64::MAX);
        usize::try_from(self.get_int(key, fallback)).unwrap_or_else(|_| {
            warn!("{}: option `{key}` must not be negative, using {default}", self.name);
            default
        })
    }

    /// Gets a string option with a default value.
    #[must_use]
    pub fn get_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.options
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(default)
    }

    /// Gets a string array option. A comma separated string is accepted too.
    #[must_use]
    pub fn get_str_array(&self, key: &str) -> Vec<String> {
        match self.options.get(key) {
            Some(toml::Value::Array(arr)) => arr
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect(),
            Some(toml::Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {path}: {source}")]
    #[diagnostic(code(ktguard::config::io))]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    #[diagnostic(code(ktguard::config::parse))]
    Parse {
        /// Parse error message.
        message: String,
    },

    /// A rule table names no known warning.
    #[error("Unknown rule name `{name}` in configuration")]
    #[diagnostic(code(ktguard::config::unknown_rule))]
    UnknownRule {
        /// The configured name.
        name: String,
        /// Closest catalog name.
        suggestion: Option<String>,
        /// Rendered suggestion.
        #[help]
        help: Option<String>,
    },

    /// A reserved option has a bad value.
    #[error("Invalid value for `{key}` in rule `{rule}`: {message}")]
    #[diagnostic(code(ktguard::config::invalid_value))]
    InvalidValue {
        /// Rule table name.
        rule: String,
        /// Option key.
        key: String,
        /// What is wrong.
        message: String,
    },
}
