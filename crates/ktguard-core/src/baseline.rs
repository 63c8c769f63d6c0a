//! Baseline of accepted violations.
//!
//! A baseline records, per file, the `{rule, message}` pairs of violations
//! that were present when it was generated. Offsets are not stored since
//! they shift between runs; entries are matched by value. Repeated pairs are
//! kept, and each entry accepts at most one violation.
//!
//! ```json
//! {
//!   "version": 1,
//!   "files": {
//!     "src/main/kotlin/App.kt": [
//!       { "rule": "LONG_LINE", "message": "[LONG_LINE] this line is too long: ..." }
//!     ]
//!   }
//! }
//! ```

use crate::listener::ProcessorListener;
use crate::types::Violation;
use crate::utils::paths::relative_slash_path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{error, info};

/// Current file format version.
pub const BASELINE_VERSION: u32 = 1;

/// Baseline loading and saving errors.
#[derive(Debug, Error)]
pub enum BaselineError {
    /// The file exists but couldn't be read or written.
    #[error("Failed to access baseline {path}: {source}")]
    Io {
        /// Baseline path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The file exists but isn't a valid baseline.
    #[error("Baseline {path} is corrupt: {message}")]
    Corrupt {
        /// Baseline path.
        path: PathBuf,
        /// What is wrong.
        message: String,
    },
}

/// One accepted violation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BaselineEntry {
    /// Warning name.
    pub rule: String,
    /// Full message.
    pub message: String,
}

impl BaselineEntry {
    fn matches(&self, violation: &Violation) -> bool {
        self.rule == violation.rule && self.message == violation.message
    }
}

impl From<&Violation> for BaselineEntry {
    fn from(v: &Violation) -> Self {
        Self {
            rule: v.rule.clone(),
            message: v.message.clone(),
        }
    }
}

/// Accepted violations per file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    version: u32,
    #[serde(default)]
    files: BTreeMap<String, Vec<BaselineEntry>>,
}

impl Default for Baseline {
    fn default() -> Self {
        Self {
            version: BASELINE_VERSION,
            files: BTreeMap::new(),
        }
    }
}

/// Key used for a relative file path: `/` separated.
#[must_use]
pub fn file_key(file: &Path) -> String {
    relative_slash_path(file, Path::new(""))
}

impl Baseline {
    /// Creates an empty baseline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a baseline.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`BaselineError::Corrupt`] for malformed content and
    /// [`BaselineError::Io`] if the file can't be read.
    pub fn try_to_load(path: &Path) -> Result<Option<Self>, BaselineError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(BaselineError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let baseline: Self = serde_json::from_str(&content).map_err(|e| BaselineError::Corrupt {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if baseline.version != BASELINE_VERSION {
            return Err(BaselineError::Corrupt {
                path: path.to_path_buf(),
                message: format!("unsupported version {}", baseline.version),
            });
        }
        Ok(Some(baseline))
    }

    /// Writes the baseline as pretty-printed JSON, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`BaselineError::Io`] if writing fails.
    pub fn save(&self, path: &Path) -> Result<(), BaselineError> {
        let io_error = |source| BaselineError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| BaselineError::Corrupt {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content + "\n").map_err(io_error)
    }

    /// Records one occurrence for the file. Equal entries accumulate.
    pub fn insert(&mut self, file: &Path, entry: BaselineEntry) {
        self.files.entry(file_key(file)).or_default().push(entry);
    }

    /// Drops violations recorded for `file`; returns the rest and the number
    /// dropped.
    ///
    /// Each entry is consumed by the first violation it matches, so a file
    /// with two equal entries hides two equal violations, not three.
    #[must_use]
    pub fn filter(&self, file: &Path, violations: Vec<Violation>) -> (Vec<Violation>, usize) {
        let Some(entries) = self.files.get(&file_key(file)) else {
            return (violations, 0);
        };
        let mut consumed = vec![false; entries.len()];
        let mut kept = Vec::with_capacity(violations.len());
        for violation in violations {
            let slot = entries
                .iter()
                .zip(consumed.iter_mut())
                .find(|(entry, used)| !**used && entry.matches(&violation));
            match slot {
                Some((_, used)) => *used = true,
                None => kept.push(violation),
            }
        }
        let dropped = consumed.iter().filter(|&&used| used).count();
        (kept, dropped)
    }

    /// Number of files with entries.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Total number of entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    /// Creates a listener that records a run into a new baseline at `path`.
    #[must_use]
    pub fn generator(path: impl Into<PathBuf>) -> BaselineGenerator {
        BaselineGenerator::new(path)
    }
}

/// Listener that collects uncorrected violations and writes them as a
/// baseline when the run ends.
///
/// Closing is idempotent: only the first [`BaselineGenerator::close`] (or
/// `after_all`) writes the file.
#[derive(Debug)]
pub struct BaselineGenerator {
    path: PathBuf,
    collected: Mutex<Baseline>,
    closed: AtomicBool,
}

impl BaselineGenerator {
    /// Creates a generator writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            collected: Mutex::new(Baseline::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Output path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records violations of one file.
    pub fn record(&self, file: &Path, violations: &[Violation]) {
        let mut baseline = self
            .collected
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for v in violations.iter().filter(|v| !v.corrected) {
            baseline.insert(file, BaselineEntry::from(v));
        }
    }

    /// Writes the collected baseline. Returns `Ok(false)` if it was
    /// already written.
    ///
    /// # Errors
    ///
    /// Returns [`BaselineError::Io`] if writing fails.
    pub fn close(&self) -> Result<bool, BaselineError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }
        let baseline = self
            .collected
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        baseline.save(&self.path)?;
        info!(
            "Baseline with {} entries written to {}",
            baseline.entry_count(),
            self.path.display()
        );
        Ok(true)
    }
}

impl ProcessorListener for BaselineGenerator {
    fn after(&self, file: &Path, violations: &[Violation]) {
        self.record(file, violations);
    }

    fn after_all(&self) {
        if let Err(e) = self.close() {
            error!("{e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Location, Severity};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn violation(message: &str) -> Violation {
        Violation::new(
            "LONG_LINE",
            "3.5.1",
            Severity::Warning,
            Location::new(PathBuf::from("src/A.kt"), 1, 1),
            message,
        )
    }

    // --- Loading tests ---

    #[test]
    fn missing_baseline_is_none() {
        let dir = TempDir::new().unwrap();
        let loaded = Baseline::try_to_load(&dir.path().join("baseline.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn corrupt_baseline_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("baseline.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Baseline::try_to_load(&path),
            Err(BaselineError::Corrupt { .. })
        ));

        std::fs::write(&path, r#"{"version": 7, "files": {}}"#).unwrap();
        assert!(matches!(
            Baseline::try_to_load(&path),
            Err(BaselineError::Corrupt { .. })
        ));
    }

    #[test]
    fn save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/baseline.json");
        let mut baseline = Baseline::new();
        baseline.insert(Path::new("src/A.kt"), BaselineEntry::from(&violation("a")));
        baseline.insert(Path::new("src/A.kt"), BaselineEntry::from(&violation("a")));
        baseline.save(&path).unwrap();

        let loaded = Baseline::try_to_load(&path).unwrap().unwrap();
        assert_eq!(loaded, baseline);
        assert_eq!(loaded.entry_count(), 2);
        assert_eq!(loaded.file_count(), 1);
    }

    // --- Filtering tests ---

    #[test]
    fn filter_matches_by_value() {
        let mut baseline = Baseline::new();
        baseline.insert(Path::new("src/A.kt"), BaselineEntry::from(&violation("old")));

        let (kept, dropped) = baseline.filter(
            Path::new("src/A.kt"),
            vec![violation("old"), violation("new")],
        );
        assert_eq!(dropped, 1);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].message, "new");

        let (kept, dropped) = baseline.filter(Path::new("src/B.kt"), vec![violation("old")]);
        assert_eq!((kept.len(), dropped), (1, 0));
    }

    #[test]
    fn filter_consumes_one_entry_per_violation() {
        let mut baseline = Baseline::new();
        baseline.insert(Path::new("src/A.kt"), BaselineEntry::from(&violation("same")));

        let (kept, dropped) = baseline.filter(
            Path::new("src/A.kt"),
            vec![violation("same"), violation("same")],
        );
        assert_eq!(dropped, 1);
        assert_eq!(kept.len(), 1);

        baseline.insert(Path::new("src/A.kt"), BaselineEntry::from(&violation("same")));
        let (kept, dropped) = baseline.filter(
            Path::new("src/A.kt"),
            vec![violation("same"), violation("same"), violation("same")],
        );
        assert_eq!((kept.len(), dropped), (1, 2));
    }

    // --- Generator tests ---

    #[test]
    fn generator_records_uncorrected_and_closes_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("baseline.json");
        let generator = Arc::new(Baseline::generator(&path));

        let mut fixed = violation("fixed");
        fixed.corrected = true;
        std::thread::scope(|scope| {
            for name in ["src/A.kt", "src/B.kt"] {
                let generator = Arc::clone(&generator);
                let violations = vec![violation("kept"), fixed.clone()];
                scope.spawn(move || generator.after(Path::new(name), &violations));
            }
        });

        assert!(generator.close().unwrap());
        std::fs::write(&path, "overwritten").unwrap();
        generator.after_all();
        assert!(!generator.close().unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "overwritten");
    }

    #[test]
    fn generated_baseline_suppresses_the_same_violations() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("baseline.json");
        let generator = Baseline::generator(&path);
        generator.after(Path::new("src/A.kt"), &[violation("a"), violation("b")]);
        generator.after_all();

        let baseline = Baseline::try_to_load(&path).unwrap().unwrap();
        assert_eq!(baseline.entry_count(), 2);
        let (kept, _) = baseline.filter(
            Path::new("src/A.kt"),
            vec![violation("a"), violation("b"), violation("c")],
        );
        assert_eq!(kept.len(), 1);
    }
}
