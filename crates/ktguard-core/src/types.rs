//! Core types for violations, failures and run results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Severity level for violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message.
    Info,
    /// Warning that should be addressed.
    Warning,
    /// Error that must be fixed.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "unknown severity `{other}` (expected info, warning or error)"
            )),
        }
    }
}

/// Source code location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File path relative to the run root.
    pub file: PathBuf,
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed, in characters).
    pub column: usize,
    /// Byte offset in the original file.
    pub offset: usize,
}

impl Location {
    /// Creates a new location with explicit values.
    #[must_use]
    pub fn new(file: PathBuf, line: usize, column: usize) -> Self {
        Self {
            file,
            line,
            column,
            offset: 0,
        }
    }

    /// Sets the byte offset for this location.
    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// A reported violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Warning name (e.g. `LONG_LINE`).
    pub rule: String,
    /// Chapter code (e.g. `3.5.1`).
    pub code: String,
    /// Severity of this violation.
    pub severity: Severity,
    /// Where it was found, in the original text.
    pub location: Location,
    /// Human-readable message.
    pub message: String,
    /// Whether the producing rule can fix it.
    pub can_be_auto_corrected: bool,
    /// Whether it was fixed during this run.
    #[serde(default)]
    pub corrected: bool,
}

impl Violation {
    /// Creates a new uncorrected violation.
    #[must_use]
    pub fn new(
        rule: impl Into<String>,
        code: impl Into<String>,
        severity: Severity,
        location: Location,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule: rule.into(),
            code: code.into(),
            severity,
            location,
            message: message.into(),
            can_be_auto_corrected: false,
            corrected: false,
        }
    }

    /// Marks the violation as fixable.
    #[must_use]
    pub fn fixable(mut self, can_be_auto_corrected: bool) -> Self {
        self.can_be_auto_corrected = can_be_auto_corrected;
        self
    }

    /// Formats the violation for terminal output.
    #[must_use]
    pub fn format(&self) -> String {
        use std::fmt::Write;
        let mut output = format!(
            "{} {} at {}:{}:{}\n",
            self.code,
            self.rule,
            self.location.file.display(),
            self.location.line,
            self.location.column,
        );
        let _ = writeln!(output, "  {}: {}", self.severity, self.message);
        if self.corrected {
            let _ = writeln!(output, "  = fixed");
        } else if self.can_be_auto_corrected {
            let _ = writeln!(output, "  = help: run `ktguard fix` to correct this automatically");
        }
        output
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: {} {}",
            self.location.file.display(),
            self.location.line,
            self.location.column,
            self.severity,
            self.message
        )?;
        if self.corrected {
            write!(f, " (fixed)")?;
        } else if self.can_be_auto_corrected {
            write!(f, " (can be auto-corrected)")?;
        }
        Ok(())
    }
}

/// Why a file could not be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Reading or writing the file failed.
    Io,
    /// The file could not be parsed.
    Parse,
    /// A rule performed an invalid tree mutation.
    Internal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io => write!(f, "io error"),
            Self::Parse => write!(f, "parse error"),
            Self::Internal => write!(f, "internal error"),
        }
    }
}

/// A file that was skipped because of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    /// File path relative to the run root.
    pub file: PathBuf,
    /// Failure class.
    pub kind: FailureKind,
    /// Error message.
    pub message: String,
}

impl std::fmt::Display for FileFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.file.display(), self.kind, self.message)
    }
}

/// Result of a run.
///
/// Violations are ordered by file path, then by emission order within a
/// file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LintResult {
    /// All violations found, including corrected ones.
    pub violations: Vec<Violation>,
    /// Number of files processed successfully.
    pub files_checked: usize,
    /// Files that could not be processed.
    pub failures: Vec<FileFailure>,
    /// Files rewritten in fix mode.
    pub updated_files: Vec<PathBuf>,
    /// Number of violations hidden by the baseline.
    pub baselined: usize,
    /// Whether the run was cancelled before all files were processed.
    #[serde(default)]
    pub cancelled: bool,
}

impl LintResult {
    /// Creates a new empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Violations that were not corrected.
    pub fn remaining(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| !v.corrected)
    }

    /// Returns `true` if any uncorrected violation is left.
    #[must_use]
    pub fn has_remaining(&self) -> bool {
        self.remaining().next().is_some()
    }

    /// Number of corrected violations.
    #[must_use]
    pub fn corrected_count(&self) -> usize {
        self.violations.iter().filter(|v| v.corrected).count()
    }

    /// Counts uncorrected violations as `(errors, warnings, infos)`.
    #[must_use]
    pub fn count_by_severity(&self) -> (usize, usize, usize) {
        self.remaining()
            .fold((0, 0, 0), |(e, w, i), v| match v.severity {
                Severity::Error => (e + 1, w, i),
                Severity::Warning => (e, w + 1, i),
                Severity::Info => (e, w, i + 1),
            })
    }

    /// Groups violations by file, keeping their order within each file.
    #[must_use]
    pub fn group_by_file(&self) -> BTreeMap<&Path, Vec<&Violation>> {
        let mut groups: BTreeMap<&Path, Vec<&Violation>> = BTreeMap::new();
        for v in &self.violations {
            groups.entry(v.location.file.as_path()).or_default().push(v);
        }
        groups
    }

    /// Process exit status for this result.
    ///
    /// `1` if any uncorrected violation remains, `2` if none remain but some
    /// file failed, `0` otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.has_remaining() {
            1
        } else if !self.failures.is_empty() {
            2
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_violation(file: &str, line: usize, severity: Severity) -> Violation {
        Violation::new(
            "LONG_LINE",
            "3.5.1",
            severity,
            Location::new(PathBuf::from(file), line, 1),
            "[LONG_LINE] this line is too long",
        )
    }

    // --- Severity tests ---

    #[test]
    fn severity_parses_case_insensitively() {
        assert_eq!("Error".parse::<Severity>(), Ok(Severity::Error));
        assert_eq!("warn".parse::<Severity>(), Ok(Severity::Warning));
        assert!("fatal".parse::<Severity>().is_err());
    }

    // --- Violation tests ---

    #[test]
    fn violation_display() {
        let v = make_violation("src/A.kt", 3, Severity::Warning).fixable(true);
        assert_eq!(
            v.to_string(),
            "src/A.kt:3:1: warning [LONG_LINE] this line is too long (can be auto-corrected)"
        );
    }

    #[test]
    fn violation_format_mentions_fix() {
        let mut v = make_violation("src/A.kt", 3, Severity::Warning).fixable(true);
        assert!(v.format().contains("= help: run `ktguard fix`"));
        v.corrected = true;
        assert!(v.format().contains("= fixed"));
    }

    // --- LintResult tests ---

    #[test]
    fn exit_code_reflects_remaining_and_failures() {
        let mut result = LintResult::new();
        assert_eq!(result.exit_code(), 0);

        result.failures.push(FileFailure {
            file: PathBuf::from("B.kt"),
            kind: FailureKind::Parse,
            message: "unclosed `{`".to_string(),
        });
        assert_eq!(result.exit_code(), 2);

        let mut fixed = make_violation("A.kt", 1, Severity::Error);
        fixed.corrected = true;
        result.violations.push(fixed);
        assert_eq!(result.exit_code(), 2);

        result.violations.push(make_violation("A.kt", 2, Severity::Info));
        assert_eq!(result.exit_code(), 1);
    }

    #[test]
    fn count_by_severity_skips_corrected() {
        let mut result = LintResult::new();
        result.violations.push(make_violation("A.kt", 1, Severity::Error));
        result.violations.push(make_violation("A.kt", 2, Severity::Warning));
        let mut fixed = make_violation("A.kt", 3, Severity::Warning);
        fixed.corrected = true;
        result.violations.push(fixed);

        assert_eq!(result.count_by_severity(), (1, 1, 0));
        assert_eq!(result.corrected_count(), 1);
    }

    #[test]
    fn group_keeps_emission_order() {
        let mut result = LintResult::new();
        result.violations.push(make_violation("b.kt", 5, Severity::Warning));
        result.violations.push(make_violation("a.kt", 9, Severity::Warning));
        result.violations.push(make_violation("a.kt", 2, Severity::Warning));

        let groups = result.group_by_file();
        let keys: Vec<_> = groups.keys().map(|p| p.to_string_lossy().into_owned()).collect();
        assert_eq!(keys, ["a.kt", "b.kt"]);
        assert_eq!(groups[Path::new("a.kt")][0].location.line, 9);
        assert_eq!(groups[Path::new("a.kt")][1].location.line, 2);
    }
}
