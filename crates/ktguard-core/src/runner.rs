//! Batch runner: discovery, parallel processing, fixing, baseline and
//! listeners.
//!
//! ```text
//! Idle -> Loading (build)  -> Processing (run, per file) -> Reporting
//!                 \-> error (config, rule set or baseline)   \-> per-file failure
//! ```

use crate::baseline::{Baseline, BaselineError, BaselineGenerator};
use crate::config::{Config, ConfigError};
use crate::context::FileContext;
use crate::listener::{ListenerRef, ListenerSet, ProcessorListener};
use crate::parser::{KotlinParser, SourceParser};
use crate::pipeline::{ProcessError, RuleSet, RuleSetError};
use crate::rule::{Diagnostic, Mode, RuleFactory};
use crate::types::{FailureKind, FileFailure, LintResult, Location, Violation};
use crate::warnings::WarningRegistry;

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors that abort a run before or around file processing.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// IO error outside per-file processing.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Rule set construction failed.
    #[error(transparent)]
    RuleSet(#[from] RuleSetError),

    /// Baseline could not be loaded or written.
    #[error(transparent)]
    Baseline(#[from] BaselineError),

    /// Glob pattern error.
    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    /// Directory walk error.
    #[error("Failed to walk directory: {0}")]
    Walk(#[from] ignore::Error),

    /// Worker pool creation failed.
    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Builder for configuring a [`Runner`].
#[derive(Default)]
pub struct RunnerBuilder {
    root: Option<PathBuf>,
    config: Option<Config>,
    registry: Option<Arc<WarningRegistry>>,
    factories: Vec<RuleFactory>,
    parser: Option<Arc<dyn SourceParser>>,
    mode: Mode,
    baseline: Option<PathBuf>,
    regenerate_baseline: bool,
    listeners: Vec<ListenerRef>,
    exclude_patterns: Vec<String>,
    parallelism: Option<usize>,
    cancel: Option<Arc<AtomicBool>>,
}

impl RunnerBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the root directory; reported paths are relative to it.
    #[must_use]
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the warning catalog.
    #[must_use]
    pub fn registry(mut self, registry: Arc<WarningRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Adds rule factories; order is execution order.
    #[must_use]
    pub fn rules(mut self, factories: &[RuleFactory]) -> Self {
        self.factories.extend_from_slice(factories);
        self
    }

    /// Sets the source parser (default: [`KotlinParser`]).
    #[must_use]
    pub fn parser(mut self, parser: Arc<dyn SourceParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Sets check or fix mode.
    #[must_use]
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Uses a baseline file.
    #[must_use]
    pub fn baseline(mut self, path: impl Into<PathBuf>) -> Self {
        self.baseline = Some(path.into());
        self
    }

    /// Overwrites the baseline from this run instead of filtering with it.
    #[must_use]
    pub fn regenerate_baseline(mut self, regenerate: bool) -> Self {
        self.regenerate_baseline = regenerate;
        self
    }

    /// Adds a listener.
    #[must_use]
    pub fn listener(mut self, listener: ListenerRef) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Adds an exclude glob pattern.
    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Adds multiple exclude glob patterns.
    #[must_use]
    pub fn excludes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Overrides the number of worker threads.
    #[must_use]
    pub fn parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }

    /// Flag checked between files; setting it stops the run early.
    #[must_use]
    pub fn cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Validates configuration, builds the rule set and resolves the
    /// baseline.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown rule names, invalid rule ordering or a
    /// corrupt baseline.
    pub fn build(self) -> Result<Runner, RunnerError> {
        let root = self.root.unwrap_or_else(|| PathBuf::from("."));
        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()?.join(&root)
        };

        let config = self.config.unwrap_or_default();
        let registry = self.registry.unwrap_or_default();
        config.validate(&registry)?;

        let mut exclude_patterns = self.exclude_patterns;
        exclude_patterns.extend(config.analyzer.exclude.iter().cloned());
        let parallelism = self.parallelism.or(config.analyzer.parallelism);
        let respect_gitignore = config.analyzer.respect_gitignore;

        let rule_set = RuleSet::build(registry, Arc::new(config.rules), &self.factories)?;
        info!("Loaded {} rule(s): {}", rule_set.names().len(), rule_set.names().join(", "));

        let mut listeners = ListenerSet::new();
        for listener in self.listeners {
            listeners.push(listener);
        }

        let (baseline, generator) = match self.baseline {
            None => (None, None),
            Some(path) if self.regenerate_baseline => {
                info!("Regenerating baseline {}", path.display());
                (None, Some(Arc::new(BaselineGenerator::new(path))))
            }
            Some(path) => match Baseline::try_to_load(&path)? {
                Some(baseline) => {
                    info!(
                        "Using baseline {} with {} entries",
                        path.display(),
                        baseline.entry_count()
                    );
                    (Some(baseline), None)
                }
                None => {
                    info!("Baseline {} not found, it will be created", path.display());
                    (None, Some(Arc::new(BaselineGenerator::new(path))))
                }
            },
        };
        if let Some(generator) = &generator {
            listeners.push(generator.clone());
        }

        Ok(Runner {
            root,
            rule_set,
            parser: self.parser.unwrap_or_else(|| Arc::new(KotlinParser::new())),
            mode: self.mode,
            baseline,
            generator,
            listeners,
            exclude_patterns,
            respect_gitignore,
            parallelism,
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

/// Outcome of one file.
enum FileOutcome {
    Done {
        violations: Vec<Violation>,
        updated: Option<PathBuf>,
        baselined: usize,
    },
    Failed(FileFailure),
    Skipped,
}

/// Processes batches of files through a [`RuleSet`].
///
/// Use [`Runner::builder()`] to construct an instance.
pub struct Runner {
    root: PathBuf,
    rule_set: RuleSet,
    parser: Arc<dyn SourceParser>,
    mode: Mode,
    baseline: Option<Baseline>,
    generator: Option<Arc<BaselineGenerator>>,
    listeners: ListenerSet,
    exclude_patterns: Vec<String>,
    respect_gitignore: bool,
    parallelism: Option<usize>,
    cancel: Arc<AtomicBool>,
}

impl Runner {
    /// Creates a new builder for configuring a runner.
    #[must_use]
    pub fn builder() -> RunnerBuilder {
        RunnerBuilder::new()
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The rule set in use.
    #[must_use]
    pub fn rule_set(&self) -> &RuleSet {
        &self.rule_set
    }

    /// Returns `true` if this run writes a new baseline.
    #[must_use]
    pub fn generates_baseline(&self) -> bool {
        self.generator.is_some()
    }

    /// Processes the files under `paths` (the root when empty).
    ///
    /// Files are handled in parallel; results are ordered by path. A file
    /// that fails to read, parse or fix is reported in
    /// [`LintResult::failures`] and doesn't stop the batch.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails, the worker pool can't start or
    /// the new baseline can't be written.
    pub fn run(&self, paths: &[PathBuf]) -> Result<LintResult, RunnerError> {
        info!("Starting {:?} run at {}", self.mode, self.root.display());
        let files = self.discover_files(paths)?;
        info!("Found {} files to analyze", files.len());

        self.listeners.before_all(&files);

        let threads = self
            .parallelism
            .filter(|&n| n > 0)
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, usize::from));
        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
        let outcomes: Vec<FileOutcome> =
            pool.install(|| files.par_iter().map(|f| self.process_file(f)).collect());

        let mut result = LintResult::new();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Done {
                    violations,
                    updated,
                    baselined,
                } => {
                    result.files_checked += 1;
                    result.violations.extend(violations);
                    result.updated_files.extend(updated);
                    result.baselined += baselined;
                }
                FileOutcome::Failed(failure) => result.failures.push(failure),
                FileOutcome::Skipped => result.cancelled = true,
            }
        }

        if let Some(generator) = &self.generator {
            generator.close()?;
        }
        self.listeners.after_all();

        info!(
            "Run complete: {} violation(s), {} fixed, {} baselined, {} failure(s) in {} file(s)",
            result.violations.len() - result.corrected_count(),
            result.corrected_count(),
            result.baselined,
            result.failures.len(),
            result.files_checked
        );
        Ok(result)
    }

    fn process_file(&self, path: &Path) -> FileOutcome {
        if self.cancel.load(Ordering::Relaxed) {
            return FileOutcome::Skipped;
        }
        self.listeners.before(path);

        let relative = path
            .strip_prefix(&self.root)
            .map_or_else(|_| path.to_path_buf(), Path::to_path_buf);
        let failure = |kind, message: String| {
            FileOutcome::Failed(FileFailure {
                file: relative.clone(),
                kind,
                message,
            })
        };

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read {}: {e}", path.display());
                return failure(FailureKind::Io, e.to_string());
            }
        };

        let ctx = FileContext::new(path, &content, &self.root, &self.rule_set.common().test_dirs);
        let processed = match self.rule_set.process_source(self.parser.as_ref(), &ctx, self.mode) {
            Ok(processed) => processed,
            Err(ProcessError::Parse(e)) => {
                warn!("Failed to parse {}: {e}", path.display());
                let message = match e.offset() {
                    Some(offset) => {
                        let (line, column) = ctx.line_col(offset);
                        format!("{e} (line {line}, column {column})")
                    }
                    None => e.to_string(),
                };
                return failure(FailureKind::Parse, message);
            }
            Err(e) => {
                error!("Internal error while processing {}: {e}", path.display());
                return failure(FailureKind::Internal, e.to_string());
            }
        };

        let mut updated = None;
        if let Some(fixed) = &processed.fixed_source {
            warn!(
                "Original and formatted content differ, writing to {}...",
                path.display()
            );
            if let Err(e) = std::fs::write(path, fixed) {
                error!("Failed to write {}: {e}", path.display());
                return failure(FailureKind::Io, e.to_string());
            }
            updated = Some(relative.clone());
        }

        let violations: Vec<Violation> = processed
            .diagnostics
            .into_iter()
            .map(|d| to_violation(d, &ctx))
            .collect();
        let (violations, baselined) = match &self.baseline {
            Some(baseline) => baseline.filter(&relative, violations),
            None => (violations, 0),
        };

        self.listeners.after(&relative, &violations);
        FileOutcome::Done {
            violations,
            updated,
            baselined,
        }
    }

    /// Discovers source files the parser handles, sorted by path.
    fn discover_files(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>, RunnerError> {
        let excludes = self
            .exclude_patterns
            .iter()
            .map(|p| glob::Pattern::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        let roots: Vec<PathBuf> = if paths.is_empty() {
            vec![self.root.clone()]
        } else {
            paths
                .iter()
                .map(|p| if p.is_absolute() { p.clone() } else { self.root.join(p) })
                .collect()
        };

        let mut files = Vec::new();
        for root in roots {
            if root.is_file() {
                if self.parser.handles(&root) {
                    files.push(root);
                }
                continue;
            }
            let mut builder = ignore::WalkBuilder::new(&root);
            builder
                .hidden(false)
                .git_ignore(self.respect_gitignore)
                .require_git(false);
            for entry in builder.build() {
                let entry = entry?;
                let path = entry.path();
                if !path.is_file() || !self.parser.handles(path) {
                    continue;
                }
                if self.should_exclude(path, &excludes) {
                    debug!("Excluding: {}", path.display());
                    continue;
                }
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        files.dedup();
        Ok(files)
    }

    /// Checks a path, relative to the root, against the exclude patterns.
    fn should_exclude(&self, path: &Path, excludes: &[glob::Pattern]) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        excludes
            .iter()
            .any(|pattern| pattern.matches_path(relative) || pattern.matches_path(path))
    }
}

fn to_violation(diagnostic: Diagnostic, ctx: &FileContext<'_>) -> Violation {
    let (line, column) = ctx.line_col(diagnostic.offset);
    let location = Location::new(ctx.relative_path.clone(), line, column).with_offset(diagnostic.offset);
    let mut violation = Violation::new(
        diagnostic.warning.name,
        diagnostic.warning.code,
        diagnostic.severity,
        location,
        diagnostic.message,
    )
    .fixable(diagnostic.can_be_auto_corrected);
    violation.corrected = diagnostic.corrected;
    violation
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builder_defaults() {
        let runner = Runner::builder().root(".").build().expect("Failed to build runner");
        assert!(runner.root().is_absolute());
        assert!(runner.rule_set().names().is_empty());
        assert!(!runner.generates_baseline());
    }

    #[test]
    fn test_exclude_patterns() {
        let runner = Runner::builder()
            .root("/p")
            .exclude("**/generated/**")
            .build()
            .unwrap();
        let excludes: Vec<_> = runner
            .exclude_patterns
            .iter()
            .map(|p| glob::Pattern::new(p).unwrap())
            .collect();
        assert!(runner.should_exclude(Path::new("/p/src/generated/A.kt"), &excludes));
        assert!(runner.should_exclude(Path::new("/p/build/A.kt"), &excludes));
        assert!(!runner.should_exclude(Path::new("/p/src/main/A.kt"), &excludes));
    }

    #[test]
    fn test_discovery_filters_extensions_and_sorts() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src/b")).unwrap();
        std::fs::write(dir.path().join("src/b/B.kt"), "").unwrap();
        std::fs::write(dir.path().join("src/A.kts"), "").unwrap();
        std::fs::write(dir.path().join("src/readme.md"), "").unwrap();

        let runner = Runner::builder().root(dir.path()).build().unwrap();
        let files = runner.discover_files(&[]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(names, [PathBuf::from("src/A.kts"), PathBuf::from("src/b/B.kt")]);

        let explicit = runner.discover_files(&[PathBuf::from("src/b/B.kt")]).unwrap();
        assert_eq!(explicit.len(), 1);
    }

    #[test]
    fn test_corrupt_baseline_fails_build() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("baseline.json");
        std::fs::write(&path, "[]").unwrap();
        let err = Runner::builder().root(dir.path()).baseline(&path).build();
        assert!(matches!(err, Err(RunnerError::Baseline(_))));

        let runner = Runner::builder()
            .root(dir.path())
            .baseline(&path)
            .regenerate_baseline(true)
            .build()
            .unwrap();
        assert!(runner.generates_baseline());
    }

    #[test]
    fn test_cancelled_run_skips_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("A.kt"), "val a = 1\n").unwrap();
        let flag = Arc::new(AtomicBool::new(true));
        let runner = Runner::builder()
            .root(dir.path())
            .cancellation(flag)
            .build()
            .unwrap();
        let result = runner.run(&[]).unwrap();
        assert!(result.cancelled);
        assert_eq!(result.files_checked, 0);
    }
}
