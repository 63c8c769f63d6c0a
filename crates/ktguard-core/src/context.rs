//! Per-file context handed to rules.

use crate::utils::paths::{has_dir_component, relative_slash_path};
use std::path::{Path, PathBuf};

/// Context of the file being processed.
///
/// Offsets and line numbers always refer to the original text, even after
/// a fix mutated the tree.
#[derive(Debug, Clone)]
pub struct FileContext<'a> {
    /// Path to the file as discovered.
    pub path: &'a Path,
    /// Original file contents.
    pub content: &'a str,
    /// Whether this file lives under one of the configured test directories.
    pub is_test: bool,
    /// Path relative to the run root.
    pub relative_path: PathBuf,
    line_starts: Vec<usize>,
}

impl<'a> FileContext<'a> {
    /// Creates a new file context.
    #[must_use]
    pub fn new(path: &'a Path, content: &'a str, root: &Path, test_dirs: &[String]) -> Self {
        let relative_path = path
            .strip_prefix(root)
            .map_or_else(|_| path.to_path_buf(), Path::to_path_buf);
        let is_test = has_dir_component(&relative_path, test_dirs);
        let line_starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        Self {
            path,
            content,
            is_test,
            relative_path,
            line_starts,
        }
    }

    /// Creates a context for in-memory text, mostly for tests.
    #[must_use]
    pub fn from_source(content: &'a str) -> Self {
        Self::new(Path::new("Test.kt"), content, Path::new(""), &[])
    }

    /// Relative path with `/` separators, as used in reports and baselines.
    #[must_use]
    pub fn display_path(&self) -> String {
        relative_slash_path(&self.relative_path, Path::new(""))
    }

    /// Number of lines in the file.
    #[must_use]
    pub fn line_count(&self) -> usize {
        if self.content.ends_with('\n') {
            self.line_starts.len() - 1
        } else {
            self.line_starts.len()
        }
    }

    /// 1-indexed line and column (in characters) of a byte offset.
    #[must_use]
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.content.len());
        let line_index = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[line_index];
        let column = self
            .content
            .get(line_start..offset)
            .map_or(offset - line_start, |prefix| prefix.chars().count());
        (line_index + 1, column + 1)
    }
}
