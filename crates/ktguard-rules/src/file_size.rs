//! Rule limiting the number of lines in a file.
//!
//! # Configuration
//!
//! - `maxSize`: maximum number of lines (default: 2000)
//! - `ignoreFolders`: directory names whose files are not checked

use crate::catalog::FILE_IS_TOO_LONG;
use ktguard_core::utils::paths::has_dir_component;
use ktguard_core::{
    Rule, RuleBox, RuleContext, RulesConfig, SyntaxTree, TreeConsistencyError, Warning,
};

/// Rule name for file-size.
pub const NAME: &str = "file-size";

const MAX_SIZE: usize = 2000;

/// Reports files longer than `maxSize` lines.
#[derive(Debug, Clone)]
pub struct FileSize {
    max_size: usize,
    ignore_folders: Vec<String>,
}

impl Default for FileSize {
    fn default() -> Self {
        Self {
            max_size: MAX_SIZE,
            ignore_folders: Vec::new(),
        }
    }
}

impl FileSize {
    /// Reads the options of `FILE_IS_TOO_LONG`.
    #[must_use]
    pub fn from_config(config: &RulesConfig) -> Self {
        let mut rule = Self::default();
        if let Some(entry) = config.get(FILE_IS_TOO_LONG.name) {
            rule.max_size = entry.get_usize("maxSize", MAX_SIZE);
            rule.ignore_folders = entry.get_str_array("ignoreFolders");
        }
        rule
    }

    /// Factory for the rule set.
    #[must_use]
    pub fn boxed(config: &RulesConfig) -> RuleBox {
        Box::new(Self::from_config(config))
    }

    /// Sets the maximum number of lines.
    #[must_use]
    pub fn max_size(mut self, max: usize) -> Self {
        self.max_size = max;
        self
    }
}

impl Rule for FileSize {
    fn name(&self) -> &'static str {
        NAME
    }

    fn warnings(&self) -> &'static [&'static Warning] {
        static WARNINGS: [&Warning; 1] = [&FILE_IS_TOO_LONG];
        &WARNINGS
    }

    fn description(&self) -> &'static str {
        "Limits the number of lines in a file"
    }

    fn visit(&self, tree: &mut SyntaxTree, ctx: &mut RuleContext<'_>) -> Result<(), TreeConsistencyError> {
        let file = ctx.file();
        if has_dir_component(&file.relative_path, &self.ignore_folders) {
            return Ok(());
        }
        let lines = file.line_count();
        if lines > self.max_size {
            ctx.warn(tree, &FILE_IS_TOO_LONG, tree.root(), &lines.to_string());
        }
        Ok(())
    }
}
