//! Rule limiting line length.
//!
//! Lines of `package` and `import` directives and lines containing a URL are
//! not checked. Lengths are counted in characters of the original text.
//!
//! # Configuration
//!
//! - `lineLength`: maximum number of characters (default: 120)

use crate::catalog::LONG_LINE;
use crate::utils::leaf_at;
use ktguard_core::{Rule, RuleBox, RuleContext, RulesConfig, SyntaxTree, TreeConsistencyError, Warning};

/// Rule name for line-length.
pub const NAME: &str = "line-length";

const LINE_LENGTH: usize = 120;

/// Reports lines longer than `lineLength`.
#[derive(Debug, Clone)]
pub struct LineLength {
    line_length: usize,
}

impl Default for LineLength {
    fn default() -> Self {
        Self {
            line_length: LINE_LENGTH,
        }
    }
}

impl LineLength {
    /// Reads the options of `LONG_LINE`.
    #[must_use]
    pub fn from_config(config: &RulesConfig) -> Self {
        let mut rule = Self::default();
        if let Some(entry) = config.get(LONG_LINE.name) {
            rule.line_length = entry.get_usize("lineLength", LINE_LENGTH);
        }
        rule
    }

    /// Factory for the rule set.
    #[must_use]
    pub fn boxed(config: &RulesConfig) -> RuleBox {
        Box::new(Self::from_config(config))
    }
}

impl Rule for LineLength {
    fn name(&self) -> &'static str {
        NAME
    }

    fn warnings(&self) -> &'static [&'static Warning] {
        static WARNINGS: [&Warning; 1] = [&LONG_LINE];
        &WARNINGS
    }

    fn description(&self) -> &'static str {
        "Limits line length"
    }

    fn visit(&self, tree: &mut SyntaxTree, ctx: &mut RuleContext<'_>) -> Result<(), TreeConsistencyError> {
        let content = ctx.file().content;
        let mut offset = 0;
        for line in content.split_inclusive('\n') {
            let start = offset;
            offset += line.len();
            let line = line.trim_end_matches(|c| c == '\n' || c == '\r');
            let length = line.chars().count();
            if length <= self.line_length || is_exempt(line) {
                continue;
            }
            let indent = line.len() - line.trim_start().len();
            let node = leaf_at(tree, start + indent);
            let message = format!("max line length {}, but was {length}", self.line_length);
            ctx.warn_at(tree, &LONG_LINE, node, start, &message);
        }
        Ok(())
    }
}

fn is_exempt(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("package ")
        || trimmed.starts_with("import ")
        || line.contains("http://")
        || line.contains("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{check, fix, run_with};
    use ktguard_core::Mode;

    fn rule(config: &RulesConfig) -> RuleBox {
        LineLength::boxed(config)
    }

    #[test]
    fn test_long_line_reported() {
        let long = format!("val a = \"{}\"\n", "x".repeat(120));
        let source = format!("val ok = 1\n{long}");
        let outcome = check(rule, &source);
        assert_eq!(outcome.messages(), ["[LONG_LINE] this line is longer than allowed: max line length 120, but was 130"]);
        assert_eq!(outcome.offsets(), [11]);
        assert!(!outcome.diagnostics[0].can_be_auto_corrected);
        assert_eq!(fix(rule, &source).text, source);
    }

    #[test]
    fn test_imports_and_urls_are_exempt() {
        let source = format!(
            "import a.{}\n// see https://example.com/{}\n",
            "b".repeat(130),
            "c".repeat(130)
        );
        assert!(check(rule, &source).diagnostics.is_empty());
    }

    #[test]
    fn test_line_length_option() {
        let config = "[rules.LONG_LINE]\nlineLength = 10\n";
        let outcome = run_with(rule, config, "val abc = 12\nval a = 1\n", Mode::Check);
        assert_eq!(outcome.offsets(), [0]);
    }

    #[test]
    fn test_suppressed_inside_function() {
        let source = format!(
            "@Suppress(\"LONG_LINE\")\nfun f() {{\n    val a = \"{}\"\n}}\n",
            "x".repeat(130)
        );
        assert!(check(rule, &source).diagnostics.is_empty());
    }

    #[test]
    fn test_allow_comment() {
        let source = format!(
            "// ktguard: allow(LONG_LINE)\nval a = \"{}\"\n",
            "x".repeat(130)
        );
        assert!(check(rule, &source).diagnostics.is_empty());
    }
}
