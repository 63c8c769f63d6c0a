//! Warning catalog of the built-in rules.
//!
//! Every warning a bundled rule can raise is declared here once; the
//! [`catalog`] registry is what configuration is validated against.

use ktguard_core::{RegistryError, Warning, WarningRegistry};

/// Source file has more lines than allowed.
pub static FILE_IS_TOO_LONG: Warning =
    Warning::new("FILE_IS_TOO_LONG", "3.1.1", "file has more lines than allowed", false);

/// Conditional or loop body without braces.
pub static NO_BRACES_IN_CONDITIONALS_AND_LOOPS: Warning = Warning::new(
    "NO_BRACES_IN_CONDITIONALS_AND_LOOPS",
    "3.2.1",
    "in if, else, when, for, do, and while statements braces should be used",
    true,
);

/// Wrong indentation or tabs.
pub static WRONG_INDENTATION: Warning = Warning::new(
    "WRONG_INDENTATION",
    "3.3.1",
    "only spaces are allowed for indentation and each indentation should equal to 4 spaces (tabs are not allowed)",
    true,
);

/// Empty block or badly formatted empty block.
pub static EMPTY_BLOCK_STRUCTURE_ERROR: Warning = Warning::new(
    "EMPTY_BLOCK_STRUCTURE_ERROR",
    "3.4.1",
    "incorrect format of empty block",
    true,
);

/// Line exceeds the maximum length.
pub static LONG_LINE: Warning = Warning::new(
    "LONG_LINE",
    "3.5.1",
    "this line is longer than allowed",
    false,
);

/// Consecutive spaces outside indentation.
pub static TOO_MANY_CONSECUTIVE_SPACES: Warning = Warning::new(
    "TOO_MANY_CONSECUTIVE_SPACES",
    "3.15.1",
    "too many consecutive spaces",
    true,
);

/// Long numeric literal without `_` separators.
pub static LONG_NUMERICAL_VALUES_SEPARATED: Warning = Warning::new(
    "LONG_NUMERICAL_VALUES_SEPARATED",
    "3.14.2",
    "long numerical values should be separated with underscore",
    true,
);

/// Function body exceeds the maximum length.
pub static TOO_LONG_FUNCTION: Warning = Warning::new(
    "TOO_LONG_FUNCTION",
    "5.1.1",
    "function is too long: split it or make more primitive",
    false,
);

/// All warnings in declaration order.
pub static ALL_WARNINGS: [&Warning; 8] = [
    &FILE_IS_TOO_LONG,
    &NO_BRACES_IN_CONDITIONALS_AND_LOOPS,
    &WRONG_INDENTATION,
    &EMPTY_BLOCK_STRUCTURE_ERROR,
    &LONG_LINE,
    &TOO_MANY_CONSECUTIVE_SPACES,
    &LONG_NUMERICAL_VALUES_SEPARATED,
    &TOO_LONG_FUNCTION,
];

/// Builds the registry of every built-in warning.
///
/// # Errors
///
/// Returns [`RegistryError`] if two warnings share a name.
pub fn catalog() -> Result<WarningRegistry, RegistryError> {
    WarningRegistry::new(ALL_WARNINGS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_valid() {
        let registry = catalog().unwrap();
        assert_eq!(registry.len(), ALL_WARNINGS.len());
        assert_eq!(
            registry.names().next(),
            Some("FILE_IS_TOO_LONG"),
            "declaration order is kept"
        );
    }

    #[test]
    fn test_rules_produce_every_catalog_warning_once() {
        let config = ktguard_core::RulesConfig::default();
        let produced: Vec<&str> = crate::standard_rules()
            .into_iter()
            .flat_map(|factory| factory(&config).warnings())
            .map(|w| w.name)
            .collect();
        let mut expected: Vec<&str> = ALL_WARNINGS.iter().map(|w| w.name).collect();
        let mut sorted = produced.clone();
        sorted.sort_unstable();
        expected.sort_unstable();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn test_suggests_closest_warning() {
        let registry = catalog().unwrap();
        assert_eq!(
            registry.closest_name("NO_BRACE_IN_CONDITIONAL_AND_LOOP"),
            Some("NO_BRACES_IN_CONDITIONALS_AND_LOOPS")
        );
        assert_eq!(registry.closest_name("LONG_LINES"), Some("LONG_LINE"));
    }

    #[test]
    fn test_fixable_warnings() {
        let fixable: Vec<_> = ALL_WARNINGS
            .iter()
            .filter(|w| w.can_be_auto_corrected)
            .map(|w| w.name)
            .collect();
        assert_eq!(
            fixable,
            [
                "NO_BRACES_IN_CONDITIONALS_AND_LOOPS",
                "WRONG_INDENTATION",
                "EMPTY_BLOCK_STRUCTURE_ERROR",
                "TOO_MANY_CONSECUTIVE_SPACES",
                "LONG_NUMERICAL_VALUES_SEPARATED",
            ]
        );
    }
}
