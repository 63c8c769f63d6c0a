//! Warning catalog types.
//!
//! A [`Warning`] is one diagnostic kind: a stable name used in
//! configuration and baselines, a chapter code, a message text and whether
//! the rule that raises it can correct it. The set of known warnings is a
//! [`WarningRegistry`] built once per run and passed to everything that
//! needs to resolve names.

use crate::types::Severity;
use crate::utils::names::closest_match;
use std::collections::HashSet;
use thiserror::Error;

/// Name of the configuration entry that holds cross-rule settings.
pub const COMMON: &str = "common";

/// A diagnostic kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Warning {
    /// Upper snake case name (e.g. `LONG_LINE`).
    pub name: &'static str,
    /// Chapter code in the style guide (e.g. `3.5.1`).
    pub code: &'static str,
    /// Message text shown before the free-form details.
    pub text: &'static str,
    /// Whether the producing rule can fix this warning.
    pub can_be_auto_corrected: bool,
    /// Severity used when configuration doesn't override it.
    pub default_severity: Severity,
}

impl Warning {
    /// Creates a warning with [`Severity::Warning`].
    #[must_use]
    pub const fn new(
        name: &'static str,
        code: &'static str,
        text: &'static str,
        can_be_auto_corrected: bool,
    ) -> Self {
        Self {
            name,
            code,
            text,
            can_be_auto_corrected,
            default_severity: Severity::Warning,
        }
    }

    /// Formats the diagnostic message: `[NAME] text: free_text`.
    #[must_use]
    pub fn message(&self, free_text: &str) -> String {
        if free_text.is_empty() {
            format!("[{}] {}", self.name, self.text)
        } else {
            format!("[{}] {}: {}", self.name, self.text, free_text)
        }
    }
}

/// Errors building a [`WarningRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two catalog entries share a name.
    #[error("warning `{0}` is declared more than once")]
    Duplicate(&'static str),

    /// A catalog entry uses the reserved configuration name.
    #[error("`{0}` is reserved and cannot name a warning")]
    Reserved(&'static str),
}

/// Ordered set of known warnings.
#[derive(Debug, Clone, Default)]
pub struct WarningRegistry {
    warnings: Vec<&'static Warning>,
}

impl WarningRegistry {
    /// Builds a registry, keeping the declared order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] on duplicate or reserved names.
    pub fn new<I>(warnings: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = &'static Warning>,
    {
        let mut seen = HashSet::new();
        let mut list = Vec::new();
        for warning in warnings {
            if warning.name == COMMON {
                return Err(RegistryError::Reserved(warning.name));
            }
            if !seen.insert(warning.name) {
                return Err(RegistryError::Duplicate(warning.name));
            }
            list.push(warning);
        }
        Ok(Self { warnings: list })
    }

    /// Looks up a warning by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'static Warning> {
        self.warnings.iter().copied().find(|w| w.name == name)
    }

    /// Returns `true` if `name` is a registered warning.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names in declared order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.warnings.iter().map(|w| w.name)
    }

    /// Registered warnings in declared order.
    pub fn iter(&self) -> impl Iterator<Item = &'static Warning> + '_ {
        self.warnings.iter().copied()
    }

    /// Number of registered warnings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Registered name closest to `name` by edit distance.
    #[must_use]
    pub fn closest_name(&self, name: &str) -> Option<&'static str> {
        closest_match(name, self.names())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static LONG_LINE: Warning = Warning::new("LONG_LINE", "3.5.1", "this line is too long", false);
    static BRACES: Warning = Warning::new(
        "NO_BRACES_IN_CONDITIONALS_AND_LOOPS",
        "3.2.1",
        "braces should be used",
        true,
    );
    static COMMON_WARNING: Warning = Warning::new("common", "0", "reserved", false);

    #[test]
    fn test_message_format() {
        assert_eq!(
            LONG_LINE.message("max line length 120, but was 130"),
            "[LONG_LINE] this line is too long: max line length 120, but was 130"
        );
        assert_eq!(LONG_LINE.message(""), "[LONG_LINE] this line is too long");
    }

    #[test]
    fn test_registry_lookup_and_order() {
        let registry = WarningRegistry::new([&LONG_LINE, &BRACES]).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("LONG_LINE"));
        assert!(!registry.contains("common"));
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            ["LONG_LINE", "NO_BRACES_IN_CONDITIONALS_AND_LOOPS"]
        );
        assert!(registry.get("NO_BRACES_IN_CONDITIONALS_AND_LOOPS").unwrap().can_be_auto_corrected);
    }

    #[test]
    fn test_registry_rejects_duplicates_and_reserved() {
        assert_eq!(
            WarningRegistry::new([&LONG_LINE, &LONG_LINE]).unwrap_err(),
            RegistryError::Duplicate("LONG_LINE")
        );
        assert_eq!(
            WarningRegistry::new([&COMMON_WARNING]).unwrap_err(),
            RegistryError::Reserved("common")
        );
    }

    #[test]
    fn test_closest_name() {
        let registry = WarningRegistry::new([&LONG_LINE, &BRACES]).unwrap();
        assert_eq!(
            registry.closest_name("NO_BRACE_IN_CONDITIONAL_AND_LOOP"),
            Some("NO_BRACES_IN_CONDITIONALS_AND_LOOPS")
        );
        assert_eq!(registry.closest_name("LONG_LIN"), Some("LONG_LINE"));
    }
}
