//! Rule separating long numeric literals with underscores.
//!
//! Literals with more than `maxNumberLength` digits and no `_` get a
//! separator every `maxBlockLength` digits, counted from the decimal point.
//! Radix prefixes, type suffixes and exponents are kept as they are.
//!
//! # Configuration
//!
//! - `maxNumberLength`: longest literal left alone (default: 5)
//! - `maxBlockLength`: digits per block (default: 3)

use crate::catalog::LONG_NUMERICAL_VALUES_SEPARATED;
use ktguard_core::{
    NodeId, NodeKind, Rule, RuleBox, RuleContext, RulesConfig, SyntaxTree, TreeConsistencyError,
    Warning,
};

/// Rule name for long-numerical-values.
pub const NAME: &str = "long-numerical-values";

/// Reports and separates long numeric literals.
#[derive(Debug, Clone)]
pub struct LongNumericalValues {
    max_number_length: usize,
    max_block_length: usize,
}

impl Default for LongNumericalValues {
    fn default() -> Self {
        Self {
            max_number_length: 5,
            max_block_length: 3,
        }
    }
}

impl LongNumericalValues {
    /// Reads the options of `LONG_NUMERICAL_VALUES_SEPARATED`.
    #[must_use]
    pub fn from_config(config: &RulesConfig) -> Self {
        let mut rule = Self::default();
        if let Some(entry) = config.get(LONG_NUMERICAL_VALUES_SEPARATED.name) {
            rule.max_number_length = entry.get_usize("maxNumberLength", rule.max_number_length);
            rule.max_block_length = entry.get_usize("maxBlockLength", rule.max_block_length).max(1);
        }
        rule
    }

    /// Factory for the rule set.
    #[must_use]
    pub fn boxed(config: &RulesConfig) -> RuleBox {
        Box::new(Self::from_config(config))
    }

    /// The separated form of `literal`, or `None` if it is short enough or
    /// already separated.
    fn separate(&self, literal: &str) -> Option<String> {
        let parts = NumberParts::split(literal)?;
        if parts.int.len() + parts.frac.len() <= self.max_number_length {
            return None;
        }
        let mut out = String::with_capacity(literal.len() * 2);
        out.push_str(parts.prefix);
        out.push_str(&group_from_right(parts.int, self.max_block_length));
        if parts.has_point {
            out.push('.');
            out.push_str(&group_from_left(parts.frac, self.max_block_length));
        }
        out.push_str(parts.exponent);
        out.push_str(parts.suffix);
        Some(out)
    }
}

impl Rule for LongNumericalValues {
    fn name(&self) -> &'static str {
        NAME
    }

    fn warnings(&self) -> &'static [&'static Warning] {
        static WARNINGS: [&Warning; 1] = [&LONG_NUMERICAL_VALUES_SEPARATED];
        &WARNINGS
    }

    fn description(&self) -> &'static str {
        "Separates long numeric literals with underscores"
    }

    fn visit_node(
        &self,
        tree: &mut SyntaxTree,
        node: NodeId,
        ctx: &mut RuleContext<'_>,
    ) -> Result<(), TreeConsistencyError> {
        if tree.kind(node) != NodeKind::Number {
            return Ok(());
        }
        let literal = tree.leaf_text(node).to_string();
        let Some(separated) = self.separate(&literal) else {
            return Ok(());
        };
        ctx.warn_and_fix(tree, &LONG_NUMERICAL_VALUES_SEPARATED, node, &literal, |tree| {
            tree.set_leaf_text(node, separated)
        })?;
        Ok(())
    }
}

struct NumberParts<'a> {
    prefix: &'a str,
    int: &'a str,
    has_point: bool,
    frac: &'a str,
    exponent: &'a str,
    suffix: &'a str,
}

impl<'a> NumberParts<'a> {
    fn split(literal: &'a str) -> Option<Self> {
        if literal.contains('_') {
            return None;
        }
        let lower = literal.get(..2).map(str::to_ascii_lowercase);
        let (prefix, rest, is_digit): (&str, &str, fn(&char) -> bool) = match lower.as_deref() {
            Some("0x") => (&literal[..2], &literal[2..], char::is_ascii_hexdigit),
            Some("0b") => (&literal[..2], &literal[2..], |c| matches!(c, '0' | '1')),
            _ => ("", literal, char::is_ascii_digit),
        };
        let suffix_chars: &[char] = if prefix.is_empty() {
            &['l', 'L', 'u', 'U', 'f', 'F']
        } else {
            &['l', 'L', 'u', 'U']
        };
        let body = rest.trim_end_matches(suffix_chars);
        let suffix = &rest[body.len()..];

        let (mantissa, exponent) = match body.find(|c: char| c == 'e' || c == 'E').filter(|_| prefix.is_empty()) {
            Some(pos) => body.split_at(pos),
            None => (body, ""),
        };
        let (int, frac, has_point) = match mantissa.split_once('.') {
            Some((int, frac)) => (int, frac, true),
            None => (mantissa, "", false),
        };
        if int.is_empty() || !int.chars().all(|c| is_digit(&c)) || !frac.chars().all(|c| is_digit(&c)) {
            return None;
        }
        Some(Self {
            prefix,
            int,
            has_point,
            frac,
            exponent,
            suffix,
        })
    }
}

fn group_from_right(digits: &str, block: usize) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut groups: Vec<String> = chars
        .rchunks(block)
        .map(|chunk| chunk.iter().collect())
        .collect();
    groups.reverse();
    groups.join("_")
}

fn group_from_left(digits: &str, block: usize) -> String {
    let chars: Vec<char> = digits.chars().collect();
    chars
        .chunks(block)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("_")
}
