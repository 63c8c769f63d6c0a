//! Source parsers producing [`SyntaxTree`]s.
//!
//! [`SourceParser`] is the extension point for additional languages. The
//! bundled [`KotlinParser`] is lossless: concatenating the leaves of the
//! produced tree always yields the input text.

mod kotlin;
mod lexer;

use crate::tree::{SyntaxTree, TreeConsistencyError};
use std::path::Path;
use thiserror::Error;

pub use kotlin::KotlinParser;

/// Failure to turn source text into a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A string, character literal or comment runs past its line or the file.
    #[error("unterminated {what} starting at offset {offset}")]
    Unterminated {
        /// What was left open.
        what: &'static str,
        /// Start offset.
        offset: usize,
    },

    /// A closing delimiter without a matching opening one.
    #[error("unexpected `{text}` at offset {offset}")]
    Unexpected {
        /// Token text.
        text: String,
        /// Token offset.
        offset: usize,
    },

    /// An opening delimiter that is never closed.
    #[error("unclosed `{delimiter}` opened at offset {offset}")]
    Unclosed {
        /// The opening delimiter.
        delimiter: char,
        /// Offset of the opening delimiter.
        offset: usize,
    },

    /// Tree construction failed.
    #[error(transparent)]
    Tree(#[from] TreeConsistencyError),
}

impl ParseError {
    /// Offset the error refers to, if any.
    #[must_use]
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::Unterminated { offset, .. }
            | Self::Unexpected { offset, .. }
            | Self::Unclosed { offset, .. } => Some(*offset),
            Self::Tree(_) => None,
        }
    }
}

/// Language front end.
pub trait SourceParser: Send + Sync {
    /// Language identifier (e.g. `"kotlin"`).
    fn language_id(&self) -> &'static str;

    /// File extensions handled, without the dot (e.g. `&["kt", "kts"]`).
    fn extensions(&self) -> &'static [&'static str];

    /// Parses a whole file.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] for input the parser cannot represent.
    fn parse(&self, source: &str) -> Result<SyntaxTree, ParseError>;

    /// Returns `true` if the file extension is one of [`Self::extensions`].
    fn handles(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions().contains(&ext))
    }
}
