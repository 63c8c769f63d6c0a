//! Node kinds of the syntax tree.

use std::fmt;

/// Reserved words recognised by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Keyword {
    As,
    Break,
    Catch,
    Class,
    Continue,
    Do,
    Else,
    False,
    Finally,
    For,
    Fun,
    If,
    Import,
    In,
    Interface,
    Is,
    Null,
    Object,
    Package,
    Return,
    Super,
    This,
    Throw,
    True,
    Try,
    TypeAlias,
    Val,
    Var,
    When,
    While,
}

impl Keyword {
    const ALL: [Self; 30] = [
        Self::As,
        Self::Break,
        Self::Catch,
        Self::Class,
        Self::Continue,
        Self::Do,
        Self::Else,
        Self::False,
        Self::Finally,
        Self::For,
        Self::Fun,
        Self::If,
        Self::Import,
        Self::In,
        Self::Interface,
        Self::Is,
        Self::Null,
        Self::Object,
        Self::Package,
        Self::Return,
        Self::Super,
        Self::This,
        Self::Throw,
        Self::True,
        Self::Try,
        Self::TypeAlias,
        Self::Val,
        Self::Var,
        Self::When,
        Self::While,
    ];

    /// Looks up the keyword spelled by `ident`.
    #[must_use]
    pub fn from_ident(ident: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kw| kw.as_str() == ident)
    }

    /// Source spelling of the keyword.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::As => "as",
            Self::Break => "break",
            Self::Catch => "catch",
            Self::Class => "class",
            Self::Continue => "continue",
            Self::Do => "do",
            Self::Else => "else",
            Self::False => "false",
            Self::Finally => "finally",
            Self::For => "for",
            Self::Fun => "fun",
            Self::If => "if",
            Self::Import => "import",
            Self::In => "in",
            Self::Interface => "interface",
            Self::Is => "is",
            Self::Null => "null",
            Self::Object => "object",
            Self::Package => "package",
            Self::Return => "return",
            Self::Super => "super",
            Self::This => "this",
            Self::Throw => "throw",
            Self::True => "true",
            Self::Try => "try",
            Self::TypeAlias => "typealias",
            Self::Val => "val",
            Self::Var => "var",
            Self::When => "when",
            Self::While => "while",
        }
    }
}

/// Kind of a syntax tree node.
///
/// Composite kinds group other nodes; every other kind is a leaf that owns
/// a slice of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Whole source file.
    File,
    /// Annotations and modifiers in front of a declaration.
    Modifiers,
    /// `fun` declaration including its body.
    Function,
    /// `class`, `interface` or `object` declaration.
    Class,
    /// Braced code block: function, class, control-flow or `when` branch body.
    Block,
    /// Braced function literal.
    Lambda,
    /// Parenthesized group: conditions, parameter and argument lists.
    Parens,
    /// Bracketed group: indexing and collection literals.
    Brackets,
    /// `if` expression.
    If,
    /// Then-branch of an `if`.
    Then,
    /// Else-branch of an `if`.
    Else,
    /// `for` loop.
    For,
    /// `while` loop.
    While,
    /// `do ... while` loop.
    DoWhile,
    /// Loop body.
    Body,
    /// `when` expression.
    When,
    /// Single `when` branch.
    WhenEntry,
    /// Any other statement or expression.
    Statement,

    /// Run of spaces, tabs and line breaks.
    WhiteSpace,
    /// `// ...` comment.
    EolComment,
    /// `/* ... */` comment.
    BlockComment,
    /// `/** ... */` documentation comment.
    KDoc,
    /// String literal, including templates and raw strings.
    StringLiteral,
    /// Character literal.
    CharLiteral,
    /// Numeric literal.
    Number,
    /// Identifier (plain or back-quoted).
    Identifier,
    /// Reserved word.
    Keyword(Keyword),
    /// Annotation name such as `@Suppress`.
    Annotation,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `->`
    Arrow,
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// `.` or `?.`
    Dot,
    /// `:` or `::`
    Colon,
    /// Any other operator or stray character.
    Operator,
}

impl NodeKind {
    /// Returns `true` for kinds that group other nodes.
    #[must_use]
    pub fn is_composite(self) -> bool {
        matches!(
            self,
            Self::File
                | Self::Modifiers
                | Self::Function
                | Self::Class
                | Self::Block
                | Self::Lambda
                | Self::Parens
                | Self::Brackets
                | Self::If
                | Self::Then
                | Self::Else
                | Self::For
                | Self::While
                | Self::DoWhile
                | Self::Body
                | Self::When
                | Self::WhenEntry
                | Self::Statement
        )
    }

    /// Returns `true` for comment kinds.
    #[must_use]
    pub fn is_comment(self) -> bool {
        matches!(self, Self::EolComment | Self::BlockComment | Self::KDoc)
    }

    /// Returns `true` for whitespace and comments.
    #[must_use]
    pub fn is_trivia(self) -> bool {
        self == Self::WhiteSpace || self.is_comment()
    }

    /// Returns `true` if this is the given keyword.
    #[must_use]
    pub fn is_keyword(self, keyword: Keyword) -> bool {
        self == Self::Keyword(keyword)
    }

    /// Returns `true` for `{`, `(` and `[`.
    #[must_use]
    pub fn is_opening(self) -> bool {
        matches!(self, Self::LBrace | Self::LParen | Self::LBracket)
    }

    /// Returns `true` for `}`, `)` and `]`.
    #[must_use]
    pub fn is_closing(self) -> bool {
        matches!(self, Self::RBrace | Self::RParen | Self::RBracket)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keyword(kw) => write!(f, "Keyword({})", kw.as_str()),
            other => write!(f, "{other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup_round_trips_every_keyword() {
        for kw in Keyword::ALL {
            assert_eq!(Keyword::from_ident(kw.as_str()), Some(kw));
        }
        assert_eq!(Keyword::from_ident("let"), None);
    }

    #[test]
    fn trivia_and_composite_are_disjoint() {
        for kind in [
            NodeKind::WhiteSpace,
            NodeKind::EolComment,
            NodeKind::BlockComment,
            NodeKind::KDoc,
        ] {
            assert!(kind.is_trivia());
            assert!(!kind.is_composite());
        }
        assert!(NodeKind::Block.is_composite());
        assert!(!NodeKind::Block.is_trivia());
    }

    #[test]
    fn display_spells_keywords() {
        assert_eq!(NodeKind::Keyword(Keyword::If).to_string(), "Keyword(if)");
        assert_eq!(NodeKind::WhenEntry.to_string(), "WhenEntry");
    }
}
