//! Lossless recursive-descent parser for the Kotlin statement subset.
//!
//! The grammar is deliberately shallow: declarations, blocks, lambdas,
//! control flow and `when` get their own nodes, everything else is kept as a
//! flat [`NodeKind::Statement`] of leaves and groups. Whitespace and comments
//! between statements are children of the enclosing container.

use super::lexer::{tokenize, Token};
use super::{ParseError, SourceParser};
use crate::kind::{Keyword, NodeKind};
use crate::tree::{SyntaxTree, TreeBuilder};

/// Parser for `.kt` and `.kts` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct KotlinParser;

impl KotlinParser {
    /// Creates the parser.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SourceParser for KotlinParser {
    fn language_id(&self) -> &'static str {
        "kotlin"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["kt", "kts"]
    }

    fn parse(&self, source: &str) -> Result<SyntaxTree, ParseError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            builder: TreeBuilder::new(),
        };
        parser.file()?;
        Ok(parser.builder.finish()?)
    }
}

/// Modifiers that may precede a declaration keyword.
const MODIFIERS: &[&str] = &[
    "abstract",
    "actual",
    "annotation",
    "companion",
    "const",
    "crossinline",
    "data",
    "enum",
    "expect",
    "external",
    "final",
    "infix",
    "inline",
    "inner",
    "internal",
    "lateinit",
    "noinline",
    "open",
    "operator",
    "override",
    "private",
    "protected",
    "public",
    "sealed",
    "suspend",
    "tailrec",
    "value",
    "vararg",
];

/// Operators after which a statement continues on the next line.
const NON_TERMINATING_POSTFIX: &[&str] = &["++", "--", "!!"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Stops {
    at_else: bool,
    at_while: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seq {
    Statement(Stops),
    Group,
    WhenCondition,
}

struct Parser<'s> {
    tokens: Vec<Token<'s>>,
    pos: usize,
    builder: TreeBuilder,
}

impl<'s> Parser<'s> {
    fn peek(&self) -> Option<Token<'s>> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_kind(&self) -> Option<NodeKind> {
        self.tokens.get(self.pos).map(|t| t.kind)
    }

    fn at(&self, kind: NodeKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn bump(&mut self) {
        if let Some(token) = self.tokens.get(self.pos) {
            self.builder.token(token.kind, token.text);
            self.pos += 1;
        }
    }

    fn bump_trivia(&mut self) {
        while self.peek_kind().is_some_and(NodeKind::is_trivia) {
            self.bump();
        }
    }

    /// Index of the first non-trivia token at or after `from`, and whether
    /// the skipped trivia contains a line break.
    fn scan_trivia(&self, from: usize) -> (Option<usize>, bool) {
        let mut newline = false;
        for (index, token) in self.tokens.iter().enumerate().skip(from) {
            if !token.kind.is_trivia() {
                return (Some(index), newline);
            }
            newline |= token.text.contains('\n');
        }
        (None, newline)
    }

    fn next_significant(&self) -> Option<Token<'s>> {
        self.scan_trivia(self.pos).0.map(|i| self.tokens[i])
    }

    fn prev_significant_index(&self, before: usize) -> Option<usize> {
        (0..before).rev().find(|&i| !self.tokens[i].kind.is_trivia())
    }

    fn unexpected(&self) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::Unexpected {
                text: token.text.to_string(),
                offset: token.offset,
            },
            None => ParseError::Unexpected {
                text: String::from("end of file"),
                offset: self.tokens.last().map_or(0, |t| t.offset + t.text.len()),
            },
        }
    }

    // ── Containers ──

    fn file(&mut self) -> Result<(), ParseError> {
        self.builder.start_node(NodeKind::File);
        self.statements()?;
        if self.peek().is_some() {
            return Err(self.unexpected());
        }
        self.builder.finish_node();
        Ok(())
    }

    /// Statements up to a closing brace or the end of input.
    fn statements(&mut self) -> Result<(), ParseError> {
        while let Some(kind) = self.peek_kind() {
            match kind {
                k if k.is_trivia() => self.bump(),
                NodeKind::Semicolon => self.bump(),
                NodeKind::RBrace => break,
                NodeKind::RParen | NodeKind::RBracket => return Err(self.unexpected()),
                _ => self.statement(Stops::default())?,
            }
        }
        Ok(())
    }

    fn braced(&mut self, kind: NodeKind) -> Result<(), ParseError> {
        let open = self.peek().map_or(0, |t| t.offset);
        self.builder.start_node(kind);
        self.bump();
        self.statements()?;
        if !self.at(NodeKind::RBrace) {
            return Err(ParseError::Unclosed {
                delimiter: '{',
                offset: open,
            });
        }
        self.bump();
        self.builder.finish_node();
        Ok(())
    }

    fn group(&mut self, kind: NodeKind, close: NodeKind, delimiter: char) -> Result<(), ParseError> {
        let open = self.peek().map_or(0, |t| t.offset);
        self.builder.start_node(kind);
        self.bump();
        self.sequence(Seq::Group)?;
        match self.peek_kind() {
            Some(k) if k == close => self.bump(),
            Some(NodeKind::RParen | NodeKind::RBracket) => return Err(self.unexpected()),
            _ => {
                return Err(ParseError::Unclosed {
                    delimiter,
                    offset: open,
                })
            }
        }
        self.builder.finish_node();
        Ok(())
    }

    // ── Statements ──

    fn statement(&mut self, stops: Stops) -> Result<(), ParseError> {
        if let Some(keyword_index) = self.declaration_ahead() {
            return self.declaration(keyword_index);
        }
        match self.peek_kind() {
            Some(NodeKind::Keyword(Keyword::If)) => self.if_expression(),
            Some(NodeKind::Keyword(Keyword::When)) => self.when_expression(),
            Some(NodeKind::Keyword(Keyword::For)) => self.simple_loop(NodeKind::For),
            Some(NodeKind::Keyword(Keyword::While)) => self.simple_loop(NodeKind::While),
            Some(NodeKind::Keyword(Keyword::Do)) => self.do_while(),
            _ => self.expression_statement(stops),
        }
    }

    fn expression_statement(&mut self, stops: Stops) -> Result<(), ParseError> {
        let start = self.pos;
        self.builder.start_node(NodeKind::Statement);
        self.sequence(Seq::Statement(stops))?;
        if self.pos == start {
            self.bump();
        }
        self.builder.finish_node();
        Ok(())
    }

    /// Body of a branch or loop: a block or a single statement.
    fn branch_body(&mut self, stops: Stops) -> Result<(), ParseError> {
        if self.at(NodeKind::LBrace) {
            self.braced(NodeKind::Block)
        } else {
            self.statement(stops)
        }
    }

    fn is_terminator(kind: NodeKind, stops: Stops) -> bool {
        matches!(
            kind,
            NodeKind::RBrace | NodeKind::RParen | NodeKind::RBracket | NodeKind::Semicolon
        ) || (stops.at_else && kind.is_keyword(Keyword::Else))
            || (stops.at_while && kind.is_keyword(Keyword::While))
    }

    /// Leaves and nested groups until the end of the sequence.
    fn sequence(&mut self, seq: Seq) -> Result<(), ParseError> {
        while let Some(token) = self.peek() {
            let kind = token.kind;
            if kind.is_trivia() {
                if self.trivia_ends(seq) {
                    break;
                }
                self.bump();
                continue;
            }
            match kind {
                NodeKind::RBrace | NodeKind::RParen | NodeKind::RBracket => break,
                NodeKind::Semicolon if seq != Seq::Group => break,
                NodeKind::Arrow if seq == Seq::WhenCondition => break,
                NodeKind::Keyword(Keyword::Else)
                    if matches!(seq, Seq::Statement(s) if s.at_else) =>
                {
                    break
                }
                NodeKind::Keyword(Keyword::While)
                    if matches!(seq, Seq::Statement(s) if s.at_while) =>
                {
                    break
                }
                NodeKind::LParen => self.group(NodeKind::Parens, NodeKind::RParen, '(')?,
                NodeKind::LBracket => self.group(NodeKind::Brackets, NodeKind::RBracket, '[')?,
                NodeKind::LBrace => {
                    let kind = if self.brace_opens_block() {
                        NodeKind::Block
                    } else {
                        NodeKind::Lambda
                    };
                    self.braced(kind)?;
                }
                NodeKind::Keyword(Keyword::If) => self.if_expression()?,
                NodeKind::Keyword(Keyword::When) => self.when_expression()?,
                _ => self.bump(),
            }
        }
        Ok(())
    }

    /// Decides whether the trivia run at the cursor ends the sequence.
    fn trivia_ends(&self, seq: Seq) -> bool {
        let (next, newline) = self.scan_trivia(self.pos);
        let Some(next) = next else {
            return seq != Seq::Group;
        };
        let next_kind = self.tokens[next].kind;
        match seq {
            Seq::Group => false,
            Seq::WhenCondition => matches!(next_kind, NodeKind::Arrow | NodeKind::RBrace),
            Seq::Statement(stops) => {
                Self::is_terminator(next_kind, stops) || (newline && !self.continues_line(next))
            }
        }
    }

    /// A line break does not end a statement when the next line starts with a
    /// member access or binary operator, or the current line ends with one.
    fn continues_line(&self, next: usize) -> bool {
        let next_token = self.tokens[next];
        if next_token.kind == NodeKind::Dot
            || (next_token.kind == NodeKind::Operator
                && matches!(next_token.text, "?:" | "&&" | "||"))
        {
            return true;
        }
        match self.prev_significant_index(self.pos).map(|i| self.tokens[i]) {
            Some(prev) => match prev.kind {
                NodeKind::Dot | NodeKind::Comma | NodeKind::Arrow => true,
                NodeKind::Operator => !NON_TERMINATING_POSTFIX.contains(&prev.text),
                _ => false,
            },
            None => false,
        }
    }

    /// `try {`, `finally {`, `catch (...) {` and `init {` open code blocks;
    /// any other brace inside an expression is a lambda.
    fn brace_opens_block(&self) -> bool {
        let Some(prev) = self.prev_significant_index(self.pos) else {
            return false;
        };
        let token = self.tokens[prev];
        match token.kind {
            NodeKind::Keyword(Keyword::Try | Keyword::Finally) => true,
            NodeKind::Identifier => token.text == "init",
            NodeKind::RParen => self
                .matching_open(prev)
                .and_then(|open| self.prev_significant_index(open))
                .is_some_and(|i| self.tokens[i].kind.is_keyword(Keyword::Catch)),
            _ => false,
        }
    }

    fn matching_open(&self, close: usize) -> Option<usize> {
        let mut depth = 0usize;
        for index in (0..=close).rev() {
            match self.tokens[index].kind {
                NodeKind::RParen => depth += 1,
                NodeKind::LParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(index);
                    }
                }
                _ => {}
            }
        }
        None
    }

    // ── Declarations ──

    /// If annotations and modifiers at the cursor lead to `fun`, `class`,
    /// `interface` or `object`, returns the index of that keyword.
    fn declaration_ahead(&self) -> Option<usize> {
        let mut index = self.pos;
        while let Some(token) = self.tokens.get(index) {
            match token.kind {
                k if k.is_trivia() => index += 1,
                NodeKind::Annotation => {
                    index += 1;
                    if self.tokens.get(index).map(|t| t.kind) == Some(NodeKind::LParen) {
                        index = self.skip_parens(index)?;
                    }
                }
                NodeKind::Identifier if MODIFIERS.contains(&token.text) => index += 1,
                NodeKind::Keyword(
                    Keyword::Fun | Keyword::Class | Keyword::Interface | Keyword::Object,
                ) => return Some(index),
                _ => return None,
            }
        }
        None
    }

    fn skip_parens(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (index, token) in self.tokens.iter().enumerate().skip(open) {
            match token.kind {
                NodeKind::LParen => depth += 1,
                NodeKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(index + 1);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn declaration(&mut self, keyword_index: usize) -> Result<(), ParseError> {
        let kind = if self.tokens[keyword_index].kind.is_keyword(Keyword::Fun) {
            NodeKind::Function
        } else {
            NodeKind::Class
        };
        self.builder.start_node(kind);
        if let Some(last_modifier) = self.prev_significant_index(keyword_index) {
            if last_modifier >= self.pos {
                self.builder.start_node(NodeKind::Modifiers);
                while self.pos <= last_modifier {
                    self.bump();
                }
                self.builder.finish_node();
            }
        }
        self.bump_trivia();
        self.bump();
        self.declaration_header(kind)?;
        self.builder.finish_node();
        Ok(())
    }

    /// Everything after the declaration keyword: name, parameters, supertypes
    /// and the body.
    fn declaration_header(&mut self, kind: NodeKind) -> Result<(), ParseError> {
        while let Some(token) = self.peek() {
            match token.kind {
                k if k.is_trivia() => {
                    let (next, newline) = self.scan_trivia(self.pos);
                    let Some(next) = next else { break };
                    let next_token = self.tokens[next];
                    let continues = matches!(next_token.kind, NodeKind::LBrace | NodeKind::Colon)
                        || (next_token.kind == NodeKind::Operator && next_token.text == "=")
                        || (next_token.kind == NodeKind::Identifier && next_token.text == "where");
                    if newline && !continues {
                        break;
                    }
                    self.bump_trivia();
                }
                NodeKind::LParen => self.group(NodeKind::Parens, NodeKind::RParen, '(')?,
                NodeKind::LBracket => self.group(NodeKind::Brackets, NodeKind::RBracket, '[')?,
                NodeKind::LBrace => {
                    self.braced(NodeKind::Block)?;
                    break;
                }
                NodeKind::Operator if kind == NodeKind::Function && token.text == "=" => {
                    self.bump();
                    if self
                        .next_significant()
                        .is_some_and(|t| !Self::is_terminator(t.kind, Stops::default()))
                    {
                        self.bump_trivia();
                        self.statement(Stops::default())?;
                    }
                    break;
                }
                NodeKind::RBrace | NodeKind::RParen | NodeKind::RBracket | NodeKind::Semicolon => {
                    break
                }
                _ => self.bump(),
            }
        }
        Ok(())
    }

    // ── Control flow ──

    fn if_expression(&mut self) -> Result<(), ParseError> {
        self.builder.start_node(NodeKind::If);
        self.bump();
        self.condition()?;

        let then_stops = Stops {
            at_else: true,
            at_while: false,
        };
        if let Some(next) = self.next_significant() {
            if !Self::is_terminator(next.kind, then_stops) {
                self.bump_trivia();
                self.builder.start_node(NodeKind::Then);
                self.branch_body(then_stops)?;
                self.builder.finish_node();
            }
        }

        if self
            .next_significant()
            .is_some_and(|t| t.kind.is_keyword(Keyword::Else))
        {
            self.bump_trivia();
            self.bump();
            if let Some(next) = self.next_significant() {
                if !Self::is_terminator(next.kind, Stops::default()) {
                    self.bump_trivia();
                    self.builder.start_node(NodeKind::Else);
                    self.branch_body(Stops::default())?;
                    self.builder.finish_node();
                }
            }
        }
        self.builder.finish_node();
        Ok(())
    }

    /// Optional parenthesized condition after a keyword.
    fn condition(&mut self) -> Result<(), ParseError> {
        if self
            .next_significant()
            .is_some_and(|t| t.kind == NodeKind::LParen)
        {
            self.bump_trivia();
            self.group(NodeKind::Parens, NodeKind::RParen, '(')?;
        }
        Ok(())
    }

    fn loop_body(&mut self, stops: Stops) -> Result<(), ParseError> {
        if let Some(next) = self.next_significant() {
            if !Self::is_terminator(next.kind, stops) {
                self.bump_trivia();
                self.builder.start_node(NodeKind::Body);
                self.branch_body(stops)?;
                self.builder.finish_node();
            }
        }
        Ok(())
    }

    fn simple_loop(&mut self, kind: NodeKind) -> Result<(), ParseError> {
        self.builder.start_node(kind);
        self.bump();
        self.condition()?;
        self.loop_body(Stops::default())?;
        self.builder.finish_node();
        Ok(())
    }

    fn do_while(&mut self) -> Result<(), ParseError> {
        self.builder.start_node(NodeKind::DoWhile);
        self.bump();
        self.loop_body(Stops {
            at_else: false,
            at_while: true,
        })?;
        if self
            .next_significant()
            .is_some_and(|t| t.kind.is_keyword(Keyword::While))
        {
            self.bump_trivia();
            self.bump();
            self.condition()?;
        }
        self.builder.finish_node();
        Ok(())
    }

    fn when_expression(&mut self) -> Result<(), ParseError> {
        self.builder.start_node(NodeKind::When);
        self.bump();
        self.condition()?;
        if self
            .next_significant()
            .is_some_and(|t| t.kind == NodeKind::LBrace)
        {
            self.bump_trivia();
            let open = self.peek().map_or(0, |t| t.offset);
            self.bump();
            loop {
                match self.peek_kind() {
                    None => {
                        return Err(ParseError::Unclosed {
                            delimiter: '{',
                            offset: open,
                        })
                    }
                    Some(k) if k.is_trivia() => self.bump(),
                    Some(NodeKind::Semicolon) => self.bump(),
                    Some(NodeKind::RBrace) => {
                        self.bump();
                        break;
                    }
                    Some(_) => self.when_entry()?,
                }
            }
        }
        self.builder.finish_node();
        Ok(())
    }

    fn when_entry(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        self.builder.start_node(NodeKind::WhenEntry);
        self.sequence(Seq::WhenCondition)?;
        if self.pos == start {
            return Err(self.unexpected());
        }
        if self
            .next_significant()
            .is_some_and(|t| t.kind == NodeKind::Arrow)
        {
            self.bump_trivia();
            self.bump();
            if self
                .next_significant()
                .is_some_and(|t| !Self::is_terminator(t.kind, Stops::default()))
            {
                self.bump_trivia();
                self.branch_body(Stops::default())?;
            }
        }
        self.builder.finish_node();
        Ok(())
    }
}
