//! Tokenizer for Kotlin sources.

use super::ParseError;
use crate::kind::{Keyword, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Token<'s> {
    pub kind: NodeKind,
    pub text: &'s str,
    pub offset: usize,
}

/// Multi-character operators, longest first.
const OPERATORS: &[&str] = &[
    "===", "!==", "..<", "?:", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=",
    "/=", "%=", "!!", "..",
];

pub(super) fn tokenize(source: &str) -> Result<Vec<Token<'_>>, ParseError> {
    let mut lexer = Lexer { source, pos: 0 };
    let mut tokens = Vec::new();
    while lexer.pos < source.len() {
        let start = lexer.pos;
        let kind = lexer.next_kind()?;
        tokens.push(Token {
            kind,
            text: &source[start..lexer.pos],
            offset: start,
        });
    }
    Ok(tokens)
}

struct Lexer<'s> {
    source: &'s str,
    pos: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl Lexer<'_> {
    fn rest(&self) -> &str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
    }

    fn next_kind(&mut self) -> Result<NodeKind, ParseError> {
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(NodeKind::Operator);
        };

        if matches!(c, ' ' | '\t' | '\n' | '\r') {
            self.eat_while(|c| matches!(c, ' ' | '\t' | '\n' | '\r'));
            return Ok(NodeKind::WhiteSpace);
        }
        if self.rest().starts_with("//") {
            self.eat_while(|c| c != '\n');
            return Ok(NodeKind::EolComment);
        }
        if self.rest().starts_with("/*") {
            return self.block_comment(start);
        }
        if self.rest().starts_with("\"\"\"") {
            return self.raw_string(start);
        }
        if c == '"' {
            self.bump();
            self.string_body(start)?;
            return Ok(NodeKind::StringLiteral);
        }
        if c == '\'' {
            return self.char_literal(start);
        }
        if c.is_ascii_digit() {
            self.number();
            return Ok(NodeKind::Number);
        }
        if is_ident_start(c) {
            self.eat_while(is_ident_part);
            let text = &self.source[start..self.pos];
            return Ok(Keyword::from_ident(text).map_or(NodeKind::Identifier, NodeKind::Keyword));
        }
        if c == '`' {
            self.bump();
            self.eat_while(|c| c != '`' && c != '\n');
            if self.peek() != Some('`') {
                return Err(ParseError::Unterminated {
                    what: "identifier",
                    offset: start,
                });
            }
            self.bump();
            return Ok(NodeKind::Identifier);
        }
        if c == '@' && self.peek_nth(1).is_some_and(is_ident_start) {
            self.bump();
            self.eat_while(is_ident_part);
            if self.peek() == Some(':') && self.peek_nth(1).is_some_and(is_ident_start) {
                self.bump();
                self.eat_while(is_ident_part);
            }
            return Ok(NodeKind::Annotation);
        }
        Ok(self.punctuation())
    }

    fn block_comment(&mut self, start: usize) -> Result<NodeKind, ParseError> {
        let kind = if self.rest().starts_with("/**") && !self.rest().starts_with("/**/") {
            NodeKind::KDoc
        } else {
            NodeKind::BlockComment
        };
        let mut depth = 0usize;
        loop {
            if self.rest().starts_with("/*") {
                depth += 1;
                self.pos += 2;
            } else if self.rest().starts_with("*/") {
                depth -= 1;
                self.pos += 2;
                if depth == 0 {
                    return Ok(kind);
                }
            } else if self.bump().is_none() {
                return Err(ParseError::Unterminated {
                    what: "comment",
                    offset: start,
                });
            }
        }
    }

    fn raw_string(&mut self, start: usize) -> Result<NodeKind, ParseError> {
        self.pos += 3;
        match self.rest().find("\"\"\"") {
            Some(end) => {
                self.pos += end + 3;
                // `""""` closes the string with a trailing quote inside it.
                self.eat_while(|c| c == '"');
                Ok(NodeKind::StringLiteral)
            }
            None => Err(ParseError::Unterminated {
                what: "string",
                offset: start,
            }),
        }
    }

    /// Consumes a regular string after its opening quote, including `${...}`
    /// templates that may contain nested strings.
    fn string_body(&mut self, start: usize) -> Result<(), ParseError> {
        let unterminated = ParseError::Unterminated {
            what: "string",
            offset: start,
        };
        let mut depth = 0usize;
        loop {
            let Some(c) = self.bump() else {
                return Err(unterminated);
            };
            match c {
                '\\' => {
                    self.bump();
                }
                '\n' if depth == 0 => return Err(unterminated),
                '"' if depth == 0 => return Ok(()),
                '"' => {
                    let nested = self.pos - 1;
                    self.string_body(nested)?;
                }
                '$' if self.peek() == Some('{') => {
                    self.bump();
                    depth += 1;
                }
                '{' if depth > 0 => depth += 1,
                '}' if depth > 0 => depth -= 1,
                _ => {}
            }
        }
    }

    fn char_literal(&mut self, start: usize) -> Result<NodeKind, ParseError> {
        self.bump();
        loop {
            match self.bump() {
                Some('\\') => {
                    self.bump();
                }
                Some('\'') => return Ok(NodeKind::CharLiteral),
                Some('\n') | None => {
                    return Err(ParseError::Unterminated {
                        what: "character literal",
                        offset: start,
                    })
                }
                Some(_) => {}
            }
        }
    }

    fn number(&mut self) {
        self.eat_while(is_ident_part);
        if self.peek() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.eat_while(is_ident_part);
        }
    }

    fn punctuation(&mut self) -> NodeKind {
        let rest = self.rest();
        let fixed = [
            ("->", NodeKind::Arrow),
            ("?.", NodeKind::Dot),
            ("::", NodeKind::Colon),
        ];
        for (text, kind) in fixed {
            if rest.starts_with(text) {
                self.pos += text.len();
                return kind;
            }
        }
        if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            self.pos += op.len();
            return NodeKind::Operator;
        }
        match self.bump() {
            Some('{') => NodeKind::LBrace,
            Some('}') => NodeKind::RBrace,
            Some('(') => NodeKind::LParen,
            Some(')') => NodeKind::RParen,
            Some('[') => NodeKind::LBracket,
            Some(']') => NodeKind::RBracket,
            Some(';') => NodeKind::Semicolon,
            Some(',') => NodeKind::Comma,
            Some('.') => NodeKind::Dot,
            Some(':') => NodeKind::Colon,
            _ => NodeKind::Operator,
        }
    }
}
