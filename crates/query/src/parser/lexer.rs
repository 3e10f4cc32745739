//! Lexer for criteria expressions.
//!
//! The lexer is context free: it splits the input into text runs, operator
//! keywords, separators and brackets, and resolves backslash escapes. Whether
//! an operator keyword or a bracket is meaningful in a given position is left
//! to the parser, which turns misplaced ones back into text.

use crate::criteria::{CLOSE_BRACKET, ESCAPE, OPEN_BRACKET, OPERAND_SEPARATOR, Operator, SEPARATOR};

/// Token types produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// A run of literal characters, with escapes already resolved.
    Text(String),
    /// An operator keyword together with its delimiters, e.g. ` gte `.
    Operator(Operator),
    /// An unescaped separator.
    Separator,
    /// An opening bracket.
    OpenBracket,
    /// A closing bracket.
    CloseBracket,
}

impl TokenKind {
    /// Returns the text this token stands for when it appears as plain text.
    pub(crate) fn as_literal(&self) -> String {
        match self {
            TokenKind::Text(text) => text.clone(),
            TokenKind::Operator(op) => {
                format!("{OPERAND_SEPARATOR}{}{OPERAND_SEPARATOR}", op.token())
            }
            TokenKind::Separator => SEPARATOR.to_string(),
            TokenKind::OpenBracket => OPEN_BRACKET.to_string(),
            TokenKind::CloseBracket => CLOSE_BRACKET.to_string(),
        }
    }
}

/// A token and the byte offset where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) position: usize,
}

/// Splits a criteria expression into tokens.
pub(crate) struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    tokens: Vec<Token>,
    text: String,
    text_start: usize,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            tokens: Vec::new(),
            text: String::new(),
            text_start: 0,
        }
    }

    /// Tokenizes the whole input.
    pub(crate) fn tokenize(mut self) -> Vec<Token> {
        while let Some(c) = self.peek() {
            match c {
                OPERAND_SEPARATOR => match self.match_operator() {
                    Some((op, len)) => {
                        self.push(TokenKind::Operator(op), len);
                    }
                    None => self.push_char(c),
                },
                ESCAPE => {
                    if self.input[self.pos + c.len_utf8()..].starts_with(SEPARATOR) {
                        // The escape itself is dropped; the separator is literal.
                        self.mark_text_start();
                        self.text.push(SEPARATOR);
                        self.pos += c.len_utf8() + SEPARATOR.len_utf8();
                    } else {
                        self.push_char(c);
                    }
                }
                SEPARATOR => self.push(TokenKind::Separator, c.len_utf8()),
                OPEN_BRACKET => self.push(TokenKind::OpenBracket, c.len_utf8()),
                CLOSE_BRACKET => self.push(TokenKind::CloseBracket, c.len_utf8()),
                _ => self.push_char(c),
            }
        }
        self.flush_text();
        self.tokens
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Matches ` <operator> ` at the current position.
    fn match_operator(&self) -> Option<(Operator, usize)> {
        let remaining = &self.input[self.pos..];
        Operator::PARSEABLE.into_iter().find_map(|op| {
            let delimited = format!("{OPERAND_SEPARATOR}{}{OPERAND_SEPARATOR}", op.token());
            remaining
                .starts_with(&delimited)
                .then_some((op, delimited.len()))
        })
    }

    fn mark_text_start(&mut self) {
        if self.text.is_empty() {
            self.text_start = self.pos;
        }
    }

    fn push_char(&mut self, c: char) {
        self.mark_text_start();
        self.text.push(c);
        self.pos += c.len_utf8();
    }

    fn push(&mut self, kind: TokenKind, len: usize) {
        self.flush_text();
        self.tokens.push(Token {
            kind,
            position: self.pos,
        });
        self.pos += len;
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            self.tokens.push(Token {
                kind: TokenKind::Text(std::mem::take(&mut self.text)),
                position: self.text_start,
            });
        }
    }
}
