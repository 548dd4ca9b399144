//! Lexer (tokenizer) for filter expressions.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use notes_model_rs::value::format_number;

use crate::error::{Language, ParseError};
use crate::registry::{is_identifier_char, is_identifier_start};

/// Error encountered during lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexerError {
    /// A character that starts no token (including a lone `=`, `&` or `|`).
    UnexpectedCharacter {
        /// The character that could not be tokenized.
        character: char,
        /// The position (0-indexed byte offset) where the error occurred.
        position: usize,
    },
    /// A quoted string without its closing quote.
    UnterminatedString {
        /// Position of the opening quote.
        position: usize,
    },
}

impl From<LexerError> for ParseError {
    fn from(err: LexerError) -> Self {
        match err {
            LexerError::UnexpectedCharacter {
                character,
                position,
            } => ParseError::UnexpectedCharacter {
                language: Language::Filter,
                character,
                position,
            },
            LexerError::UnterminatedString { position } => ParseError::UnterminatedString {
                language: Language::Filter,
                position,
            },
        }
    }
}

/// Result of tokenizing a filter expression.
#[derive(Debug, Clone, PartialEq)]
pub struct LexerResult {
    /// The tokens successfully parsed, with their positions.
    pub tokens: Vec<PositionedToken>,
    /// Any errors encountered, in input order.
    pub errors: Vec<LexerError>,
}

/// A token with its position in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedToken {
    /// The token.
    pub token: FilterToken,
    /// The byte position where the token starts (0-indexed).
    pub position: usize,
}

/// A token in a filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterToken {
    // ==================== Operands ====================
    /// A bare name: a variable, property or function name.
    Identifier(String),

    /// A quoted string with escapes resolved.
    String(String),

    /// An unsigned decimal number.
    Number(f64),

    /// The `true` literal.
    True,

    /// The `false` literal.
    False,

    /// The `null` literal.
    Null,

    // ==================== Punctuation ====================
    /// Opening parenthesis `(`.
    OpenParen,

    /// Closing parenthesis `)`.
    CloseParen,

    /// Argument separator `,`.
    Comma,

    /// Property access `.`.
    Dot,

    // ==================== Comparison ====================
    /// `==`
    Eq,
    /// `===`
    StrictEq,
    /// `!=`
    NotEq,
    /// `!==`
    StrictNotEq,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Gte,
    /// `<=`
    Lte,
    /// The `contains` keyword.
    Contains,
    /// The `startsWith` keyword.
    StartsWith,

    // ==================== Logical ====================
    /// `AND` or `&&`.
    And,
    /// `OR` or `||`.
    Or,
    /// `NOT` or `!`.
    Not,
}

impl fmt::Display for FilterToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterToken::Identifier(name) => f.write_str(name),
            FilterToken::String(s) => write!(f, "\"{}\"", s),
            FilterToken::Number(n) => f.write_str(&format_number(*n)),
            FilterToken::True => f.write_str("true"),
            FilterToken::False => f.write_str("false"),
            FilterToken::Null => f.write_str("null"),
            FilterToken::OpenParen => f.write_str("("),
            FilterToken::CloseParen => f.write_str(")"),
            FilterToken::Comma => f.write_str(","),
            FilterToken::Dot => f.write_str("."),
            FilterToken::Eq => f.write_str("=="),
            FilterToken::StrictEq => f.write_str("==="),
            FilterToken::NotEq => f.write_str("!="),
            FilterToken::StrictNotEq => f.write_str("!=="),
            FilterToken::Gt => f.write_str(">"),
            FilterToken::Lt => f.write_str("<"),
            FilterToken::Gte => f.write_str(">="),
            FilterToken::Lte => f.write_str("<="),
            FilterToken::Contains => f.write_str("contains"),
            FilterToken::StartsWith => f.write_str("startsWith"),
            FilterToken::And => f.write_str("AND"),
            FilterToken::Or => f.write_str("OR"),
            FilterToken::Not => f.write_str("NOT"),
        }
    }
}

/// Lexer for tokenizing filter expressions.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    /// Current byte position in the input string.
    position: usize,
    /// Errors encountered during tokenization.
    errors: Vec<LexerError>,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input string.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            position: 0,
            errors: Vec::new(),
        }
    }

    /// Peeks at the next character without consuming it.
    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    /// Consumes and returns the next character, updating position.
    fn next_char(&mut self) -> Option<char> {
        let c = self.chars.next();
        if let Some(ch) = c {
            self.position += ch.len_utf8();
        }
        c
    }

    /// Consumes the next character if it equals `expected`.
    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(&expected) {
            self.next_char();
            true
        } else {
            false
        }
    }

    /// Skips whitespace characters.
    fn skip_whitespace(&mut self) {
        while let Some(&c) = self.peek() {
            if c.is_whitespace() {
                self.next_char();
            } else {
                break;
            }
        }
    }

    /// Reads an identifier (letters, digits and underscores).
    fn read_identifier(&mut self) -> String {
        let mut ident = String::new();
        while let Some(&c) = self.peek() {
            if is_identifier_char(c) {
                ident.push(c);
                self.next_char();
            } else {
                break;
            }
        }
        ident
    }

    /// Reads `digits[.digits]`. A `.` not followed by a digit is left for the caller.
    fn read_number(&mut self) -> f64 {
        let mut text = String::new();
        while let Some(&c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.next_char();
            } else {
                break;
            }
        }

        if self.peek() == Some(&'.') {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if lookahead.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.next_char();
                text.push('.');
                while let Some(&c) = self.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.next_char();
                    } else {
                        break;
                    }
                }
            }
        }

        text.parse().unwrap_or(0.0)
    }

    /// Reads a quoted string (single or double quotes).
    ///
    /// Returns `None` if the closing quote is missing.
    fn read_quoted_string(&mut self, quote_char: char) -> Option<String> {
        // Consume the opening quote
        self.next_char();

        let mut result = String::new();
        while let Some(c) = self.next_char() {
            if c == quote_char {
                return Some(result);
            }
            if c == '\\' {
                match self.next_char()? {
                    'n' => result.push('\n'),
                    't' => result.push('\t'),
                    'r' => result.push('\r'),
                    other => result.push(other),
                }
            } else {
                result.push(c);
            }
        }
        None
    }

    /// Maps keyword spellings onto tokens. Logical and containment keywords
    /// are case-insensitive; `true`, `false` and `null` are not.
    fn keyword_or_identifier(ident: String) -> FilterToken {
        match ident.as_str() {
            "true" => return FilterToken::True,
            "false" => return FilterToken::False,
            "null" => return FilterToken::Null,
            _ => {}
        }
        match ident.to_lowercase().as_str() {
            "and" => FilterToken::And,
            "or" => FilterToken::Or,
            "not" => FilterToken::Not,
            "contains" => FilterToken::Contains,
            "startswith" => FilterToken::StartsWith,
            _ => FilterToken::Identifier(ident),
        }
    }

    /// Returns the next token with its position, or None if at end of input.
    ///
    /// Unknown characters are recorded as errors and skipped. An unterminated
    /// string is recorded and ends tokenization.
    pub fn next_token(&mut self) -> Option<PositionedToken> {
        self.skip_whitespace();

        let c = *self.peek()?;
        let token_start = self.position;

        let token = match c {
            '(' => {
                self.next_char();
                FilterToken::OpenParen
            }
            ')' => {
                self.next_char();
                FilterToken::CloseParen
            }
            ',' => {
                self.next_char();
                FilterToken::Comma
            }
            '.' => {
                self.next_char();
                FilterToken::Dot
            }
            '=' => {
                self.next_char();
                if !self.eat('=') {
                    self.errors.push(LexerError::UnexpectedCharacter {
                        character: '=',
                        position: token_start,
                    });
                    return self.next_token();
                }
                if self.eat('=') {
                    FilterToken::StrictEq
                } else {
                    FilterToken::Eq
                }
            }
            '!' => {
                self.next_char();
                if self.eat('=') {
                    if self.eat('=') {
                        FilterToken::StrictNotEq
                    } else {
                        FilterToken::NotEq
                    }
                } else {
                    FilterToken::Not
                }
            }
            '>' => {
                self.next_char();
                if self.eat('=') {
                    FilterToken::Gte
                } else {
                    FilterToken::Gt
                }
            }
            '<' => {
                self.next_char();
                if self.eat('=') {
                    FilterToken::Lte
                } else {
                    FilterToken::Lt
                }
            }
            '&' | '|' => {
                self.next_char();
                if !self.eat(c) {
                    self.errors.push(LexerError::UnexpectedCharacter {
                        character: c,
                        position: token_start,
                    });
                    return self.next_token();
                }
                if c == '&' {
                    FilterToken::And
                } else {
                    FilterToken::Or
                }
            }
            '"' | '\'' => match self.read_quoted_string(c) {
                Some(s) => FilterToken::String(s),
                None => {
                    self.errors.push(LexerError::UnterminatedString {
                        position: token_start,
                    });
                    return None;
                }
            },
            _ if c.is_ascii_digit() => FilterToken::Number(self.read_number()),
            _ if is_identifier_start(c) => {
                Self::keyword_or_identifier(self.read_identifier())
            }
            _ => {
                self.next_char();
                self.errors.push(LexerError::UnexpectedCharacter {
                    character: c,
                    position: token_start,
                });
                return self.next_token();
            }
        };

        Some(PositionedToken {
            token,
            position: token_start,
        })
    }

    /// Collects all tokens into a vector (without positions).
    #[cfg(test)]
    pub fn tokenize(self) -> Vec<FilterToken> {
        self.tokenize_with_errors()
            .tokens
            .into_iter()
            .map(|pt| pt.token)
            .collect()
    }

    /// Collects all tokens and any errors encountered.
    pub fn tokenize_with_errors(mut self) -> LexerResult {
        let mut tokens = Vec::new();
        while let Some(positioned_token) = self.next_token() {
            tokens.push(positioned_token);
        }
        LexerResult {
            tokens,
            errors: self.errors,
        }
    }
}
