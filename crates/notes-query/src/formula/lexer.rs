//! Lexer for formula expressions.
//!
//! Unlike the filter lexer this one stops at the first bad character: the
//! formula grammar has no boolean operators, so `&`, `|`, `!`, `=`, `<` and
//! `>` are reported immediately with their position.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use notes_model_rs::value::format_number;

use crate::error::{Language, ParseError, ParseResult};
use crate::registry::{is_identifier_char, is_identifier_start};

/// A token in a formula expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaToken {
    /// An unsigned decimal number.
    Number(f64),
    /// A quoted string with escapes resolved.
    String(String),
    /// A variable, function or literal-keyword name.
    Identifier(String),
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// `,`
    Comma,
    /// `.`
    Dot,
}

impl fmt::Display for FormulaToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaToken::Number(n) => f.write_str(&format_number(*n)),
            FormulaToken::String(s) => write!(f, "\"{}\"", s),
            FormulaToken::Identifier(name) => f.write_str(name),
            FormulaToken::Plus => f.write_str("+"),
            FormulaToken::Minus => f.write_str("-"),
            FormulaToken::Star => f.write_str("*"),
            FormulaToken::Slash => f.write_str("/"),
            FormulaToken::OpenParen => f.write_str("("),
            FormulaToken::CloseParen => f.write_str(")"),
            FormulaToken::Comma => f.write_str(","),
            FormulaToken::Dot => f.write_str("."),
        }
    }
}

/// A token with the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    /// The token.
    pub token: FormulaToken,
    /// 0-indexed byte offset.
    pub position: usize,
}

/// Tokenizes a formula expression.
///
/// # Errors
///
/// Returns `ParseError::UnexpectedCharacter` for any character that starts no
/// token and `ParseError::UnterminatedString` for a string without its
/// closing quote.
pub fn tokenize(input: &str) -> ParseResult<Vec<Spanned>> {
    let mut lexer = FormulaLexer {
        chars: input.chars().peekable(),
        position: 0,
    };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

struct FormulaLexer<'a> {
    chars: Peekable<Chars<'a>>,
    position: usize,
}

impl FormulaLexer<'_> {
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.position += c.len_utf8();
        Some(c)
    }

    fn next_token(&mut self) -> ParseResult<Option<Spanned>> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }

        let Some(c) = self.peek() else {
            return Ok(None);
        };
        let start = self.position;

        let token = match c {
            '+' | '-' | '*' | '/' | '(' | ')' | ',' | '.' => {
                self.bump();
                match c {
                    '+' => FormulaToken::Plus,
                    '-' => FormulaToken::Minus,
                    '*' => FormulaToken::Star,
                    '/' => FormulaToken::Slash,
                    '(' => FormulaToken::OpenParen,
                    ')' => FormulaToken::CloseParen,
                    ',' => FormulaToken::Comma,
                    _ => FormulaToken::Dot,
                }
            }
            '"' | '\'' => FormulaToken::String(self.read_string(c, start)?),
            _ if c.is_ascii_digit() => FormulaToken::Number(self.read_number()),
            _ if is_identifier_start(c) => {
                let mut ident = String::new();
                while let Some(ch) = self.peek() {
                    if is_identifier_char(ch) {
                        ident.push(ch);
                        self.bump();
                    } else {
                        break;
                    }
                }
                FormulaToken::Identifier(ident)
            }
            other => {
                return Err(ParseError::UnexpectedCharacter {
                    language: Language::Formula,
                    character: other,
                    position: start,
                })
            }
        };

        Ok(Some(Spanned {
            token,
            position: start,
        }))
    }

    fn read_number(&mut self) -> f64 {
        let mut text = String::new();
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            text.push(c);
            self.bump();
        }
        if self.peek() == Some('.') {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if lookahead.peek().is_some_and(char::is_ascii_digit) {
                self.bump();
                text.push('.');
                while let Some(c) = self.peek().filter(char::is_ascii_digit) {
                    text.push(c);
                    self.bump();
                }
            }
        }
        text.parse().unwrap_or(0.0)
    }

    fn read_string(&mut self, quote: char, start: usize) -> ParseResult<String> {
        let unterminated = || ParseError::UnterminatedString {
            language: Language::Formula,
            position: start,
        };

        self.bump();
        let mut out = String::new();
        loop {
            let c = self.bump().ok_or_else(unterminated)?;
            if c == quote {
                return Ok(out);
            }
            if c != '\\' {
                out.push(c);
                continue;
            }
            match self.bump().ok_or_else(unterminated)? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                other => out.push(other),
            }
        }
    }
}
