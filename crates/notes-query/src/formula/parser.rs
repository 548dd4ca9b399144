//! Precedence-climbing parser for formula expressions.

use super::ast::{ArithmeticOperator, FormulaExpr, Literal};
use super::lexer::{tokenize, FormulaToken, Spanned};
use crate::error::{Language, ParseError, ParseResult, MAX_NESTING_DEPTH};

/// Parser for formula expressions.
///
/// # Grammar
///
/// ```text
/// expression ::= unary (binop unary)*        (precedence climbing)
/// binop      ::= "+" | "-"                    (precedence 1)
///              | "*" | "/"                    (precedence 2)
/// unary      ::= "-" unary | postfix
/// postfix    ::= primary ("." identifier)*
/// primary    ::= number | string | "true" | "false" | "null"
///              | identifier | identifier "(" args? ")" | "(" expression ")"
/// ```
///
/// All binary operators are left-associative. Groups, calls and unary
/// minus may nest at most [`MAX_NESTING_DEPTH`] levels.
pub struct FormulaParser {
    tokens: Vec<Spanned>,
    position: usize,
    input_len: usize,
    depth: usize,
}

impl FormulaParser {
    /// Parses a formula expression.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] tagged [`Language::Formula`] naming the
    /// offending token and its position.
    pub fn parse(input: &str) -> ParseResult<FormulaExpr> {
        if input.trim().is_empty() {
            return Err(ParseError::EmptyExpression {
                language: Language::Formula,
            });
        }

        let mut parser = Self {
            tokens: tokenize(input)?,
            position: 0,
            input_len: input.len(),
            depth: 0,
        };
        let expr = parser.parse_expression(1)?;

        if let Some(extra) = parser.tokens.get(parser.position) {
            return Err(unexpected(extra));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&FormulaToken> {
        self.tokens.get(self.position).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn end_of_input(&self) -> ParseError {
        ParseError::UnexpectedEndOfInput {
            language: Language::Formula,
            position: self.input_len,
        }
    }

    fn descend(&mut self, position: usize) -> ParseResult<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::TooDeeplyNested {
                language: Language::Formula,
                limit: MAX_NESTING_DEPTH,
                position,
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// Parses operators binding at least as tightly as `min_precedence`.
    fn parse_expression(&mut self, min_precedence: u8) -> ParseResult<FormulaExpr> {
        let mut left = self.parse_unary()?;

        while let Some(operator) = self.peek().and_then(binary_operator) {
            let precedence = operator.precedence();
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let right = self.parse_expression(precedence + 1)?;
            left = FormulaExpr::binary(operator, left, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<FormulaExpr> {
        if self.peek() == Some(&FormulaToken::Minus) {
            let minus = self.advance().map_or(self.input_len, |s| s.position);
            self.descend(minus)?;
            let operand = self.parse_unary()?;
            self.depth -= 1;
            return Ok(FormulaExpr::negate(operand));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> ParseResult<FormulaExpr> {
        let mut expr = self.parse_primary()?;
        while self.peek() == Some(&FormulaToken::Dot) {
            self.advance();
            let token = self.advance().ok_or_else(|| self.end_of_input())?;
            let property = match token.token {
                FormulaToken::Identifier(property) => property,
                _ => return Err(unexpected(&token)),
            };
            expr = FormulaExpr::PropertyAccess {
                object: Box::new(expr),
                property,
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> ParseResult<FormulaExpr> {
        let token = self.advance().ok_or_else(|| self.end_of_input())?;

        match token.token {
            FormulaToken::Number(n) => Ok(FormulaExpr::Literal(Literal::Number(n))),
            FormulaToken::String(s) => Ok(FormulaExpr::Literal(Literal::String(s))),
            FormulaToken::Identifier(name) => {
                if let Some(literal) = keyword_literal(&name) {
                    return Ok(FormulaExpr::Literal(literal));
                }
                if self.peek() == Some(&FormulaToken::OpenParen) {
                    let open = self.advance().map_or(token.position, |s| s.position);
                    self.descend(open)?;
                    let arguments = self.parse_arguments(open)?;
                    self.depth -= 1;
                    return Ok(FormulaExpr::FunctionCall { name, arguments });
                }
                Ok(FormulaExpr::Identifier(name))
            }
            FormulaToken::OpenParen => {
                self.descend(token.position)?;
                let inner = self.parse_expression(1)?;
                self.expect_close(token.position)?;
                self.depth -= 1;
                Ok(inner)
            }
            _ => Err(unexpected(&token)),
        }
    }

    fn parse_arguments(&mut self, open: usize) -> ParseResult<Vec<FormulaExpr>> {
        let mut arguments = Vec::new();
        if self.peek() == Some(&FormulaToken::CloseParen) {
            self.advance();
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_expression(1)?);
            if self.peek() == Some(&FormulaToken::Comma) {
                self.advance();
            } else {
                self.expect_close(open)?;
                return Ok(arguments);
            }
        }
    }

    fn expect_close(&mut self, open: usize) -> ParseResult<()> {
        match self.advance() {
            Some(Spanned {
                token: FormulaToken::CloseParen,
                ..
            }) => Ok(()),
            Some(other) => Err(unexpected(&other)),
            None => Err(ParseError::UnclosedParenthesis {
                language: Language::Formula,
                position: open,
            }),
        }
    }
}

fn unexpected(token: &Spanned) -> ParseError {
    ParseError::unexpected_token(Language::Formula, token.token.to_string(), token.position)
}

fn keyword_literal(name: &str) -> Option<Literal> {
    match name {
        "true" => Some(Literal::Bool(true)),
        "false" => Some(Literal::Bool(false)),
        "null" => Some(Literal::Null),
        _ => None,
    }
}

fn binary_operator(token: &FormulaToken) -> Option<ArithmeticOperator> {
    match token {
        FormulaToken::Plus => Some(ArithmeticOperator::Add),
        FormulaToken::Minus => Some(ArithmeticOperator::Subtract),
        FormulaToken::Star => Some(ArithmeticOperator::Multiply),
        FormulaToken::Slash => Some(ArithmeticOperator::Divide),
        _ => None,
    }
}
