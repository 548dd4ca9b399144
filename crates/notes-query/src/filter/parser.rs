//! Recursive descent parser for filter expressions.

use super::ast::{BinaryOperator, FilterExpr, Literal};
use super::lexer::{FilterToken, Lexer, PositionedToken};
use crate::error::{Language, ParseError, ParseResult, MAX_NESTING_DEPTH};

/// Parser for filter expressions.
///
/// # Grammar
///
/// ```text
/// expression ::= or_expr
/// or_expr    ::= and_expr (("OR" | "||") and_expr)*
/// and_expr   ::= not_expr (("AND" | "&&") not_expr)*
/// not_expr   ::= ("NOT" | "!") not_expr | comparison
/// comparison ::= postfix (comp_op postfix)*
/// postfix    ::= primary ("." identifier)*
/// primary    ::= literal | identifier | identifier "(" args? ")" | "(" expression ")"
/// args       ::= expression ("," expression)*
/// comp_op    ::= "==" | "!=" | "===" | "!==" | ">" | "<" | ">=" | "<="
///              | "contains" | "startsWith"
/// ```
///
/// # Operator Precedence (highest to lowest)
///
/// 1. `.` (property access)
/// 2. comparison operators, left-associative
/// 3. `NOT` / `!`, unary
/// 4. `AND` / `&&`, left-associative
/// 5. `OR` / `||`, left-associative
///
/// So `NOT a == b` reads as `NOT (a == b)`.
///
/// # Example
///
/// ```
/// use notes_query_rs::filter::{FilterExpr, FilterParser};
///
/// let expr = FilterParser::parse(r#"taggedWith(file, "work") AND NOT isEmpty(file)"#).unwrap();
/// assert!(matches!(expr, FilterExpr::BinaryOp { .. }));
/// ```
pub struct FilterParser {
    tokens: Vec<PositionedToken>,
    position: usize,
    input_len: usize,
    depth: usize,
}

impl FilterParser {
    /// Parses a filter expression string into a [`FilterExpr`].
    ///
    /// # Errors
    ///
    /// Returns `ParseError::EmptyExpression` if the input is blank.
    ///
    /// Returns `ParseError::UnexpectedCharacter` or `ParseError::UnterminatedString`
    /// for the first lexical problem.
    ///
    /// Returns `ParseError::UnexpectedToken`, `ParseError::UnexpectedEndOfInput`
    /// or `ParseError::UnclosedParenthesis` when the tokens do not form an expression.
    ///
    /// Returns `ParseError::TooDeeplyNested` past [`MAX_NESTING_DEPTH`] levels of
    /// groups, calls or `NOT`s.
    pub fn parse(input: &str) -> ParseResult<FilterExpr> {
        if input.trim().is_empty() {
            return Err(ParseError::EmptyExpression {
                language: Language::Filter,
            });
        }

        let lexed = Lexer::new(input).tokenize_with_errors();
        if let Some(err) = lexed.errors.into_iter().next() {
            return Err(err.into());
        }
        if lexed.tokens.is_empty() {
            return Err(ParseError::EmptyExpression {
                language: Language::Filter,
            });
        }

        let mut parser = Self {
            tokens: lexed.tokens,
            position: 0,
            input_len: input.len(),
            depth: 0,
        };
        let expr = parser.parse_expression()?;

        // Check that we consumed all tokens
        if let Some(remaining) = parser.peek_positioned() {
            return Err(parser.unexpected(remaining));
        }

        Ok(expr)
    }

    /// Returns the current token without consuming it.
    fn peek(&self) -> Option<&FilterToken> {
        self.tokens.get(self.position).map(|pt| &pt.token)
    }

    fn peek_positioned(&self) -> Option<&PositionedToken> {
        self.tokens.get(self.position)
    }

    /// Consumes and returns the current token.
    fn advance(&mut self) -> Option<PositionedToken> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// Checks if the current token matches the expected token type.
    fn check(&self, expected: &FilterToken) -> bool {
        self.peek() == Some(expected)
    }

    fn unexpected(&self, token: &PositionedToken) -> ParseError {
        ParseError::unexpected_token(Language::Filter, token.token.to_string(), token.position)
    }

    fn end_of_input(&self) -> ParseError {
        ParseError::UnexpectedEndOfInput {
            language: Language::Filter,
            position: self.input_len,
        }
    }

    /// Enters one nesting level opened at `position`.
    fn descend(&mut self, position: usize) -> ParseResult<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::TooDeeplyNested {
                language: Language::Filter,
                limit: MAX_NESTING_DEPTH,
                position,
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// Parses the top-level expression (OR expression).
    ///
    /// Every group and call argument comes back through here, so this is
    /// where nesting is counted.
    fn parse_expression(&mut self) -> ParseResult<FilterExpr> {
        let start = self
            .peek_positioned()
            .map_or(self.input_len, |pt| pt.position);
        self.descend(start)?;
        let expr = self.parse_or_expr()?;
        self.depth -= 1;
        Ok(expr)
    }

    /// Parses OR expressions: `and_expr (OR and_expr)*`
    fn parse_or_expr(&mut self) -> ParseResult<FilterExpr> {
        let mut left = self.parse_and_expr()?;

        while self.check(&FilterToken::Or) {
            self.advance();
            let right = self.parse_and_expr()?;
            left = FilterExpr::or(left, right);
        }

        Ok(left)
    }

    /// Parses AND expressions: `not_expr (AND not_expr)*`
    fn parse_and_expr(&mut self) -> ParseResult<FilterExpr> {
        let mut left = self.parse_not_expr()?;

        while self.check(&FilterToken::And) {
            self.advance();
            let right = self.parse_not_expr()?;
            left = FilterExpr::and(left, right);
        }

        Ok(left)
    }

    /// Parses unary expressions: `NOT not_expr | comparison`
    fn parse_not_expr(&mut self) -> ParseResult<FilterExpr> {
        if self.check(&FilterToken::Not) {
            let not = self.advance().map_or(self.input_len, |pt| pt.position);
            self.descend(not)?;
            let operand = self.parse_not_expr()?;
            self.depth -= 1;
            return Ok(FilterExpr::negate(operand));
        }

        self.parse_comparison()
    }

    /// Parses comparisons: `postfix (comp_op postfix)*`
    fn parse_comparison(&mut self) -> ParseResult<FilterExpr> {
        let mut left = self.parse_postfix()?;

        while let Some(operator) = self.peek().and_then(comparison_operator) {
            self.advance();
            let right = self.parse_postfix()?;
            left = FilterExpr::binary(operator, left, right);
        }

        Ok(left)
    }

    /// Parses property access chains: `primary ("." identifier)*`
    fn parse_postfix(&mut self) -> ParseResult<FilterExpr> {
        let mut expr = self.parse_primary()?;

        while self.check(&FilterToken::Dot) {
            self.advance();
            let token = self.advance().ok_or_else(|| self.end_of_input())?;
            match token.token {
                FilterToken::Identifier(property) => {
                    expr = FilterExpr::property(expr, property);
                }
                _ => return Err(self.unexpected(&token)),
            }
        }

        Ok(expr)
    }

    /// Parses primary expressions: literals, identifiers, calls and groups.
    fn parse_primary(&mut self) -> ParseResult<FilterExpr> {
        let token = self.advance().ok_or_else(|| self.end_of_input())?;

        match token.token {
            FilterToken::String(s) => Ok(FilterExpr::Literal(Literal::String(s))),
            FilterToken::Number(n) => Ok(FilterExpr::Literal(Literal::Number(n))),
            FilterToken::True => Ok(FilterExpr::Literal(Literal::Bool(true))),
            FilterToken::False => Ok(FilterExpr::Literal(Literal::Bool(false))),
            FilterToken::Null => Ok(FilterExpr::Literal(Literal::Null)),

            FilterToken::Identifier(name) => {
                if self.check(&FilterToken::OpenParen) {
                    let open = self.advance().map_or(token.position, |pt| pt.position);
                    let arguments = self.parse_arguments(open)?;
                    Ok(FilterExpr::call(name, arguments))
                } else {
                    Ok(FilterExpr::Identifier(name))
                }
            }

            FilterToken::OpenParen => {
                let inner = self.parse_expression()?;
                self.expect_close_paren(token.position)?;
                Ok(inner)
            }

            _ => Err(self.unexpected(&token)),
        }
    }

    /// Parses a call's argument list after its `(`.
    fn parse_arguments(&mut self, open: usize) -> ParseResult<Vec<FilterExpr>> {
        let mut arguments = Vec::new();

        if self.check(&FilterToken::CloseParen) {
            self.advance();
            return Ok(arguments);
        }

        loop {
            arguments.push(self.parse_expression()?);
            if self.check(&FilterToken::Comma) {
                self.advance();
                continue;
            }
            self.expect_close_paren(open)?;
            return Ok(arguments);
        }
    }

    /// Consumes a `)` matching the `(` at `open`.
    fn expect_close_paren(&mut self, open: usize) -> ParseResult<()> {
        let Some(pt) = self.peek_positioned() else {
            return Err(ParseError::UnclosedParenthesis {
                language: Language::Filter,
                position: open,
            });
        };
        if pt.token != FilterToken::CloseParen {
            return Err(self.unexpected(pt));
        }
        self.advance();
        Ok(())
    }
}

/// Maps a token onto a comparison operator, if it is one.
fn comparison_operator(token: &FilterToken) -> Option<BinaryOperator> {
    match token {
        FilterToken::Eq => Some(BinaryOperator::Eq),
        FilterToken::NotEq => Some(BinaryOperator::NotEq),
        FilterToken::StrictEq => Some(BinaryOperator::StrictEq),
        FilterToken::StrictNotEq => Some(BinaryOperator::StrictNotEq),
        FilterToken::Gt => Some(BinaryOperator::Gt),
        FilterToken::Lt => Some(BinaryOperator::Lt),
        FilterToken::Gte => Some(BinaryOperator::Gte),
        FilterToken::Lte => Some(BinaryOperator::Lte),
        FilterToken::Contains => Some(BinaryOperator::Contains),
        FilterToken::StartsWith => Some(BinaryOperator::StartsWith),
        _ => None,
    }
}
