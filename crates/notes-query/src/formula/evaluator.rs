//! Formula evaluation.

use std::collections::BTreeMap;

use notes_model_rs::value::Value;
use tracing::debug;

use super::ast::{ArithmeticOperator, FormulaExpr, UnaryArithmetic};
use super::builtins::{FormulaFn, FormulaRegistry};
use super::parser::FormulaParser;
use crate::error::{EvalError, EvalResult, FormulaError, ParseResult, RegistrationError};
use crate::registry::RegisterOptions;

/// Parses and evaluates formula expressions.
///
/// The engine owns its function table; custom functions registered on it
/// are visible to every later evaluation.
#[derive(Debug)]
pub struct FormulaEngine {
    functions: FormulaRegistry,
}

impl Default for FormulaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FormulaEngine {
    /// Creates an engine with every built-in function registered.
    pub fn new() -> Self {
        Self {
            functions: FormulaRegistry::with_builtins(),
        }
    }

    /// Parses a formula without evaluating it.
    pub fn parse(&self, input: &str) -> ParseResult<FormulaExpr> {
        FormulaParser::parse(input)
    }

    /// Parses and evaluates `input` against `variables`.
    ///
    /// # Errors
    ///
    /// Returns [`FormulaError::Parse`] for malformed input and
    /// [`FormulaError::Eval`] for unknown names, bad arguments or division by zero.
    pub fn evaluate(&self, input: &str, variables: &BTreeMap<String, Value>) -> Result<Value, FormulaError> {
        self.evaluate_with_this(input, &Value::Null, variables)
    }

    /// Like [`evaluate`](Self::evaluate), with `this` bound to a record or object.
    ///
    /// Bare names resolve to `this` itself, then to `variables`, then to keys of `this`.
    pub fn evaluate_with_this(
        &self,
        input: &str,
        this: &Value,
        variables: &BTreeMap<String, Value>,
    ) -> Result<Value, FormulaError> {
        let expr = self.parse(input)?;
        let scope = Scope { this, variables };
        let value = self.evaluate_expr(&expr, &scope)?;
        debug!(formula = input, result = %value, "Evaluated formula");
        Ok(value)
    }

    /// Evaluates an already parsed expression.
    pub fn evaluate_expr(&self, expr: &FormulaExpr, scope: &Scope<'_>) -> EvalResult<Value> {
        match expr {
            FormulaExpr::Literal(literal) => Ok(literal.to_value()),
            FormulaExpr::Identifier(name) => scope.lookup(name).ok_or_else(|| EvalError::UnknownVariable {
                name: name.clone(),
            }),
            FormulaExpr::PropertyAccess { object, property } => {
                // An unknown root yields Null so that optional paths stay usable.
                let base = match object.as_ref() {
                    FormulaExpr::Identifier(name) => scope.lookup(name).unwrap_or(Value::Null),
                    other => self.evaluate_expr(other, scope)?,
                };
                Ok(base.get_property(property))
            }
            FormulaExpr::FunctionCall { name, arguments } => {
                let Some(function) = self.functions.get(name) else {
                    return Err(EvalError::UnknownFunction {
                        name: name.clone(),
                        suggestion: self.functions.suggest(name),
                    });
                };
                let values = arguments
                    .iter()
                    .map(|arg| self.evaluate_expr(arg, scope))
                    .collect::<EvalResult<Vec<_>>>()?;
                function(&values)
            }
            FormulaExpr::UnaryOp { operator, operand } => {
                let value = self.evaluate_expr(operand, scope)?;
                match operator {
                    UnaryArithmetic::Negate => Ok(Value::Number(-value.to_number_or_zero())),
                }
            }
            FormulaExpr::BinaryOp {
                operator,
                left,
                right,
            } => {
                let left = self.evaluate_expr(left, scope)?;
                let right = self.evaluate_expr(right, scope)?;
                apply_arithmetic(*operator, &left, &right)
            }
        }
    }

    /// Registers a custom formula function.
    ///
    /// # Errors
    ///
    /// See [`FunctionRegistry::register`](crate::registry::FunctionRegistry::register).
    pub fn register_function(
        &mut self,
        name: &str,
        function: Box<FormulaFn>,
        options: RegisterOptions,
    ) -> Result<(), RegistrationError> {
        self.functions.register(name, function, options)?;
        debug!(name, "Registered formula function");
        Ok(())
    }

    /// Names of every callable function, sorted.
    pub fn function_names(&self) -> Vec<String> {
        self.functions.names()
    }

    /// The underlying function table.
    pub fn functions(&self) -> &FormulaRegistry {
        &self.functions
    }
}

/// Names visible to a formula during evaluation.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    this: &'a Value,
    variables: &'a BTreeMap<String, Value>,
}

impl<'a> Scope<'a> {
    /// Creates a scope with `this` bound to the given value.
    pub fn new(this: &'a Value, variables: &'a BTreeMap<String, Value>) -> Self {
        Self { this, variables }
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        if name == "this" {
            return Some(self.this.clone());
        }
        self.variables
            .get(name)
            .or_else(|| self.this.get(name))
            .cloned()
    }
}

/// `+` concatenates when either side is text; every other case is numeric.
fn apply_arithmetic(operator: ArithmeticOperator, left: &Value, right: &Value) -> EvalResult<Value> {
    if operator == ArithmeticOperator::Add
        && (matches!(left, Value::Text(_)) || matches!(right, Value::Text(_)))
    {
        return Ok(Value::Text(format!("{}{}", left.to_text(), right.to_text())));
    }

    let a = left.to_number_or_zero();
    let b = right.to_number_or_zero();
    let result = match operator {
        ArithmeticOperator::Add => a + b,
        ArithmeticOperator::Subtract => a - b,
        ArithmeticOperator::Multiply => a * b,
        ArithmeticOperator::Divide => {
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            a / b
        }
    };
    Ok(Value::Number(result))
}
