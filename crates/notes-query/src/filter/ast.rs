//! Abstract Syntax Tree (AST) for filter expressions.

use std::fmt;

use serde::{Serialize, Serializer};

pub use crate::literal::Literal;

/// Binary operators of the filter language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    /// `==`, loose equality.
    Eq,
    /// `!=`, loose inequality.
    NotEq,
    /// `===`, strict equality.
    StrictEq,
    /// `!==`, strict inequality.
    StrictNotEq,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Gte,
    /// `<=`
    Lte,
    /// `contains`, case-insensitive substring or list membership.
    Contains,
    /// `startsWith`, case-insensitive prefix.
    StartsWith,
    /// `AND` / `&&`
    And,
    /// `OR` / `||`
    Or,
}

impl BinaryOperator {
    /// All operators, in the order they are listed by capabilities.
    pub const ALL: [BinaryOperator; 12] = [
        BinaryOperator::Eq,
        BinaryOperator::NotEq,
        BinaryOperator::StrictEq,
        BinaryOperator::StrictNotEq,
        BinaryOperator::Gt,
        BinaryOperator::Lt,
        BinaryOperator::Gte,
        BinaryOperator::Lte,
        BinaryOperator::Contains,
        BinaryOperator::StartsWith,
        BinaryOperator::And,
        BinaryOperator::Or,
    ];

    /// Returns the canonical source spelling.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "==",
            BinaryOperator::NotEq => "!=",
            BinaryOperator::StrictEq => "===",
            BinaryOperator::StrictNotEq => "!==",
            BinaryOperator::Gt => ">",
            BinaryOperator::Lt => "<",
            BinaryOperator::Gte => ">=",
            BinaryOperator::Lte => "<=",
            BinaryOperator::Contains => "contains",
            BinaryOperator::StartsWith => "startsWith",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        }
    }

    /// Returns true for the comparison and containment operators.
    pub fn is_comparison(&self) -> bool {
        !self.is_logical()
    }

    /// Returns true for `AND` and `OR`.
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Serialize for BinaryOperator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

/// Unary operators of the filter language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// `NOT` / `!`
    Not,
}

impl UnaryOperator {
    /// Returns the canonical source spelling.
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Not => "NOT",
        }
    }
}

/// Represents a parsed filter expression.
///
/// Every operator is one of the closed [`BinaryOperator`] / [`UnaryOperator`]
/// sets, so an AST can never carry an operator the evaluator does not know.
///
/// `Display` renders a canonical, fully parenthesized form that parses back
/// to an equal tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// `left operator right`
    BinaryOp {
        /// The operator.
        operator: BinaryOperator,
        /// Left operand.
        left: Box<FilterExpr>,
        /// Right operand.
        right: Box<FilterExpr>,
    },

    /// `operator operand`
    UnaryOp {
        /// The operator.
        operator: UnaryOperator,
        /// The operand.
        operand: Box<FilterExpr>,
    },

    /// `name(arguments...)`
    FunctionCall {
        /// The function name, resolved at evaluation time.
        name: String,
        /// Argument expressions.
        arguments: Vec<FilterExpr>,
    },

    /// A bare name.
    Identifier(String),

    /// A literal value.
    Literal(Literal),

    /// `object.property`
    PropertyAccess {
        /// The expression being accessed.
        object: Box<FilterExpr>,
        /// The property name.
        property: String,
    },
}

impl FilterExpr {
    /// Creates a binary expression.
    pub fn binary(operator: BinaryOperator, left: FilterExpr, right: FilterExpr) -> Self {
        FilterExpr::BinaryOp {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Creates an AND expression from two expressions.
    ///
    /// # Example
    ///
    /// ```
    /// use notes_query_rs::filter::FilterExpr;
    ///
    /// let expr = FilterExpr::and(FilterExpr::ident("a"), FilterExpr::ident("b"));
    /// assert_eq!(expr.to_string(), "(a AND b)");
    /// ```
    pub fn and(left: FilterExpr, right: FilterExpr) -> Self {
        Self::binary(BinaryOperator::And, left, right)
    }

    /// Creates an OR expression from two expressions.
    pub fn or(left: FilterExpr, right: FilterExpr) -> Self {
        Self::binary(BinaryOperator::Or, left, right)
    }

    /// Creates a NOT expression.
    pub fn negate(operand: FilterExpr) -> Self {
        FilterExpr::UnaryOp {
            operator: UnaryOperator::Not,
            operand: Box::new(operand),
        }
    }

    /// Creates a function call.
    pub fn call(name: impl Into<String>, arguments: Vec<FilterExpr>) -> Self {
        FilterExpr::FunctionCall {
            name: name.into(),
            arguments,
        }
    }

    /// Creates an identifier.
    pub fn ident(name: impl Into<String>) -> Self {
        FilterExpr::Identifier(name.into())
    }

    /// Creates a string literal.
    pub fn string(value: impl Into<String>) -> Self {
        FilterExpr::Literal(Literal::String(value.into()))
    }

    /// Creates a number literal.
    pub fn number(value: f64) -> Self {
        FilterExpr::Literal(Literal::Number(value))
    }

    /// Creates a property access.
    pub fn property(object: FilterExpr, property: impl Into<String>) -> Self {
        FilterExpr::PropertyAccess {
            object: Box::new(object),
            property: property.into(),
        }
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpr::BinaryOp {
                operator,
                left,
                right,
            } => write!(f, "({} {} {})", left, operator, right),
            FilterExpr::UnaryOp { operator, operand } => {
                write!(f, "({} {})", operator.symbol(), operand)
            }
            FilterExpr::FunctionCall { name, arguments } => {
                write!(f, "{}(", name)?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", argument)?;
                }
                f.write_str(")")
            }
            FilterExpr::Identifier(name) => f.write_str(name),
            FilterExpr::Literal(literal) => write!(f, "{}", literal),
            FilterExpr::PropertyAccess { object, property } => {
                write!(f, "{}.{}", object, property)
            }
        }
    }
}
