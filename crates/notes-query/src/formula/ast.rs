//! Syntax tree for formula expressions.

use std::fmt;

pub use crate::literal::Literal;

/// The four arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOperator {
    /// `+`, addition or concatenation
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
}

impl ArithmeticOperator {
    /// All operators, as listed by capabilities.
    pub const ALL: [ArithmeticOperator; 4] = [
        ArithmeticOperator::Add,
        ArithmeticOperator::Subtract,
        ArithmeticOperator::Multiply,
        ArithmeticOperator::Divide,
    ];

    /// Binding power used by precedence climbing. Higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            ArithmeticOperator::Add | ArithmeticOperator::Subtract => 1,
            ArithmeticOperator::Multiply | ArithmeticOperator::Divide => 2,
        }
    }

    /// Source spelling.
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOperator::Add => "+",
            ArithmeticOperator::Subtract => "-",
            ArithmeticOperator::Multiply => "*",
            ArithmeticOperator::Divide => "/",
        }
    }
}

impl fmt::Display for ArithmeticOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The only unary formula operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryArithmetic {
    /// `-x`
    Negate,
}

/// A parsed formula expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    /// `left operator right`
    BinaryOp {
        /// The operator.
        operator: ArithmeticOperator,
        /// Left operand.
        left: Box<FormulaExpr>,
        /// Right operand.
        right: Box<FormulaExpr>,
    },
    /// `-operand`
    UnaryOp {
        /// The operator.
        operator: UnaryArithmetic,
        /// The operand.
        operand: Box<FormulaExpr>,
    },
    /// `name(arguments...)`
    FunctionCall {
        /// The function name.
        name: String,
        /// Argument expressions.
        arguments: Vec<FormulaExpr>,
    },
    /// A variable reference.
    Identifier(String),
    /// A literal value.
    Literal(Literal),
    /// `object.property`
    PropertyAccess {
        /// The expression being accessed.
        object: Box<FormulaExpr>,
        /// The property name.
        property: String,
    },
}

impl FormulaExpr {
    pub(crate) fn binary(operator: ArithmeticOperator, left: FormulaExpr, right: FormulaExpr) -> Self {
        FormulaExpr::BinaryOp {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub(crate) fn negate(operand: FormulaExpr) -> Self {
        FormulaExpr::UnaryOp {
            operator: UnaryArithmetic::Negate,
            operand: Box::new(operand),
        }
    }
}

impl fmt::Display for FormulaExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaExpr::BinaryOp {
                operator,
                left,
                right,
            } => write!(f, "({} {} {})", left, operator, right),
            FormulaExpr::UnaryOp { operand, .. } => write!(f, "(-{})", operand),
            FormulaExpr::FunctionCall { name, arguments } => {
                write!(f, "{}(", name)?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", argument)?;
                }
                f.write_str(")")
            }
            FormulaExpr::Identifier(name) => f.write_str(name),
            FormulaExpr::Literal(literal) => write!(f, "{}", literal),
            FormulaExpr::PropertyAccess { object, property } => write!(f, "{}.{}", object, property),
        }
    }
}
