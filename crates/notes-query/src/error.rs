//! Error types for parsing, evaluation, validation and registration.
//!
//! Callers see [`ParseError`] and [`ValidationError`] from query execution
//! (wrapped in [`QueryError`]). [`EvalError`]s raised while filtering one
//! record are turned into warnings by the executor; formula evaluation
//! surfaces them through [`FormulaError`].

use std::fmt;

use thiserror::Error;

use crate::lookups::format_unknown_function;

/// Deepest grouping, call or unary nesting either parser accepts.
pub const MAX_NESTING_DEPTH: usize = 128;

/// A specialized Result type for parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// A specialized Result type for evaluation.
pub type EvalResult<T> = Result<T, EvalError>;

/// A specialized Result type for query execution.
pub type ExecuteResult<T> = Result<T, QueryError>;

/// The expression language an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    /// The boolean filter language.
    Filter,
    /// The arithmetic/string formula language.
    Formula,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Filter => f.write_str("filter"),
            Language::Formula => f.write_str("formula"),
        }
    }
}

/// Malformed expression syntax. Positions are 0-indexed byte offsets.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The expression is empty.
    #[error("{language} expression is empty")]
    EmptyExpression {
        /// Source language.
        language: Language,
    },

    /// A token appeared where the grammar does not allow it.
    #[error("{language} parse error: unexpected token '{token}' at position {position}")]
    UnexpectedToken {
        /// Source language.
        language: Language,
        /// The offending token, as written.
        token: String,
        /// Where the token starts.
        position: usize,
    },

    /// The expression ended while more input was required.
    #[error("{language} parse error: unexpected end of expression at position {position}")]
    UnexpectedEndOfInput {
        /// Source language.
        language: Language,
        /// Length of the input.
        position: usize,
    },

    /// A `(` was never closed.
    #[error("{language} parse error: unclosed parenthesis opened at position {position}")]
    UnclosedParenthesis {
        /// Source language.
        language: Language,
        /// Where the `(` is.
        position: usize,
    },

    /// A quoted string was never closed.
    #[error("{language} parse error: unterminated string starting at position {position}")]
    UnterminatedString {
        /// Source language.
        language: Language,
        /// Where the opening quote is.
        position: usize,
    },

    /// A character that starts no token.
    #[error("{language} parse error: unexpected character '{character}' at position {position}")]
    UnexpectedCharacter {
        /// Source language.
        language: Language,
        /// The character.
        character: char,
        /// Where it is.
        position: usize,
    },

    /// Groups, calls or unary operators nest deeper than [`MAX_NESTING_DEPTH`].
    #[error("{language} parse error: expression nested more than {limit} levels deep at position {position}")]
    TooDeeplyNested {
        /// Source language.
        language: Language,
        /// The depth limit.
        limit: usize,
        /// Where the level beyond the limit opens.
        position: usize,
    },
}

impl ParseError {
    /// Creates an unexpected token error.
    pub fn unexpected_token(language: Language, token: impl Into<String>, position: usize) -> Self {
        ParseError::UnexpectedToken {
            language,
            token: token.into(),
            position,
        }
    }

    /// Returns the language the error came from.
    pub fn language(&self) -> Language {
        match self {
            ParseError::EmptyExpression { language }
            | ParseError::UnexpectedToken { language, .. }
            | ParseError::UnexpectedEndOfInput { language, .. }
            | ParseError::UnclosedParenthesis { language, .. }
            | ParseError::UnterminatedString { language, .. }
            | ParseError::UnexpectedCharacter { language, .. }
            | ParseError::TooDeeplyNested { language, .. } => *language,
        }
    }

    /// Returns the byte position of the problem, if there is one.
    pub fn position(&self) -> Option<usize> {
        match self {
            ParseError::EmptyExpression { .. } => None,
            ParseError::UnexpectedToken { position, .. }
            | ParseError::UnexpectedEndOfInput { position, .. }
            | ParseError::UnclosedParenthesis { position, .. }
            | ParseError::UnterminatedString { position, .. }
            | ParseError::UnexpectedCharacter { position, .. }
            | ParseError::TooDeeplyNested { position, .. } => Some(*position),
        }
    }

    /// Returns the offending token text, if there is one.
    pub fn token(&self) -> Option<String> {
        match self {
            ParseError::UnexpectedToken { token, .. } => Some(token.clone()),
            ParseError::UnexpectedCharacter { character, .. } => Some(character.to_string()),
            ParseError::UnclosedParenthesis { .. } => Some("(".to_string()),
            _ => None,
        }
    }
}

/// A failure while evaluating an expression.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvalError {
    /// No function is registered under the name.
    #[error("{}", format_unknown_function(name, suggestion.as_deref()))]
    UnknownFunction {
        /// The name that was called.
        name: String,
        /// A similarly named function, if any.
        suggestion: Option<String>,
    },

    /// A formula referenced a variable that is not bound.
    #[error("unknown variable: {name}")]
    UnknownVariable {
        /// The variable name.
        name: String,
    },

    /// A division's right operand was zero.
    #[error("division by zero")]
    DivisionByZero,

    /// A function received an argument it cannot work with.
    #[error("{function}: {message}")]
    InvalidArgument {
        /// The function name.
        function: String,
        /// What was wrong.
        message: String,
    },
}

impl EvalError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(function: impl Into<String>, message: impl Into<String>) -> Self {
        EvalError::InvalidArgument {
            function: function.into(),
            message: message.into(),
        }
    }
}

/// A malformed query configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The query was not a JSON object.
    #[error("query must be an object, got {found}")]
    NotAnObject {
        /// The JSON type that was supplied.
        found: String,
    },

    /// A field has an invalid value or type.
    #[error("invalid query field '{field}': {message}")]
    InvalidField {
        /// The field name (dotted for nested fields).
        field: String,
        /// What was wrong.
        message: String,
    },
}

impl ValidationError {
    /// Creates an invalid field error.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A rejected function registration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// The name belongs to a built-in and overriding was not allowed.
    #[error("'{name}' is a built-in function; pass allow_override to replace it")]
    BuiltinOverride {
        /// The built-in name.
        name: String,
    },

    /// The name is not a valid identifier.
    #[error("invalid function name '{name}': expected a letter or '_' followed by letters, digits or '_'")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// The name is a keyword or literal, which the lexers never read as a name.
    #[error("invalid function name '{name}': it is a reserved word")]
    ReservedWord {
        /// The rejected name.
        name: String,
    },
}

/// Errors surfaced by query execution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// The filter expression could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The query configuration is malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Errors surfaced by formula evaluation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormulaError {
    /// The formula could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The formula failed while evaluating.
    #[error(transparent)]
    Eval(#[from] EvalError),
}
