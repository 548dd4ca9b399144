//! Name → callable table shared by the filter and formula languages.
//!
//! Both languages dispatch function calls by name at evaluation time, so a
//! function registered after an expression was parsed is still found.
//!
//! One override policy applies to both registries: a built-in name can only
//! be replaced with [`RegisterOptions::allow_override`]; a custom name is
//! silently replaced by a later registration.

use std::collections::{HashMap, HashSet};

use crate::error::RegistrationError;
use crate::lookups::find_similar_name;

/// Options for registering a function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterOptions {
    /// Allow replacing a built-in function of the same name.
    pub allow_override: bool,
}

impl RegisterOptions {
    /// Options that permit replacing a built-in.
    pub fn allow_override() -> Self {
        Self {
            allow_override: true,
        }
    }
}

/// A table of named callables of type `F` (usually a `dyn Fn` trait object).
pub struct FunctionRegistry<F: ?Sized> {
    functions: HashMap<String, Box<F>>,
    builtins: HashSet<String>,
}

impl<F: ?Sized> Default for FunctionRegistry<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> std::fmt::Debug for FunctionRegistry<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

impl<F: ?Sized> FunctionRegistry<F> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
            builtins: HashSet::new(),
        }
    }

    /// Adds a built-in function. Built-ins are protected from silent overrides.
    pub(crate) fn insert_builtin(&mut self, name: &str, function: Box<F>) {
        self.builtins.insert(name.to_string());
        self.functions.insert(name.to_string(), function);
    }

    /// Registers a function under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::InvalidName`] if `name` is not an identifier,
    /// [`RegistrationError::BuiltinOverride`] if `name` is a built-in and
    /// `options.allow_override` is false, and [`RegistrationError::ReservedWord`]
    /// if a new name is a keyword such as `and` or `null`.
    pub fn register(
        &mut self,
        name: &str,
        function: Box<F>,
        options: RegisterOptions,
    ) -> Result<(), RegistrationError> {
        if !is_valid_name(name) {
            return Err(RegistrationError::InvalidName {
                name: name.to_string(),
            });
        }
        if self.builtins.contains(name) {
            if !options.allow_override {
                return Err(RegistrationError::BuiltinOverride {
                    name: name.to_string(),
                });
            }
        } else if is_reserved(name) {
            return Err(RegistrationError::ReservedWord {
                name: name.to_string(),
            });
        }
        self.functions.insert(name.to_string(), function);
        Ok(())
    }

    /// Looks up a function by exact name.
    pub fn get(&self, name: &str) -> Option<&F> {
        self.functions.get(name).map(|f| &**f)
    }

    /// Returns true if a function is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Returns true if `name` is one of the built-ins.
    pub fn is_builtin(&self, name: &str) -> bool {
        self.builtins.contains(name)
    }

    /// Returns all registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of registered functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Suggests a registered name close to `name`.
    pub fn suggest(&self, name: &str) -> Option<String> {
        find_similar_name(name, self.functions.keys().map(String::as_str))
    }
}

/// Words the lexers turn into operators or literals. `true`, `false` and
/// `null` are matched exactly; the rest in any case.
const RESERVED_WORDS: [&str; 8] = [
    "and",
    "or",
    "not",
    "contains",
    "startswith",
    "true",
    "false",
    "null",
];

/// Returns true if `c` can start an identifier in either language.
pub(crate) fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

/// Returns true if `c` can continue an identifier in either language.
pub(crate) fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Returns true if `name` lexes as a keyword rather than an identifier.
///
/// Both registries reject these so a function registered for one language
/// never becomes uncallable in the other.
fn is_reserved(name: &str) -> bool {
    let lowered = name.to_lowercase();
    RESERVED_WORDS.contains(&lowered.as_str())
}

/// Returns true if `name` lexes as a single identifier.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_identifier_start) && chars.all(is_identifier_char)
}
