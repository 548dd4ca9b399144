//! Description of the syntax an engine accepts.

use serde::Serialize;

use crate::config::EngineConfig;
use crate::filter::{BinaryOperator, FilterRegistry, UnaryOperator};
use crate::formula::{ArithmeticOperator, FormulaRegistry};

/// Operators, functions and features available for building queries.
///
/// Function lists are sorted and include custom registrations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// Operator spellings, filter operators first.
    pub operators: Vec<String>,
    /// Functions callable from filters.
    pub filter_functions: Vec<String>,
    /// Functions callable from formulas.
    pub formula_functions: Vec<String>,
    /// Enabled engine features.
    pub features: Vec<String>,
}

impl Capabilities {
    pub(crate) fn describe(
        filters: &FilterRegistry,
        formulas: &FormulaRegistry,
        config: &EngineConfig,
    ) -> Self {
        let mut operators: Vec<String> = BinaryOperator::ALL
            .iter()
            .map(|op| op.symbol().to_string())
            .collect();
        operators.extend(["&&", "||", "!"].map(String::from));
        operators.push(UnaryOperator::Not.symbol().to_string());
        for op in ArithmeticOperator::ALL {
            if !operators.iter().any(|known| known == op.symbol()) {
                operators.push(op.symbol().to_string());
            }
        }

        let mut features: Vec<String> = [
            "filter",
            "formula",
            "sort",
            "groupBy",
            "pagination",
            "customFunctions",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        if config.enable_cache {
            features.push("cache".to_string());
        }
        if config.enable_optimization {
            features.push("optimization".to_string());
        }

        Self {
            operators,
            filter_functions: filters.names(),
            formula_functions: formulas.names(),
            features,
        }
    }

    /// Returns true if `name` is a filter or formula function.
    pub fn has_function(&self, name: &str) -> bool {
        self.filter_functions.iter().any(|f| f == name)
            || self.formula_functions.iter().any(|f| f == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn describe(config: &EngineConfig) -> Capabilities {
        Capabilities::describe(
            &FilterRegistry::with_builtins(),
            &FormulaRegistry::with_builtins(),
            config,
        )
    }

    #[test]
    fn test_lists_operators_once() {
        let caps = describe(&EngineConfig::default());
        for op in ["==", "!==", "contains", "startsWith", "AND", "NOT", "&&", "+", "/"] {
            assert_eq!(
                caps.operators.iter().filter(|o| o.as_str() == op).count(),
                1,
                "operator {}",
                op
            );
        }
    }

    #[test]
    fn test_function_lists_are_sorted() {
        let caps = describe(&EngineConfig::default());
        assert_eq!(caps.filter_functions.len(), 20);
        let mut sorted = caps.formula_functions.clone();
        sorted.sort();
        assert_eq!(caps.formula_functions, sorted);
        assert!(caps.has_function("taggedWith"));
        assert!(caps.has_function("daysBetween"));
        assert!(!caps.has_function("nope"));
    }

    #[test]
    fn test_features_follow_config() {
        let config = EngineConfig {
            enable_cache: false,
            ..EngineConfig::default()
        };
        let caps = describe(&config);
        assert!(!caps.features.contains(&"cache".to_string()));
        assert!(caps.features.contains(&"optimization".to_string()));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(describe(&EngineConfig::default())).unwrap();
        assert!(json["filterFunctions"].is_array());
        assert!(json["formulaFunctions"].is_array());
    }
}
