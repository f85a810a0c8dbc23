use std::fmt;

use serde::{Deserialize, Serialize};

use super::Value;

/// Comparison operators supported in rule conditions.
///
/// Deliberately smaller than a general expression language: the four rule
/// formats only ever compare for equality or strict ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Equals,
    Greater,
    Less,
}

impl CompareOp {
    /// The symbol used by the Insimul grammar (`==`, `>`, `<`).
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Equals => "==",
            CompareOp::Greater => ">",
            CompareOp::Less => "<",
        }
    }

    /// The symbol used by the Kismet grammar (`=`, `>`, `<`).
    #[must_use]
    pub fn kismet_symbol(self) -> &'static str {
        match self {
            CompareOp::Equals => "=",
            CompareOp::Greater => ">",
            CompareOp::Less => "<",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A single test in a rule's `when` clause.
///
/// Conditions are conjunctive and ordered; parsers and generators preserve
/// the sequence exactly as written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// A named boolean test over one or two operands, e.g. `friendly(X)`.
    Predicate {
        predicate: String,
        first: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        second: Option<String>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        negated: bool,
    },
    /// An operand compared against a literal, e.g. `age > 30`.
    Comparison {
        first: String,
        operator: CompareOp,
        value: Value,
    },
    /// A family-structure relation, e.g. `parent_of(X, Y)`.
    Genealogy {
        relation: String,
        first: String,
        second: String,
    },
}

impl Condition {
    /// Shorthand for a one-operand predicate.
    #[must_use]
    pub fn predicate(predicate: &str, first: &str) -> Self {
        Condition::Predicate {
            predicate: predicate.to_owned(),
            first: first.to_owned(),
            second: None,
            negated: false,
        }
    }

    /// Shorthand for a two-operand predicate.
    #[must_use]
    pub fn predicate2(predicate: &str, first: &str, second: &str) -> Self {
        Condition::Predicate {
            predicate: predicate.to_owned(),
            first: first.to_owned(),
            second: Some(second.to_owned()),
            negated: false,
        }
    }

    /// Negate a predicate condition. Comparison and genealogy conditions
    /// have no negated form in any of the formats and pass through as-is.
    #[must_use]
    pub fn negated(self) -> Self {
        match self {
            Condition::Predicate {
                predicate,
                first,
                second,
                ..
            } => Condition::Predicate {
                predicate,
                first,
                second,
                negated: true,
            },
            other => other,
        }
    }

    /// Shorthand for a comparison condition.
    #[must_use]
    pub fn comparison(first: &str, operator: CompareOp, value: impl Into<Value>) -> Self {
        Condition::Comparison {
            first: first.to_owned(),
            operator,
            value: value.into(),
        }
    }

    /// Shorthand for a genealogy condition.
    #[must_use]
    pub fn genealogy(relation: &str, first: &str, second: &str) -> Self {
        Condition::Genealogy {
            relation: relation.to_owned(),
            first: first.to_owned(),
            second: second.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicate_shorthand() {
        assert_eq!(
            Condition::predicate("friendly", "X"),
            Condition::Predicate {
                predicate: "friendly".to_owned(),
                first: "X".to_owned(),
                second: None,
                negated: false,
            }
        );
    }

    #[test]
    fn negated_predicate() {
        let cond = Condition::predicate("friendly", "X").negated();
        assert!(matches!(cond, Condition::Predicate { negated: true, .. }));
    }

    #[test]
    fn negated_is_noop_for_comparisons() {
        let cond = Condition::comparison("age", CompareOp::Greater, 30_i64).negated();
        assert!(matches!(cond, Condition::Comparison { .. }));
    }

    #[test]
    fn compare_op_symbols() {
        assert_eq!(CompareOp::Equals.symbol(), "==");
        assert_eq!(CompareOp::Greater.symbol(), ">");
        assert_eq!(CompareOp::Less.symbol(), "<");
        assert_eq!(CompareOp::Equals.kismet_symbol(), "=");
    }

    #[test]
    fn serde_tagging() {
        let cond = Condition::predicate2("parent_of", "X", "Y");
        let json = serde_json::to_value(&cond).unwrap();
        assert_eq!(json["type"], "predicate");
        assert_eq!(json["second"], "Y");
        // `negated: false` is omitted entirely
        assert!(json.get("negated").is_none());

        let back: Condition = serde_json::from_value(json).unwrap();
        assert_eq!(back, cond);
    }

    #[test]
    fn serde_genealogy_tag() {
        let cond = Condition::genealogy("parent_of", "X", "Y");
        let json = serde_json::to_value(&cond).unwrap();
        assert_eq!(json["type"], "genealogy");
        assert_eq!(json["relation"], "parent_of");
    }
}
