//! Mapping between canonical condition/effect shapes and the flat
//! category/type clause records used by the Ensemble schema.
//!
//! Ensemble expresses every condition and effect as a record of optional
//! slots (`category`, `type`, `first`, `second`, `value`, `operator`,
//! `negated`). Folding turns such a record into a canonical [`Condition`] or
//! [`Effect`]; unfolding is the inverse. Both directions are pure functions
//! with no format I/O, so the generator cannot drift from the parser.

use crate::types::{CompareOp, Condition, Effect, Parameters, Value};

/// A flat category/type clause as it appears in an Ensemble document.
///
/// All slots optional; folding decides which shape the record is by which
/// slots are present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clause {
    pub category: Option<String>,
    pub kind: Option<String>,
    pub first: Option<String>,
    pub second: Option<String>,
    pub value: Option<Value>,
    pub operator: Option<String>,
    pub negated: bool,
}

/// Category reserved for genealogy relations.
const GENEALOGY: &str = "genealogy";

/// Category whose predicates fold to the bare type name: a `trait`
/// condition *is* the trait test, so `trait`/`friendly` becomes
/// `friendly(X)` rather than `trait_friendly(X)`.
const TRAIT: &str = "trait";

/// Map an operator symbol or word onto a canonical [`CompareOp`].
#[must_use]
pub fn parse_operator(symbol: &str) -> Option<CompareOp> {
    match symbol {
        "=" | "==" | "equals" => Some(CompareOp::Equals),
        ">" | "greaterThan" => Some(CompareOp::Greater),
        "<" | "lessThan" => Some(CompareOp::Less),
        _ => None,
    }
}

/// The symbol emitted for a canonical operator in Ensemble documents.
#[must_use]
pub fn operator_symbol(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Equals => "==",
        CompareOp::Greater => ">",
        CompareOp::Less => "<",
    }
}

/// Join a category and type into a canonical predicate name.
///
/// The `trait` category folds to the bare type; everything else joins with
/// an underscore (`relationship` + `improve` -> `relationship_improve`).
#[must_use]
pub fn join_predicate(category: Option<&str>, kind: &str) -> String {
    match category {
        None => kind.to_owned(),
        Some(TRAIT) => kind.to_owned(),
        Some(cat) => format!("{cat}_{kind}"),
    }
}

/// Split a canonical predicate name back into (category, type).
///
/// Inverse of [`join_predicate`] up to the documented ambiguity: a bare
/// trait name containing an underscore splits as if it were categorized.
#[must_use]
pub fn split_predicate(predicate: &str) -> (String, String) {
    match predicate.split_once('_') {
        Some((category, kind)) if !category.is_empty() && !kind.is_empty() => {
            (category.to_owned(), kind.to_owned())
        }
        _ => (TRAIT.to_owned(), predicate.to_owned()),
    }
}

/// Fold a flat clause into a canonical condition.
///
/// Shape selection: an `operator` slot means a comparison; the `genealogy`
/// category means a genealogy relation; anything else is a predicate.
///
/// # Errors
///
/// Returns a human-readable reason when required slots are missing.
pub fn fold_condition(clause: &Clause) -> Result<Condition, String> {
    if let Some(op_symbol) = clause.operator.as_deref() {
        let operator =
            parse_operator(op_symbol).ok_or_else(|| format!("unknown operator '{op_symbol}'"))?;
        let first = clause
            .first
            .clone()
            .ok_or("comparison condition missing 'first'")?;
        let value = clause
            .value
            .clone()
            .ok_or("comparison condition missing 'value'")?;
        return Ok(Condition::Comparison {
            first,
            operator,
            value,
        });
    }

    let kind = clause
        .kind
        .clone()
        .ok_or("condition missing 'type'")?;
    let first = clause
        .first
        .clone()
        .ok_or("condition missing 'first'")?;

    if clause.category.as_deref() == Some(GENEALOGY) {
        let second = clause
            .second
            .clone()
            .ok_or("genealogy condition missing 'second'")?;
        return Ok(Condition::Genealogy {
            relation: kind,
            first,
            second,
        });
    }

    Ok(Condition::Predicate {
        predicate: join_predicate(clause.category.as_deref(), &kind),
        first,
        second: clause.second.clone(),
        negated: clause.negated,
    })
}

/// Unfold a canonical condition into a flat clause.
#[must_use]
pub fn unfold_condition(condition: &Condition) -> Clause {
    match condition {
        Condition::Predicate {
            predicate,
            first,
            second,
            negated,
        } => {
            let (category, kind) = split_predicate(predicate);
            Clause {
                category: Some(category),
                kind: Some(kind),
                first: Some(first.clone()),
                second: second.clone(),
                negated: *negated,
                ..Clause::default()
            }
        }
        Condition::Comparison {
            first,
            operator,
            value,
        } => Clause {
            first: Some(first.clone()),
            operator: Some(operator_symbol(*operator).to_owned()),
            value: Some(value.clone()),
            ..Clause::default()
        },
        Condition::Genealogy {
            relation,
            first,
            second,
        } => Clause {
            category: Some(GENEALOGY.to_owned()),
            kind: Some(relation.clone()),
            first: Some(first.clone()),
            second: Some(second.clone()),
            ..Clause::default()
        },
    }
}

/// Fold a flat clause into a canonical effect.
///
/// Ensemble effects carry no set/modify discrimination, so every folded
/// effect is the [`Effect::Generic`] fallback: the action name is the joined
/// category/type, the `second` operand survives in the parameter map.
///
/// # Errors
///
/// Returns a human-readable reason when required slots are missing.
pub fn fold_effect(clause: &Clause) -> Result<Effect, String> {
    let kind = clause.kind.clone().ok_or("effect missing 'type'")?;
    let target = clause.first.clone().ok_or("effect missing 'first'")?;

    let mut parameters = Parameters::new();
    if let Some(second) = &clause.second {
        parameters.insert("second".to_owned(), Value::String(second.clone()));
    }

    Ok(Effect::Generic {
        action: join_predicate(clause.category.as_deref(), &kind),
        target,
        value: clause.value.clone(),
        parameters,
    })
}

/// Unfold a canonical effect into a flat clause.
///
/// All effect shapes go through the same flat record; the shape itself is
/// not representable in Ensemble and is one of its documented collapses.
#[must_use]
pub fn unfold_effect(effect: &Effect) -> Clause {
    let (category, kind) = split_predicate(effect.action());
    let second = match effect {
        Effect::Set { parameters, .. }
        | Effect::Modify { parameters, .. }
        | Effect::TriggerEvent { parameters, .. }
        | Effect::Generic { parameters, .. } => match parameters.get("second") {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        },
        Effect::CreateRelationship { .. } => None,
    };
    Clause {
        category: Some(category),
        kind: Some(kind),
        first: Some(effect.target().to_owned()),
        second,
        value: effect.value().cloned(),
        ..Clause::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clause(category: &str, kind: &str, first: &str) -> Clause {
        Clause {
            category: Some(category.to_owned()),
            kind: Some(kind.to_owned()),
            first: Some(first.to_owned()),
            ..Clause::default()
        }
    }

    #[test]
    fn trait_condition_folds_to_bare_predicate() {
        let folded = fold_condition(&clause("trait", "friendly", "X")).unwrap();
        assert_eq!(folded, Condition::predicate("friendly", "X"));
    }

    #[test]
    fn categorized_condition_folds_to_joined_predicate() {
        let folded = fold_condition(&clause("status", "lonely", "X")).unwrap();
        assert_eq!(folded, Condition::predicate("status_lonely", "X"));
    }

    #[test]
    fn operator_clause_folds_to_comparison() {
        let c = Clause {
            first: Some("age".to_owned()),
            operator: Some(">".to_owned()),
            value: Some(Value::Int(30)),
            ..Clause::default()
        };
        let folded = fold_condition(&c).unwrap();
        assert_eq!(
            folded,
            Condition::comparison("age", CompareOp::Greater, 30_i64)
        );
    }

    #[test]
    fn genealogy_category_folds_to_genealogy() {
        let mut c = clause("genealogy", "parent_of", "X");
        c.second = Some("Y".to_owned());
        let folded = fold_condition(&c).unwrap();
        assert_eq!(folded, Condition::genealogy("parent_of", "X", "Y"));
    }

    #[test]
    fn missing_slots_reported() {
        let c = Clause {
            operator: Some(">".to_owned()),
            ..Clause::default()
        };
        let err = fold_condition(&c).unwrap_err();
        assert!(err.contains("first"), "got: {err}");

        let err = fold_condition(&Clause::default()).unwrap_err();
        assert!(err.contains("type"), "got: {err}");
    }

    #[test]
    fn unknown_operator_reported() {
        let c = Clause {
            first: Some("age".to_owned()),
            operator: Some("~=".to_owned()),
            value: Some(Value::Int(1)),
            ..Clause::default()
        };
        let err = fold_condition(&c).unwrap_err();
        assert!(err.contains("~="), "got: {err}");
    }

    #[test]
    fn condition_fold_unfold_round_trip() {
        let cases = vec![
            clause("trait", "friendly", "X"),
            {
                let mut c = clause("relationship", "close", "X");
                c.second = Some("Y".to_owned());
                c
            },
            {
                let mut c = clause("genealogy", "parent_of", "A");
                c.second = Some("B".to_owned());
                c
            },
        ];
        for original in cases {
            let cond = fold_condition(&original).unwrap();
            let back = unfold_condition(&cond);
            let refolded = fold_condition(&back).unwrap();
            assert_eq!(refolded, cond, "clause {original:?} did not round-trip");
        }
    }

    #[test]
    fn negation_survives_fold() {
        let mut c = clause("trait", "friendly", "X");
        c.negated = true;
        let folded = fold_condition(&c).unwrap();
        assert!(matches!(folded, Condition::Predicate { negated: true, .. }));
        assert!(unfold_condition(&folded).negated);
    }

    #[test]
    fn effect_folds_to_generic_with_second_in_parameters() {
        let mut c = clause("relationship", "improve", "X");
        c.second = Some("Y".to_owned());
        let effect = fold_effect(&c).unwrap();
        assert_eq!(effect.action(), "relationship_improve");
        assert_eq!(effect.target(), "X");
        match &effect {
            Effect::Generic { parameters, .. } => {
                assert_eq!(parameters.get("second"), Some(&Value::String("Y".into())));
            }
            other => panic!("expected Generic, got {other:?}"),
        }
    }

    #[test]
    fn effect_unfold_restores_second() {
        let mut c = clause("relationship", "improve", "X");
        c.second = Some("Y".to_owned());
        let effect = fold_effect(&c).unwrap();
        let back = unfold_effect(&effect);
        assert_eq!(back.category.as_deref(), Some("relationship"));
        assert_eq!(back.kind.as_deref(), Some("improve"));
        assert_eq!(back.first.as_deref(), Some("X"));
        assert_eq!(back.second.as_deref(), Some("Y"));
    }

    #[test]
    fn split_predicate_without_underscore_is_trait() {
        assert_eq!(
            split_predicate("friendly"),
            ("trait".to_owned(), "friendly".to_owned())
        );
    }

    #[test]
    fn split_predicate_on_first_underscore() {
        assert_eq!(
            split_predicate("relationship_improve"),
            ("relationship".to_owned(), "improve".to_owned())
        );
        // Only the first underscore splits
        assert_eq!(
            split_predicate("status_very_lonely"),
            ("status".to_owned(), "very_lonely".to_owned())
        );
    }
}
