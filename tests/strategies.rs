use fabula::{CompareOp, Condition, Effect, Parameters, Rule, RuleType, Value};
use proptest::collection::{btree_map, vec};
use proptest::option;
use proptest::prelude::*;

/// A clean identifier, as every parser's grammar accepts it.
pub fn arb_ident() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,8}"
}

/// Printable-ASCII text with no identifier guarantees: spaces, punctuation,
/// quotes. Exercises the Kismet generator's sanitizer.
pub fn arb_messy_text() -> impl Strategy<Value = String> {
    "[ -~]{1,12}"
}

pub fn arb_compare_op() -> impl Strategy<Value = CompareOp> {
    prop_oneof![
        Just(CompareOp::Equals),
        Just(CompareOp::Greater),
        Just(CompareOp::Less),
    ]
}

/// Finite literal values (non-finite floats have no text-format literal).
pub fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::Int),
        (-1.0e6..1.0e6_f64).prop_map(Value::Float),
        any::<bool>().prop_map(Value::Bool),
        "[a-z0-9 .,!]{0,10}".prop_map(Value::String),
    ]
}

pub fn arb_predicate_condition() -> impl Strategy<Value = Condition> {
    (arb_ident(), arb_ident(), option::of(arb_ident()), any::<bool>()).prop_map(
        |(predicate, first, second, negated)| Condition::Predicate {
            predicate,
            first,
            second,
            negated,
        },
    )
}

pub fn arb_comparison_condition() -> impl Strategy<Value = Condition> {
    (arb_ident(), arb_compare_op(), arb_value()).prop_map(|(first, operator, value)| {
        Condition::Comparison {
            first,
            operator,
            value,
        }
    })
}

pub fn arb_genealogy_condition() -> impl Strategy<Value = Condition> {
    (arb_ident(), arb_ident(), arb_ident()).prop_map(|(relation, first, second)| {
        Condition::Genealogy {
            relation,
            first,
            second,
        }
    })
}

/// Any condition shape (full fidelity formats).
pub fn arb_condition() -> impl Strategy<Value = Condition> {
    prop_oneof![
        arb_predicate_condition(),
        arb_comparison_condition(),
        arb_genealogy_condition(),
    ]
}

/// Conditions representable without loss in an Insimul non-genealogy block.
pub fn arb_flat_condition() -> impl Strategy<Value = Condition> {
    prop_oneof![arb_predicate_condition(), arb_comparison_condition()]
}

/// A condition built from arbitrary printable text.
pub fn arb_messy_condition() -> impl Strategy<Value = Condition> {
    (
        arb_messy_text(),
        arb_messy_text(),
        option::of(arb_messy_text()),
        any::<bool>(),
    )
        .prop_map(|(predicate, first, second, negated)| Condition::Predicate {
            predicate,
            first,
            second,
            negated,
        })
}

pub fn arb_parameters() -> impl Strategy<Value = Parameters> {
    btree_map(arb_ident(), arb_value(), 0..3)
}

/// Every effect shape, parameters included (full fidelity formats).
pub fn arb_effect() -> impl Strategy<Value = Effect> {
    prop_oneof![
        (arb_ident(), arb_ident(), arb_value(), arb_parameters()).prop_map(
            |(action, target, value, parameters)| Effect::Set {
                action,
                target,
                value,
                parameters,
            }
        ),
        (arb_ident(), arb_ident(), arb_value(), arb_parameters()).prop_map(
            |(action, target, value, parameters)| Effect::Modify {
                action,
                target,
                value,
                parameters,
            }
        ),
        (arb_ident(), arb_ident(), option::of(arb_value())).prop_map(
            |(action, target, value)| Effect::CreateRelationship {
                action,
                target,
                value,
            }
        ),
        (arb_ident(), arb_ident(), arb_value(), arb_parameters()).prop_map(
            |(action, target, value, parameters)| Effect::TriggerEvent {
                action,
                target,
                value,
                parameters,
            }
        ),
        (arb_ident(), arb_ident(), option::of(arb_value()), arb_parameters()).prop_map(
            |(action, target, value, parameters)| Effect::Generic {
                action,
                target,
                value,
                parameters,
            }
        ),
    ]
}

/// Effect shapes as Insimul can carry them (no parameter map).
pub fn arb_insimul_effect() -> impl Strategy<Value = Effect> {
    prop_oneof![
        (arb_ident(), arb_ident(), arb_value())
            .prop_map(|(a, t, v)| Effect::set(&a, &t, v)),
        (arb_ident(), arb_ident(), arb_value())
            .prop_map(|(a, t, v)| Effect::modify(&a, &t, v)),
        (arb_ident(), arb_ident(), option::of(arb_value()))
            .prop_map(|(a, t, v)| Effect::relate(&a, &t, v)),
        (arb_ident(), arb_ident(), arb_value())
            .prop_map(|(a, t, v)| Effect::trigger(&a, &t, v)),
        (arb_ident(), arb_ident(), option::of(arb_value()))
            .prop_map(|(a, t, v)| Effect::generic(&a, &t, v)),
    ]
}

/// An effect built from arbitrary printable text.
pub fn arb_messy_effect() -> impl Strategy<Value = Effect> {
    (arb_messy_text(), arb_messy_text(), option::of(arb_value()))
        .prop_map(|(action, target, value)| Effect::generic(&action, &target, value))
}

/// A rule using only types and shapes Talk of the Town renders natively, so
/// a ToTT round trip must reproduce it exactly.
pub fn arb_tott_native_rule() -> impl Strategy<Value = Rule> {
    (
        arb_ident(),
        prop_oneof![
            Just(RuleType::Genealogy),
            Just(RuleType::Trigger),
            Just(RuleType::Trait),
            Just(RuleType::Default),
        ],
        vec(arb_condition(), 0..4),
        vec(arb_effect(), 0..3),
        any::<i64>(),
        0.0..=1.0_f64,
        option::of(0.0..=1.0_f64),
        vec(arb_ident(), 0..3),
        vec(arb_ident(), 0..2),
        any::<bool>(),
    )
        .prop_map(
            |(
                name,
                rule_type,
                conditions,
                effects,
                priority,
                likelihood,
                weight,
                tags,
                dependencies,
                active,
            )| {
                let mut rule = Rule::new(name, rule_type)
                    .with_priority(priority)
                    .with_likelihood(likelihood)
                    .with_active(active);
                rule.conditions = conditions;
                rule.effects = effects;
                rule.weight = weight;
                for tag in tags {
                    rule = rule.with_tag(tag);
                }
                rule.dependencies = dependencies;
                rule
            },
        )
}

/// A rule restricted to what an Insimul block expresses without loss.
pub fn arb_insimul_rule() -> impl Strategy<Value = Rule> {
    (
        arb_ident(),
        prop_oneof![
            Just(RuleType::Trigger),
            Just(RuleType::Pattern),
            Just(RuleType::Default),
        ],
        vec(arb_flat_condition(), 0..4),
        vec(arb_insimul_effect(), 0..3),
        any::<i64>(),
        0.0..=1.0_f64,
        vec(arb_ident(), 0..3),
    )
        .prop_map(
            |(name, rule_type, conditions, effects, priority, likelihood, tags)| {
                let mut rule = Rule::new(name, rule_type)
                    .with_priority(priority)
                    .with_likelihood(likelihood);
                rule.conditions = conditions;
                rule.effects = effects;
                for tag in tags {
                    rule = rule.with_tag(tag);
                }
                rule
            },
        )
}
