//! The Talk-of-the-Town JSON schema: parser and generator side by side.
//!
//! A document is a JSON object with optional `genealogy_rules`,
//! `trigger_rules`, `character_rules`, `characters` and `actions` keys.
//! Conditions and effects use the canonical serde-tagged shapes directly,
//! which makes this the highest-fidelity carrier of the four formats.
//!
//! Only genealogy, trigger and trait rules have native buckets. Everything
//! else lands in `character_rules` with `type: "character"` and an
//! `original_type` field for recovery on re-import.

use serde::{Deserialize, Serialize};

use crate::error::{FormatError, ParseError};
use crate::formats::{Format, GeneratedDocument, ParsedDocument, Warning};
use crate::types::{
    clamp_likelihood, ActionRef, CharacterRef, Condition, Effect, Rule, RuleType,
    DEFAULT_LIKELIHOOD, DEFAULT_PRIORITY,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct TottDoc {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    genealogy_rules: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    trigger_rules: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    character_rules: Vec<serde_json::Value>,
    // Raw values: rule import must not fail on a malformed character or
    // action record it does not consume.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    characters: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    actions: Vec<serde_json::Value>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize)]
struct TottRule {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    effects: Vec<Effect>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    dependencies: Vec<String>,
    #[serde(default = "default_true")]
    active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    likelihood: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    original_type: Option<String>,
}

// -- Parsing ----------------------------------------------------------------

pub(crate) fn parse(source: &str) -> Result<ParsedDocument, FormatError> {
    let doc: TottDoc = serde_json::from_str(source).map_err(|e| FormatError::Json {
        format: Format::Tott,
        source: e,
    })?;

    let mut rules = Vec::new();
    let mut errors = Vec::new();
    let buckets = [
        (doc.genealogy_rules, "genealogy_rules"),
        (doc.trigger_rules, "trigger_rules"),
        (doc.character_rules, "character_rules"),
    ];
    for (entries, bucket) in buckets {
        for (i, raw) in entries.into_iter().enumerate() {
            let path = format!("{bucket}[{i}]");
            match parse_entry(raw, bucket, &path) {
                Ok(rule) => rules.push(rule),
                Err(err) => errors.push(err),
            }
        }
    }
    Ok(ParsedDocument {
        format: Format::Tott,
        rules,
        errors,
    })
}

fn parse_entry(raw: serde_json::Value, bucket: &str, path: &str) -> Result<Rule, ParseError> {
    let entry: TottRule = serde_json::from_value(raw)
        .map_err(|e| ParseError::at_path(Format::Tott, path, e.to_string()))?;

    let rule_type = match bucket {
        "genealogy_rules" => RuleType::Genealogy,
        "trigger_rules" => RuleType::Trigger,
        _ if entry.kind == "trait" => RuleType::Trait,
        _ => RuleType::Default,
    };

    let mut rule = Rule::new(entry.name, rule_type);
    rule.conditions = entry.conditions;
    rule.effects = entry.effects;
    rule.priority = entry.priority.unwrap_or(DEFAULT_PRIORITY);
    rule.likelihood = clamp_likelihood(entry.likelihood.unwrap_or(DEFAULT_LIKELIHOOD));
    rule.weight = entry.weight;
    rule.is_active = entry.active;
    for tag in entry.tags {
        rule = rule.with_tag(tag);
    }
    rule.dependencies = entry.dependencies;
    if let Some(original) = entry.original_type {
        rule = rule.with_provenance(RuleType::from(original));
    }
    Ok(rule)
}

// -- Generation -------------------------------------------------------------

enum Bucket {
    Genealogy,
    Trigger,
    Character,
}

pub(crate) fn generate(
    rules: &[Rule],
    characters: &[CharacterRef],
    actions: &[ActionRef],
) -> GeneratedDocument {
    let mut warnings = Vec::new();
    let mut doc = TottDoc {
        characters: characters
            .iter()
            .map(|c| serde_json::to_value(c).expect("character serialization cannot fail"))
            .collect(),
        actions: actions
            .iter()
            .map(|a| serde_json::to_value(a).expect("action serialization cannot fail"))
            .collect(),
        ..TottDoc::default()
    };

    for rule in rules {
        let effective = rule.effective_type().clone();
        let (bucket, kind, original_type) = match effective {
            RuleType::Genealogy => (Bucket::Genealogy, "genealogy", None),
            RuleType::Trigger => (Bucket::Trigger, "trigger", None),
            RuleType::Trait => (Bucket::Character, "trait", None),
            RuleType::Default => (Bucket::Character, "character", None),
            other => {
                warnings.push(Warning::UnsupportedRuleType {
                    rule: rule.name.clone(),
                    rule_type: other.clone(),
                    rendered_as: "character_rules",
                });
                (
                    Bucket::Character,
                    "character",
                    Some(other.as_str().to_owned()),
                )
            }
        };

        let likelihood = clamp_likelihood(rule.likelihood);
        if (likelihood - rule.likelihood).abs() > f64::EPSILON {
            warnings.push(Warning::LikelihoodClamped {
                rule: rule.name.clone(),
                value: rule.likelihood,
            });
        }
        let weight = rule.weight.map(|raw| {
            let clamped = clamp_likelihood(raw);
            if (clamped - raw).abs() > f64::EPSILON {
                warnings.push(Warning::LikelihoodClamped {
                    rule: rule.name.clone(),
                    value: raw,
                });
            }
            clamped
        });
        let entry = TottRule {
            name: rule.name.clone(),
            kind: kind.to_owned(),
            priority: Some(rule.priority),
            conditions: rule.conditions.clone(),
            effects: rule.effects.clone(),
            tags: rule.tags.clone(),
            dependencies: rule.dependencies.clone(),
            active: rule.is_active,
            likelihood: Some(likelihood),
            weight,
            original_type,
        };
        let value = serde_json::to_value(entry).expect("rule entry serialization cannot fail");
        match bucket {
            Bucket::Genealogy => doc.genealogy_rules.push(value),
            Bucket::Trigger => doc.trigger_rules.push(value),
            Bucket::Character => doc.character_rules.push(value),
        }
    }

    let text = serde_json::to_string_pretty(&doc).expect("document serialization cannot fail");
    GeneratedDocument { text, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CompareOp, Parameters, Value};

    #[test]
    fn parse_buckets() {
        let src = r#"{
            "genealogy_rules": [
                {"name": "lineage", "type": "genealogy",
                 "conditions": [{"type": "genealogy", "relation": "parent_of", "first": "X", "second": "Y"}]}
            ],
            "trigger_rules": [
                {"name": "greet", "type": "trigger", "priority": 3}
            ],
            "character_rules": [
                {"name": "generous", "type": "trait", "likelihood": 0.4},
                {"name": "background", "type": "character"}
            ]
        }"#;
        let doc = parse(src).unwrap();
        assert!(doc.errors.is_empty(), "errors: {:?}", doc.errors);
        assert_eq!(doc.rules.len(), 4);
        assert_eq!(doc.rules[0].rule_type, RuleType::Genealogy);
        assert_eq!(
            doc.rules[0].conditions[0],
            Condition::genealogy("parent_of", "X", "Y")
        );
        assert_eq!(doc.rules[1].rule_type, RuleType::Trigger);
        assert_eq!(doc.rules[1].priority, 3);
        assert_eq!(doc.rules[2].rule_type, RuleType::Trait);
        assert_eq!(doc.rules[2].likelihood, 0.4);
        assert_eq!(doc.rules[3].rule_type, RuleType::Default);
    }

    #[test]
    fn parse_tagged_effects() {
        let src = r#"{
            "character_rules": [{
                "name": "cheer",
                "type": "character",
                "effects": [
                    {"type": "set", "action": "mood", "target": "X", "value": "happy"},
                    {"type": "create_relationship", "action": "friend_of", "target": "X"}
                ]
            }]
        }"#;
        let doc = parse(src).unwrap();
        assert!(matches!(doc.rules[0].effects[0], Effect::Set { .. }));
        assert!(matches!(
            doc.rules[0].effects[1],
            Effect::CreateRelationship { .. }
        ));
    }

    #[test]
    fn invalid_json_is_a_hard_failure() {
        assert!(matches!(
            parse("[1, 2").unwrap_err(),
            FormatError::Json { format: Format::Tott, .. }
        ));
    }

    #[test]
    fn malformed_entry_isolated() {
        let src = r#"{
            "trigger_rules": [
                {"name": "good", "type": "trigger"},
                {"type": "trigger"},
                {"name": "also_good", "type": "trigger"}
            ]
        }"#;
        let doc = parse(src).unwrap();
        assert_eq!(doc.rules.len(), 2);
        assert_eq!(doc.errors.len(), 1);
        assert!(doc.errors[0].to_string().contains("trigger_rules[1]"));
    }

    #[test]
    fn generate_buckets_by_type() {
        let rules = vec![
            Rule::new("lineage", RuleType::Genealogy),
            Rule::new("greet", RuleType::Trigger),
            Rule::new("generous", RuleType::Trait),
            Rule::new("background", RuleType::Default),
        ];
        let doc = generate(&rules, &[], &[]);
        assert!(doc.warnings.is_empty());
        let json: serde_json::Value = serde_json::from_str(&doc.text).unwrap();
        assert_eq!(json["genealogy_rules"][0]["name"], "lineage");
        assert_eq!(json["trigger_rules"][0]["name"], "greet");
        assert_eq!(json["character_rules"][0]["type"], "trait");
        assert_eq!(json["character_rules"][1]["type"], "character");
    }

    #[test]
    fn generate_collapses_foreign_types_with_original_type() {
        let rule = Rule::new("seek", RuleType::Volition).with_weight(0.7);
        let doc = generate(&[rule], &[], &[]);
        let json: serde_json::Value = serde_json::from_str(&doc.text).unwrap();
        let entry = &json["character_rules"][0];
        assert_eq!(entry["type"], "character");
        assert_eq!(entry["original_type"], "volition");
        assert_eq!(entry["weight"], 0.7);
        assert!(matches!(
            doc.warnings[0],
            Warning::UnsupportedRuleType { rendered_as: "character_rules", .. }
        ));

        let back = parse(&doc.text).unwrap();
        assert_eq!(back.rules[0].rule_type, RuleType::Default);
        assert_eq!(back.rules[0].effective_type(), &RuleType::Volition);
        assert_eq!(back.rules[0].weight, Some(0.7));
    }

    #[test]
    fn generate_splices_records() {
        let characters = vec![CharacterRef::new("c1", "Alice")];
        let actions = vec![ActionRef::new("greet")];
        let doc = generate(&[], &characters, &actions);
        let json: serde_json::Value = serde_json::from_str(&doc.text).unwrap();
        assert_eq!(json["characters"][0]["id"], "c1");
        assert_eq!(json["actions"][0]["name"], "greet");
    }

    #[test]
    fn round_trip_full_fidelity() {
        let mut params = Parameters::new();
        params.insert("venue".to_owned(), Value::String("church".into()));
        let rules = vec![
            Rule::new("lineage", RuleType::Genealogy)
                .with_condition(Condition::genealogy("parent_of", "X", "Y"))
                .with_effect(Effect::relate("grandparent_of", "X", None))
                .with_dependency("founders"),
            Rule::new("midlife", RuleType::Trigger)
                .with_condition(Condition::comparison("age", CompareOp::Greater, 40_i64))
                .with_effect(Effect::Set {
                    action: "mood".to_owned(),
                    target: "X".to_owned(),
                    value: Value::String("restless".into()),
                    parameters: params.clone(),
                })
                .with_priority(2)
                .with_likelihood(0.25)
                .with_tag("midlife")
                .with_active(false),
            Rule::new("generous", RuleType::Trait)
                .with_condition(Condition::predicate("kind", "X").negated()),
            Rule::new("background", RuleType::Default)
                .with_effect(Effect::trigger("festival", "town", "celebration")),
        ];
        let generated = generate(&rules, &[], &[]);
        let doc = parse(&generated.text).unwrap();
        assert!(doc.errors.is_empty(), "errors: {:?}", doc.errors);
        assert_eq!(doc.rules, rules);
    }
}
