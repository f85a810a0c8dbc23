//! The Ensemble JSON schema: parser and generator side by side.
//!
//! An Ensemble document is a JSON object with optional `triggerRules`,
//! `volitionRules`, `actions`, `cast` and `schema` keys. Rule entries carry
//! flat category/type clauses which [`normalize`](crate::normalize) folds
//! into canonical conditions and effects.
//!
//! Only `trigger` and `volition` exist natively. Every other canonical type
//! folds into `triggerRules` with an `originalType` field (and an explicit
//! `likelihood`) so a format-aware re-import can recover what it was.

use serde::{Deserialize, Serialize};

use crate::error::{FormatError, ParseError};
use crate::formats::{Format, GeneratedDocument, ParsedDocument, Warning};
use crate::normalize::{self, Clause};
use crate::types::{
    clamp_likelihood, ActionRef, CharacterRef, Rule, RuleType, Value, DEFAULT_LIKELIHOOD,
    DEFAULT_PRIORITY, VOLITION_PRIORITY,
};

// -- Document shape ---------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnsembleDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trigger_rules: Option<RuleSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    volition_rules: Option<RuleSection>,
    // Raw values: rule import must not fail on a malformed cast or action
    // record it does not consume.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    actions: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    cast: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schema: Option<serde_json::Value>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RuleSection {
    // Entries stay raw JSON here so one malformed entry fails alone.
    #[serde(default)]
    rules: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnsembleRule {
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    conditions: Vec<EnsembleClause>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    effects: Vec<EnsembleClause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    likelihood: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    original_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    dependencies: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct EnsembleClause {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    first: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    second: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    operator: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    negated: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CastEntry {
    name: String,
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    traits: std::collections::BTreeMap<String, f64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActionEntry {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    action_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    verb_present: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    prerequisites: Vec<String>,
}

impl From<EnsembleClause> for Clause {
    fn from(c: EnsembleClause) -> Self {
        Clause {
            category: c.category,
            kind: c.kind,
            first: c.first,
            second: c.second,
            value: c.value,
            operator: c.operator,
            negated: c.negated,
        }
    }
}

impl From<Clause> for EnsembleClause {
    fn from(c: Clause) -> Self {
        EnsembleClause {
            category: c.category,
            kind: c.kind,
            first: c.first,
            second: c.second,
            value: c.value,
            operator: c.operator,
            negated: c.negated,
        }
    }
}

// -- Parsing ----------------------------------------------------------------

pub(crate) fn parse(source: &str) -> Result<ParsedDocument, FormatError> {
    let doc: EnsembleDoc = serde_json::from_str(source).map_err(|e| FormatError::Json {
        format: Format::Ensemble,
        source: e,
    })?;

    let mut rules = Vec::new();
    let mut errors = Vec::new();
    if let Some(section) = doc.trigger_rules {
        parse_section(
            section,
            RuleType::Trigger,
            "triggerRules.rules",
            &mut rules,
            &mut errors,
        );
    }
    if let Some(section) = doc.volition_rules {
        parse_section(
            section,
            RuleType::Volition,
            "volitionRules.rules",
            &mut rules,
            &mut errors,
        );
    }
    Ok(ParsedDocument {
        format: Format::Ensemble,
        rules,
        errors,
    })
}

fn parse_section(
    section: RuleSection,
    bucket: RuleType,
    path: &str,
    rules: &mut Vec<Rule>,
    errors: &mut Vec<ParseError>,
) {
    for (i, raw) in section.rules.into_iter().enumerate() {
        let entry_path = format!("{path}[{i}]");
        match parse_entry(raw, bucket.clone(), &entry_path) {
            Ok(rule) => rules.push(rule),
            Err(err) => errors.push(err),
        }
    }
}

fn parse_entry(
    raw: serde_json::Value,
    bucket: RuleType,
    path: &str,
) -> Result<Rule, ParseError> {
    let entry: EnsembleRule = serde_json::from_value(raw)
        .map_err(|e| ParseError::at_path(Format::Ensemble, path, e.to_string()))?;

    let volition = bucket == RuleType::Volition;
    let mut rule = Rule::new(entry.name, bucket);

    for (j, clause) in entry.conditions.into_iter().enumerate() {
        let condition = normalize::fold_condition(&clause.into()).map_err(|reason| {
            ParseError::at_path(Format::Ensemble, format!("{path}.conditions[{j}]"), reason)
        })?;
        rule.conditions.push(condition);
    }
    for (j, clause) in entry.effects.into_iter().enumerate() {
        let effect = normalize::fold_effect(&clause.into()).map_err(|reason| {
            ParseError::at_path(Format::Ensemble, format!("{path}.effects[{j}]"), reason)
        })?;
        rule.effects.push(effect);
    }

    rule.priority = entry.priority.unwrap_or(if volition {
        VOLITION_PRIORITY
    } else {
        DEFAULT_PRIORITY
    });
    rule.weight = entry.weight;
    rule.likelihood = clamp_likelihood(entry.likelihood.unwrap_or(DEFAULT_LIKELIHOOD));
    rule.is_active = entry.is_active.unwrap_or(true);
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

pub(crate) fn generate(
    rules: &[Rule],
    characters: &[CharacterRef],
    actions: &[ActionRef],
) -> GeneratedDocument {
    let mut warnings = Vec::new();
    let mut trigger_entries = Vec::new();
    let mut volition_entries = Vec::new();

    for rule in rules {
        let effective = rule.effective_type().clone();
        let (volition, original_type) = match effective {
            RuleType::Volition => (true, None),
            RuleType::Trigger => (false, None),
            RuleType::Default => (false, Some("default".to_owned())),
            other => {
                warnings.push(Warning::UnsupportedRuleType {
                    rule: rule.name.clone(),
                    rule_type: other.clone(),
                    rendered_as: "triggerRules",
                });
                (false, Some(other.as_str().to_owned()))
            }
        };
        let entry = render_entry(rule, volition, original_type, &mut warnings);
        let value = serde_json::to_value(entry).expect("rule entry serialization cannot fail");
        if volition {
            volition_entries.push(value);
        } else {
            trigger_entries.push(value);
        }
    }

    let doc = EnsembleDoc {
        trigger_rules: (!trigger_entries.is_empty()).then_some(RuleSection {
            rules: trigger_entries,
        }),
        volition_rules: (!volition_entries.is_empty()).then_some(RuleSection {
            rules: volition_entries,
        }),
        actions: actions
            .iter()
            .map(|a| {
                serde_json::to_value(action_entry(a)).expect("action serialization cannot fail")
            })
            .collect(),
        cast: characters
            .iter()
            .map(|c| serde_json::to_value(cast_entry(c)).expect("cast serialization cannot fail"))
            .collect(),
        schema: None,
    };
    let text =
        serde_json::to_string_pretty(&doc).expect("document serialization cannot fail");
    GeneratedDocument { text, warnings }
}

fn render_entry(
    rule: &Rule,
    volition: bool,
    original_type: Option<String>,
    warnings: &mut Vec<Warning>,
) -> EnsembleRule {
    let weight = if volition {
        let raw = rule.weight.unwrap_or(rule.likelihood);
        let clamped = clamp_likelihood(raw);
        if (clamped - raw).abs() > f64::EPSILON {
            warnings.push(Warning::LikelihoodClamped {
                rule: rule.name.clone(),
                value: raw,
            });
        }
        Some(clamped)
    } else {
        None
    };
    let likelihood = clamp_likelihood(rule.likelihood);
    if (likelihood - rule.likelihood).abs() > f64::EPSILON {
        warnings.push(Warning::LikelihoodClamped {
            rule: rule.name.clone(),
            value: rule.likelihood,
        });
    }
    EnsembleRule {
        name: rule.name.clone(),
        conditions: rule
            .conditions
            .iter()
            .map(|c| normalize::unfold_condition(c).into())
            .collect(),
        effects: rule
            .effects
            .iter()
            .map(|e| normalize::unfold_effect(e).into())
            .collect(),
        weight,
        priority: Some(rule.priority),
        likelihood: Some(likelihood),
        original_type,
        is_active: Some(rule.is_active),
        tags: rule.tags.clone(),
        dependencies: rule.dependencies.clone(),
    }
}

fn cast_entry(character: &CharacterRef) -> CastEntry {
    CastEntry {
        name: character.name.clone(),
        traits: character.personality.clone(),
    }
}

fn action_entry(action: &ActionRef) -> ActionEntry {
    ActionEntry {
        name: action.name.clone(),
        action_type: action.action_type.clone(),
        category: action.category.clone(),
        verb_present: action.verb_present.clone(),
        prerequisites: action.prerequisites.clone(),
    }
}
