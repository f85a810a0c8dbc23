use std::fmt;

use serde::{Deserialize, Serialize};

use super::condition::Condition;
use super::effect::Effect;

/// Rule categories understood by the canonical model.
///
/// The set is open at the edges: a source keyword the compiler has never
/// seen becomes `Other` and is carried verbatim rather than rejected, so a
/// newer dialect can pass through an older compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RuleType {
    Trigger,
    Volition,
    Pattern,
    Genealogy,
    Default,
    Trait,
    Social,
    Relationship,
    /// An unrecognized source keyword, preserved as written.
    Other(String),
}

impl RuleType {
    /// Canonical lowercase name for this type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            RuleType::Trigger => "trigger",
            RuleType::Volition => "volition",
            RuleType::Pattern => "pattern",
            RuleType::Genealogy => "genealogy",
            RuleType::Default => "default",
            RuleType::Trait => "trait",
            RuleType::Social => "social",
            RuleType::Relationship => "relationship",
            RuleType::Other(name) => name,
        }
    }
}

impl From<String> for RuleType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "trigger" => RuleType::Trigger,
            "volition" => RuleType::Volition,
            "pattern" => RuleType::Pattern,
            "genealogy" => RuleType::Genealogy,
            "default" => RuleType::Default,
            "trait" => RuleType::Trait,
            "social" => RuleType::Social,
            "relationship" => RuleType::Relationship,
            _ => RuleType::Other(s),
        }
    }
}

impl From<&str> for RuleType {
    fn from(s: &str) -> Self {
        RuleType::from(s.to_owned())
    }
}

impl From<RuleType> for String {
    fn from(t: RuleType) -> Self {
        t.as_str().to_owned()
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side-channel record of what a rule was before a lossy export collapse.
///
/// Several target formats cannot distinguish every canonical type (e.g.
/// Insimul renders `trigger`, `social` and `relationship` all as `rule`).
/// Generators for the formats that can carry extra fields emit the original
/// type alongside the collapsed one, and parsers restore it here so the
/// information survives a full export/import cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub original_type: RuleType,
}

impl Provenance {
    #[must_use]
    pub fn new(original_type: RuleType) -> Self {
        Self { original_type }
    }
}

/// A named, typed behavior unit — the format-independent representation all
/// parsers produce and all generators consume.
///
/// Condition and effect order is meaning: conditions are conjunctive left to
/// right, effects apply in sequence. No parser or generator may reorder them.
///
/// Rules come out of [`parse`](crate::parse); the `with_*` builder methods
/// exist for callers assembling canonical rules for generation (and for
/// tests).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub rule_type: RuleType,
    pub conditions: Vec<Condition>,
    pub effects: Vec<Effect>,
    pub priority: i64,
    pub likelihood: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

/// Default priority for general rules.
pub const DEFAULT_PRIORITY: i64 = 5;

/// Default priority for Ensemble volition entries that carry no weight.
pub const VOLITION_PRIORITY: i64 = 7;

/// Default likelihood when a format does not express one.
pub const DEFAULT_LIKELIHOOD: f64 = 0.5;

impl Rule {
    /// Create a rule with the given name and type and all defaults.
    #[must_use]
    pub fn new(name: impl Into<String>, rule_type: RuleType) -> Self {
        Self {
            name: name.into(),
            rule_type,
            conditions: Vec::new(),
            effects: Vec::new(),
            priority: DEFAULT_PRIORITY,
            likelihood: DEFAULT_LIKELIHOOD,
            weight: None,
            tags: Vec::new(),
            dependencies: Vec::new(),
            is_active: true,
            provenance: None,
        }
    }

    /// Append a condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Append an effect.
    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Set the likelihood, clamped to [0, 1].
    #[must_use]
    pub fn with_likelihood(mut self, likelihood: f64) -> Self {
        self.likelihood = clamp_likelihood(likelihood);
        self
    }

    /// Set the volition weight.
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Append a tag. Duplicates are ignored; insertion order is preserved.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// Append a dependency on another rule's name.
    #[must_use]
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    /// Set whether the rule is active.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    /// Record the type this rule had before a lossy collapse.
    #[must_use]
    pub fn with_provenance(mut self, original_type: RuleType) -> Self {
        self.provenance = Some(Provenance::new(original_type));
        self
    }

    /// The type this rule originally had, looking through provenance.
    #[must_use]
    pub fn effective_type(&self) -> &RuleType {
        self.provenance
            .as_ref()
            .map_or(&self.rule_type, |p| &p.original_type)
    }
}

/// Clamp a likelihood into [0, 1]. NaN collapses to the default.
#[must_use]
pub fn clamp_likelihood(value: f64) -> f64 {
    if value.is_nan() {
        DEFAULT_LIKELIHOOD
    } else {
        value.clamp(0.0, 1.0)
    }
}
