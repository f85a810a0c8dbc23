use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Value;

/// Ordered parameter map attached to an effect.
///
/// `BTreeMap` keeps generated output deterministic regardless of insertion
/// order.
pub type Parameters = BTreeMap<String, Value>;

/// A single action in a rule's `then` clause.
///
/// Effects are ordered; parsers and generators preserve the sequence exactly
/// as written. `Generic` is the explicit fallback for source effects that do
/// not map cleanly onto one of the named shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// Set an attribute on a target to a value.
    Set {
        action: String,
        target: String,
        value: Value,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        parameters: Parameters,
    },
    /// Adjust an attribute on a target by a value.
    Modify {
        action: String,
        target: String,
        value: Value,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        parameters: Parameters,
    },
    /// Establish a relationship of the named kind.
    CreateRelationship {
        action: String,
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },
    /// Fire a simulation event. `value` is the event type.
    TriggerEvent {
        action: String,
        target: String,
        value: Value,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        parameters: Parameters,
    },
    /// Fallback shape for effects with no cleaner mapping.
    Generic {
        action: String,
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        parameters: Parameters,
    },
}

impl Effect {
    /// Shorthand for a `Set` effect without parameters.
    #[must_use]
    pub fn set(action: &str, target: &str, value: impl Into<Value>) -> Self {
        Effect::Set {
            action: action.to_owned(),
            target: target.to_owned(),
            value: value.into(),
            parameters: Parameters::new(),
        }
    }

    /// Shorthand for a `Modify` effect without parameters.
    #[must_use]
    pub fn modify(action: &str, target: &str, value: impl Into<Value>) -> Self {
        Effect::Modify {
            action: action.to_owned(),
            target: target.to_owned(),
            value: value.into(),
            parameters: Parameters::new(),
        }
    }

    /// Shorthand for a `CreateRelationship` effect.
    #[must_use]
    pub fn relate(action: &str, target: &str, value: Option<Value>) -> Self {
        Effect::CreateRelationship {
            action: action.to_owned(),
            target: target.to_owned(),
            value,
        }
    }

    /// Shorthand for a `TriggerEvent` effect without parameters.
    #[must_use]
    pub fn trigger(action: &str, target: &str, event: impl Into<Value>) -> Self {
        Effect::TriggerEvent {
            action: action.to_owned(),
            target: target.to_owned(),
            value: event.into(),
            parameters: Parameters::new(),
        }
    }

    /// Shorthand for a `Generic` effect.
    #[must_use]
    pub fn generic(action: &str, target: &str, value: Option<Value>) -> Self {
        Effect::Generic {
            action: action.to_owned(),
            target: target.to_owned(),
            value,
            parameters: Parameters::new(),
        }
    }

    /// The verb or attribute name this effect acts through.
    #[must_use]
    pub fn action(&self) -> &str {
        match self {
            Effect::Set { action, .. }
            | Effect::Modify { action, .. }
            | Effect::CreateRelationship { action, .. }
            | Effect::TriggerEvent { action, .. }
            | Effect::Generic { action, .. } => action,
        }
    }

    /// The entity this effect applies to.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Effect::Set { target, .. }
            | Effect::Modify { target, .. }
            | Effect::CreateRelationship { target, .. }
            | Effect::TriggerEvent { target, .. }
            | Effect::Generic { target, .. } => target,
        }
    }

    /// The effect's value, if it carries one.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Effect::Set { value, .. }
            | Effect::Modify { value, .. }
            | Effect::TriggerEvent { value, .. } => Some(value),
            Effect::CreateRelationship { value, .. } | Effect::Generic { value, .. } => {
                value.as_ref()
            }
        }
    }
}
