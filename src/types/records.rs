use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A character record supplied by the storage layer for splicing into
/// generated documents. The compiler never queries storage itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRef {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    /// Personality trait name -> strength, e.g. `"friendly" -> 0.8`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub personality: BTreeMap<String, f64>,
}

impl CharacterRef {
    /// Create a character with the given id and name and nothing else.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            first_name: None,
            last_name: None,
            age: None,
            gender: None,
            occupation: None,
            personality: BTreeMap::new(),
        }
    }

    /// Add a personality trait.
    #[must_use]
    pub fn with_trait(mut self, name: impl Into<String>, strength: f64) -> Self {
        self.personality.insert(name.into(), strength);
        self
    }
}

/// An action record supplied by the storage layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<String>,
    /// Present-tense verb used when narrating the action ("greets").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verb_present: Option<String>,
}

impl ActionRef {
    /// Create an action with the given name and nothing else.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action_type: None,
            category: None,
            duration: None,
            difficulty: None,
            target_type: None,
            prerequisites: Vec::new(),
            effects: Vec::new(),
            verb_present: None,
        }
    }
}
