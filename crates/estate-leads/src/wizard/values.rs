use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Raw value captured for a single field. Nothing is typed until a validator looks at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Choices(Vec<String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Choices(_) => None,
        }
    }

    pub fn choices(&self) -> &[String] {
        match self {
            FieldValue::Choices(choices) => choices,
            FieldValue::Text(_) => &[],
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::Choices(choices) => choices.is_empty(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// Values collected so far in a session. Keys are never removed mid-session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldValues(BTreeMap<String, FieldValue>);

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    /// Text value of `name`, or `""` when absent or not textual.
    pub fn text(&self, name: &str) -> &str {
        self.0
            .get(name)
            .and_then(FieldValue::as_text)
            .unwrap_or_default()
    }

    pub fn choices(&self, name: &str) -> &[String] {
        self.0.get(name).map(FieldValue::choices).unwrap_or_default()
    }

    /// True when `name` holds exactly `value` as text.
    pub fn is(&self, name: &str, value: &str) -> bool {
        self.text(name) == value
    }

    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        self.0.insert(name.into(), value);
    }

    /// Adds `choice` when absent, removes it when present. Returns whether it is now selected.
    pub fn toggle_choice(&mut self, name: &str, choice: &str) -> bool {
        let entry = self
            .0
            .entry(name.to_string())
            .or_insert_with(|| FieldValue::Choices(Vec::new()));
        if let FieldValue::Text(_) = entry {
            *entry = FieldValue::Choices(Vec::new());
        }

        let FieldValue::Choices(choices) = entry else {
            return false;
        };
        match choices.iter().position(|existing| existing == choice) {
            Some(index) => {
                choices.remove(index);
                false
            }
            None => {
                choices.push(choice.to_string());
                true
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
