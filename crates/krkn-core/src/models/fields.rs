use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attributes shared by every dynamic form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    pub variable: String,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub default: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub secret: bool,
}

impl FieldMeta {
    /// Label used in messages, falling back to the variable name
    pub fn label(&self) -> &str {
        if !self.short_description.is_empty() {
            &self.short_description
        } else if !self.name.is_empty() {
            &self.name
        } else {
            &self.variable
        }
    }
}

/// Older schemas send numeric and boolean defaults unquoted
fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn default_separator() -> String {
    ",".to_string()
}

/// Type-specific part of a field, keyed by the `type` discriminant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        validator: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        validation_message: Option<String>,
    },
    Number,
    Enum {
        #[serde(default = "default_separator")]
        separator: String,
        #[serde(default)]
        allowed_values: String,
    },
    Boolean,
    File {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mount_path: Option<String>,
    },
    FileBase64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioField {
    #[serde(flatten)]
    pub meta: FieldMeta,
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// A value entered into a dynamic form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    Bool(bool),
    File { name: String, content: Vec<u8> },
}

impl FormValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Bool(_) => false,
            Self::File { content, .. } => content.is_empty(),
        }
    }
}

impl From<&str> for FormValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for FormValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Form values keyed by field variable
pub type FormValues = BTreeMap<String, FormValue>;

/// Which optional global fields the user actually edited
pub type TouchedFields = BTreeMap<String, bool>;
