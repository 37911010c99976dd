//! Core types shared by the extraction engine and its callers.
//!
//! Defines task identifiers, typed property values, candidate and validated
//! task records, and the per-mode task schema.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Identifiers and enums
// =============================================================================

/// Canonical, language-independent task identifier (e.g. `RoutineAdd`).
///
/// Task modes use the same identifier space: a mode such as `BotAdd` is also
/// the task that mode runs when it is single-task.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// How a message is turned into candidate tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Slash commands embedded in prose, parsed character by character.
    Text,
    /// A JSON payload describing one or more tasks.
    Json,
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingMode::Text => write!(f, "text"),
            ProcessingMode::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for ProcessingMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ProcessingMode::Text),
            "json" => Ok(ProcessingMode::Json),
            _ => Err(format!("Unknown processing mode: {}", s)),
        }
    }
}

// =============================================================================
// Property values
// =============================================================================

/// A typed property value, decided once when the value is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl PropertyValue {
    /// Classify a bare (unquoted) literal.
    ///
    /// Accepts `null`, `true`, `false` and finite signed decimals. Integers
    /// that fit in an `i64` stay integral; everything else becomes a float.
    pub fn from_bare_literal(raw: &str) -> Option<Self> {
        match raw {
            "null" => return Some(PropertyValue::Null),
            "true" => return Some(PropertyValue::Bool(true)),
            "false" => return Some(PropertyValue::Bool(false)),
            _ => {}
        }
        if let Ok(int) = raw.parse::<i64>() {
            return Some(PropertyValue::Number(int.into()));
        }
        let float = parse_finite(raw)?;
        serde_json::Number::from_f64(float).map(PropertyValue::Number)
    }

    /// Convert an arbitrary JSON value. Arrays and objects are kept as their
    /// JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => PropertyValue::Null,
            serde_json::Value::Bool(b) => PropertyValue::Bool(*b),
            serde_json::Value::Number(n) => PropertyValue::Number(n.clone()),
            serde_json::Value::String(s) => PropertyValue::String(s.clone()),
            other => PropertyValue::String(other.to_string()),
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, PropertyValue::String(_))
    }
}

/// Parse a finite decimal number.
///
/// Rejects the `inf`/`nan` spellings that Rust's float parser accepts.
pub fn parse_finite(raw: &str) -> Option<f64> {
    if raw
        .bytes()
        .any(|b| b.is_ascii_alphabetic() && b != b'e' && b != b'E')
    {
        return None;
    }
    raw.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Named properties attached to a task, ordered by name.
pub type Properties = BTreeMap<String, PropertyValue>;

/// Data already known from prior context (e.g. a form the user is filling).
pub type ExistingData = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// Task records
// =============================================================================

/// A command recognised in text, before schema validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTask {
    pub task: Option<TaskId>,
    pub command: String,
    pub action: Option<String>,
    pub properties: Option<Properties>,
    /// Byte offset of the first character of the command.
    pub start: usize,
    /// Exclusive byte offset just past the last committed token.
    pub end: usize,
}

/// A candidate that passed schema validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedTask {
    pub id: String,
    pub task: TaskId,
    pub command: String,
    pub action: Option<String>,
    pub properties: Option<Properties>,
    pub start: usize,
    pub end: usize,
    pub label: Option<String>,
}

/// Result of running the full pipeline over one message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageTasks {
    pub tasks_to_run: Vec<ValidatedTask>,
    pub tasks_to_suggest: Vec<ValidatedTask>,
    pub message_without_tasks: String,
}

// =============================================================================
// Schema
// =============================================================================

/// Declared property with optional type and required flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub is_required: bool,
}

/// A schema property entry: either a bare name or a full spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyEntry {
    Name(String),
    Spec(PropertySpec),
}

impl PropertyEntry {
    pub fn name(&self) -> &str {
        match self {
            PropertyEntry::Name(name) => name,
            PropertyEntry::Spec(spec) => &spec.name,
        }
    }

    pub fn is_required(&self) -> bool {
        match self {
            PropertyEntry::Name(_) => false,
            PropertyEntry::Spec(spec) => spec.is_required,
        }
    }
}

/// Per-mode task schema supplied by the configuration collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSchema {
    /// Canonical command key to localized command word.
    #[serde(default)]
    pub commands: BTreeMap<String, String>,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub properties: Vec<PropertyEntry>,
    #[serde(default)]
    pub label: String,
}

impl TaskSchema {
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p.name() == name)
    }

    pub fn has_action(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a == action)
    }

    /// Names of properties flagged as required, in declaration order.
    pub fn required_properties(&self) -> impl Iterator<Item = &str> {
        self.properties
            .iter()
            .filter(|p| p.is_required())
            .map(PropertyEntry::name)
    }
}
