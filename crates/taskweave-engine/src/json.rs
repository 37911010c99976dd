//! JSON-mode task extraction for structured model output.
//!
//! Locates the JSON fragment inside the message, parses it, and maps the
//! accepted object shapes to candidate tasks. Malformed JSON yields no tasks.

use serde_json::{Map, Value};
use taskweave_core::schema::TaskResolver;
use taskweave_core::types::{CandidateTask, Properties, PropertyValue, TaskId};
use tracing::debug;

const RESERVED_KEYS: [&str; 3] = ["command", "action", "properties"];

/// Byte span of the JSON fragment: first `{` to last `}`, widened to the
/// enclosing `[`/`]` when both sit just outside it (whitespace allowed).
pub fn locate_json_span(text: &str) -> Option<(usize, usize)> {
    let first = text.find('{')?;
    let last = text.rfind('}')?;
    if last < first {
        return None;
    }
    let mut start = first;
    let mut end = last + 1;

    let before = text[..start].trim_end_matches(char::is_whitespace);
    let after = text[end..].trim_start_matches(char::is_whitespace);
    if before.ends_with('[') && after.starts_with(']') {
        start = before.len() - 1;
        end = text.len() - after.len() + 1;
    }
    Some((start, end))
}

/// Entries describing tasks, in the shapes models tend to produce.
fn normalize(parsed: Value) -> Vec<Value> {
    match parsed {
        Value::Array(items) => items,
        Value::Object(mut obj) => {
            for key in ["task", "tasks"] {
                match obj.remove(key) {
                    Some(Value::Array(items)) => return items,
                    Some(inner @ Value::Object(_)) => return vec![inner],
                    Some(other) => {
                        obj.insert(key.to_string(), other);
                    }
                    None => {}
                }
            }
            vec![Value::Object(obj)]
        }
        _ => Vec::new(),
    }
}

fn entry_to_task(
    entry: Map<String, Value>,
    task_mode: &TaskId,
    resolver: &dyn TaskResolver,
    span: (usize, usize),
) -> Option<CandidateTask> {
    let command = entry.get("command").and_then(Value::as_str).map(str::to_string);
    let action = entry.get("action").and_then(Value::as_str).map(str::to_string);

    let mut properties: Properties = match entry.get("properties") {
        Some(Value::Object(props)) => props
            .iter()
            .map(|(k, v)| (k.clone(), PropertyValue::from_json(v)))
            .collect(),
        _ => Properties::new(),
    };
    for (key, value) in &entry {
        if !RESERVED_KEYS.contains(&key.as_str()) {
            properties
                .entry(key.clone())
                .or_insert_with(|| PropertyValue::from_json(value));
        }
    }

    if command.is_none() && action.is_none() && properties.is_empty() {
        return None;
    }

    let task = match (&command, &action) {
        (Some(command), Some(action)) => resolver.command_to_task(command, Some(action)),
        _ => Some(task_mode.clone()),
    };

    Some(CandidateTask {
        task,
        command: command.unwrap_or_default(),
        action,
        properties: (!properties.is_empty()).then_some(properties),
        start: span.0,
        end: span.1,
    })
}

/// Extract candidate tasks from a JSON payload embedded in `text`.
///
/// Every candidate spans the whole JSON fragment.
pub fn extract_json_tasks(
    text: &str,
    task_mode: &TaskId,
    resolver: &dyn TaskResolver,
) -> Vec<CandidateTask> {
    let Some(span) = locate_json_span(text) else {
        debug!(trace = "json.no_fragment", "No JSON object found in message");
        return Vec::new();
    };

    let parsed: Value = match serde_json::from_str(&text[span.0..span.1]) {
        Ok(value) => value,
        Err(e) => {
            debug!(trace = "json.parse_failed", error = %e, "Ignoring malformed JSON payload");
            return Vec::new();
        }
    };

    normalize(parsed)
        .into_iter()
        .filter_map(|entry| match entry {
            Value::Object(obj) => entry_to_task(obj, task_mode, resolver, span),
            _ => None,
        })
        .collect()
}
