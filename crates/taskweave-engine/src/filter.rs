//! Schema validation and healing of candidate tasks.
//!
//! Candidates that cannot run in the active task mode are dropped and logged,
//! never reported as errors. Unknown properties are silently removed.

use std::collections::BTreeSet;

use taskweave_core::schema::{SchemaProvider, TaskResolver};
use taskweave_core::types::{
    CandidateTask, ExistingData, Properties, TaskId, TaskSchema, ValidatedTask,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::EngineError;

/// Validates candidates against one schema snapshot for one task mode.
pub struct TaskFilter<'a> {
    task_mode: &'a TaskId,
    schema: &'a TaskSchema,
    existing: &'a ExistingData,
    available: BTreeSet<TaskId>,
    required: BTreeSet<&'a str>,
}

impl<'a> TaskFilter<'a> {
    /// Build a filter for `task_mode`.
    ///
    /// Modes listed in `exempt_modes` skip the required-property check.
    pub fn new(
        task_mode: &'a TaskId,
        schema: &'a TaskSchema,
        existing: &'a ExistingData,
        resolver: &dyn TaskResolver,
        exempt_modes: &[String],
    ) -> Self {
        let required = if exempt_modes.iter().any(|m| m == task_mode.as_str()) {
            BTreeSet::new()
        } else {
            schema
                .required_properties()
                .filter(|name| !existing.contains_key(*name))
                .collect()
        };

        Self {
            task_mode,
            schema,
            existing,
            available: available_tasks(task_mode, schema, resolver),
            required,
        }
    }

    /// Tasks this mode accepts.
    pub fn available(&self) -> &BTreeSet<TaskId> {
        &self.available
    }

    /// Validate a batch, keeping candidate order.
    pub fn apply(&self, candidates: Vec<CandidateTask>) -> Vec<ValidatedTask> {
        candidates
            .into_iter()
            .filter_map(|candidate| self.validate(candidate))
            .collect()
    }

    fn validate(&self, candidate: CandidateTask) -> Option<ValidatedTask> {
        let task = match candidate.task {
            None => self.task_mode.clone(),
            Some(task) if self.available.contains(&task) => task,
            Some(task) => {
                warn!(
                    trace = "filter.unavailable_task",
                    task = %task,
                    mode = %self.task_mode,
                    "Dropping task not available in this mode"
                );
                return None;
            }
        };

        let mut missing = self.required.clone();
        let properties = candidate.properties.map(|props| {
            let mut kept = Properties::new();
            for (name, value) in props {
                if self.existing.contains_key(&name) {
                    continue;
                }
                if !self.schema.has_property(&name) {
                    debug!(
                        trace = "filter.unknown_property",
                        task = %task,
                        property = %name,
                        "Removing property unknown to schema"
                    );
                    continue;
                }
                missing.remove(name.as_str());
                kept.insert(name, value);
            }
            kept
        });

        if !missing.is_empty() {
            warn!(
                trace = "filter.required_missing",
                task = %task,
                missing = ?missing,
                "Dropping task missing required properties"
            );
            return None;
        }

        Some(ValidatedTask {
            id: Uuid::new_v4().to_string(),
            task,
            command: candidate.command,
            action: candidate.action,
            properties: properties.filter(|p| !p.is_empty()),
            start: candidate.start,
            end: candidate.end,
            label: None,
        })
    }
}

/// Every task reachable through the schema's commands and actions.
///
/// A mode whose commands resolve to nothing beyond itself is single-task.
fn available_tasks(
    task_mode: &TaskId,
    schema: &TaskSchema,
    resolver: &dyn TaskResolver,
) -> BTreeSet<TaskId> {
    let mut available = BTreeSet::new();
    for command in schema.commands.values() {
        if schema.actions.is_empty() {
            available.extend(resolver.command_to_task(command, None));
        } else {
            for action in &schema.actions {
                available.extend(resolver.command_to_task(command, Some(action)));
            }
        }
    }

    if available.iter().all(|task| task == task_mode) {
        available.clear();
        available.insert(task_mode.clone());
    }
    available
}

/// Validate candidates against the schema of `task_mode`.
///
/// The schema is fetched once per call, so every candidate in the batch sees
/// the same snapshot. An unknown mode or language is an error; invalid
/// candidates are not.
pub async fn filter_invalid_tasks(
    candidates: Vec<CandidateTask>,
    task_mode: &TaskId,
    language: &str,
    existing: &ExistingData,
    resolver: &dyn TaskResolver,
    provider: &dyn SchemaProvider,
    exempt_modes: &[String],
) -> Result<Vec<ValidatedTask>, EngineError> {
    let schema = provider.task_schema(task_mode, language).await?;
    let filter = TaskFilter::new(task_mode, &schema, existing, resolver, exempt_modes);
    Ok(filter.apply(candidates))
}
