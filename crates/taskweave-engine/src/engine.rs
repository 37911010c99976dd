//! The task pipeline: extract, classify, validate, heal, and strip.

use std::collections::HashMap;
use std::sync::Arc;

use taskweave_core::config::ExtractionConfig;
use taskweave_core::schema::{SchemaProvider, TaskResolver};
use taskweave_core::types::{
    CandidateTask, ExistingData, MessageTasks, ProcessingMode, TaskId, TaskSchema, ValidatedTask,
};
use tracing::{debug, info};

use crate::error::EngineError;
use crate::extract::extract_tasks;
use crate::filter::TaskFilter;
use crate::json::extract_json_tasks;
use crate::remove::remove_tasks;
use crate::wrapped::find_wrapped_tasks;

/// Parse a processing mode name, failing fast on anything unsupported.
pub fn parse_mode(raw: &str) -> Result<ProcessingMode, EngineError> {
    raw.parse()
        .map_err(|_| EngineError::UnsupportedMode(raw.to_string()))
}

/// Turns model output into runnable and suggested tasks.
///
/// Holds no per-message state, so one engine serves concurrent callers.
#[derive(Clone)]
pub struct TaskEngine {
    config: ExtractionConfig,
    resolver: Arc<dyn TaskResolver>,
    provider: Arc<dyn SchemaProvider>,
}

impl TaskEngine {
    pub fn new(
        config: ExtractionConfig,
        resolver: Arc<dyn TaskResolver>,
        provider: Arc<dyn SchemaProvider>,
    ) -> Self {
        Self {
            config,
            resolver,
            provider,
        }
    }

    /// Raw text-mode candidates, before any validation.
    pub fn extract_candidates(&self, message: &str) -> Vec<CandidateTask> {
        extract_tasks(message, self.resolver.as_ref())
    }

    /// Run the full pipeline over one message.
    ///
    /// Fails only for oversized messages or an unknown task mode; malformed
    /// or invalid commands are dropped.
    pub async fn get_valid_tasks_from_message(
        &self,
        message: &str,
        task_mode: &TaskId,
        mode: ProcessingMode,
        existing: &ExistingData,
    ) -> Result<MessageTasks, EngineError> {
        if message.chars().count() > self.config.max_message_chars {
            return Err(EngineError::MessageTooLong(self.config.max_message_chars));
        }

        let language = self.config.language.as_str();
        let schema = self.provider.task_schema(task_mode, language).await?;
        let filter = TaskFilter::new(
            task_mode,
            &schema,
            existing,
            self.resolver.as_ref(),
            &self.config.required_exempt_modes,
        );

        let result = match mode {
            ProcessingMode::Text => {
                let mut candidates = self.extract_candidates(message);
                let wrapper = find_wrapped_tasks(
                    message,
                    &candidates,
                    &self.config.suggestion_label,
                    self.config.delimiter(),
                )
                .pop();

                let mut suggested = Vec::new();
                if let Some(wrapper) = &wrapper {
                    for index in wrapper.task_indices.iter().rev() {
                        suggested.push(candidates.remove(*index));
                    }
                    suggested.reverse();
                }

                let mut tasks_to_run = filter.apply(candidates);
                let mut tasks_to_suggest = filter.apply(suggested);
                heal_actions(&mut tasks_to_run, &schema);
                heal_actions(&mut tasks_to_suggest, &schema);
                self.resolve_labels(&mut tasks_to_run, task_mode, &schema).await;
                self.resolve_labels(&mut tasks_to_suggest, task_mode, &schema)
                    .await;

                let mut spans: Vec<(usize, usize)> =
                    tasks_to_run.iter().map(|t| (t.start, t.end)).collect();
                if let Some(wrapper) = wrapper.filter(|_| !tasks_to_suggest.is_empty()) {
                    spans.push((wrapper.wrapper_start, wrapper.wrapper_end));
                }
                let message_without_tasks = remove_tasks(message, &spans).trim().to_string();

                MessageTasks {
                    tasks_to_run,
                    tasks_to_suggest,
                    message_without_tasks,
                }
            }
            ProcessingMode::Json => {
                let candidates = extract_json_tasks(message, task_mode, self.resolver.as_ref());
                let mut tasks_to_run = filter.apply(candidates);
                heal_actions(&mut tasks_to_run, &schema);
                self.resolve_labels(&mut tasks_to_run, task_mode, &schema).await;

                MessageTasks {
                    tasks_to_run,
                    ..MessageTasks::default()
                }
            }
        };

        info!(
            mode = %mode,
            task_mode = %task_mode,
            run = result.tasks_to_run.len(),
            suggest = result.tasks_to_suggest.len(),
            "Message processed"
        );
        Ok(result)
    }

    /// Fill each task's label from its own schema, else the mode's.
    async fn resolve_labels(
        &self,
        tasks: &mut [ValidatedTask],
        task_mode: &TaskId,
        mode_schema: &TaskSchema,
    ) {
        let mut cache: HashMap<TaskId, String> = HashMap::new();
        cache.insert(task_mode.clone(), mode_schema.label.clone());

        for task in tasks.iter_mut() {
            if !cache.contains_key(&task.task) {
                let label = match self
                    .provider
                    .task_schema(&task.task, &self.config.language)
                    .await
                {
                    Ok(schema) => schema.label,
                    Err(_) => mode_schema.label.clone(),
                };
                cache.insert(task.task.clone(), label);
            }
            task.label = cache
                .get(&task.task)
                .filter(|label| !label.is_empty())
                .cloned();
        }
    }
}

/// Clear actions the active schema does not recognise.
fn heal_actions(tasks: &mut [ValidatedTask], schema: &TaskSchema) {
    for task in tasks.iter_mut() {
        let unknown = task
            .action
            .as_deref()
            .is_some_and(|action| !schema.has_action(action));
        if unknown {
            debug!(
                trace = "pipeline.action_healed",
                task = %task.task,
                action = ?task.action,
                "Clearing action unknown to schema"
            );
            task.action = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskweave_core::schema::SchemaCatalog;

    const CATALOG: &str = r#"
        [languages.en.tasks.Routine]
        label = "Routines"
        commands = { routine = "routine" }
        actions = ["add"]
        properties = [{ name = "name", is_required = true }]

        [languages.en.tasks.RoutineAdd]
        label = "Add routine"

        [[languages.en.routes]]
        command = "routine"
        action = "add"
        task = "RoutineAdd"
    "#;

    fn engine(config: ExtractionConfig) -> TaskEngine {
        let catalog = SchemaCatalog::from_toml_str(CATALOG).unwrap();
        let resolver = catalog.resolver("en").unwrap();
        TaskEngine::new(config, Arc::new(resolver), Arc::new(catalog))
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("text").unwrap(), ProcessingMode::Text);
        assert_eq!(parse_mode("json").unwrap(), ProcessingMode::Json);
        assert!(matches!(
            parse_mode("xml"),
            Err(EngineError::UnsupportedMode(m)) if m == "xml"
        ));
    }

    #[test]
    fn test_heal_actions() {
        let schema = TaskSchema {
            actions: vec!["add".to_string()],
            ..TaskSchema::default()
        };
        let task = |action: &str| ValidatedTask {
            id: String::new(),
            task: TaskId::new("Routine"),
            command: "routine".to_string(),
            action: Some(action.to_string()),
            properties: None,
            start: 0,
            end: 0,
            label: None,
        };
        let mut tasks = vec![task("add"), task("fly")];
        heal_actions(&mut tasks, &schema);
        assert_eq!(tasks[0].action.as_deref(), Some("add"));
        assert_eq!(tasks[1].action, None);
    }

    #[tokio::test]
    async fn test_message_too_long() {
        let config = ExtractionConfig {
            max_message_chars: 4,
            ..ExtractionConfig::default()
        };
        let result = engine(config)
            .get_valid_tasks_from_message(
                "hello",
                &TaskId::new("Routine"),
                ProcessingMode::Text,
                &ExistingData::new(),
            )
            .await;
        assert!(matches!(result, Err(EngineError::MessageTooLong(4))));
    }

    #[tokio::test]
    async fn test_label_from_resolved_task_schema() {
        let result = engine(ExtractionConfig::default())
            .get_valid_tasks_from_message(
                "/routine add name='Run'",
                &TaskId::new("Routine"),
                ProcessingMode::Text,
                &ExistingData::new(),
            )
            .await
            .unwrap();
        assert_eq!(result.tasks_to_run.len(), 1);
        assert_eq!(result.tasks_to_run[0].label.as_deref(), Some("Add routine"));
        assert_eq!(result.message_without_tasks, "");
    }
}
