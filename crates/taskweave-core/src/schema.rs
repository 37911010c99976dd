//! Task schema catalog and the collaborator traits the engine consumes.
//!
//! The engine never reads schema files itself. It asks a [`SchemaProvider`]
//! for the schema of the active task mode and a [`TaskResolver`] for the
//! canonical task behind a localized command/action pair. [`SchemaCatalog`]
//! is the TOML-backed implementation of both.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, TaskweaveError};
use crate::types::{TaskId, TaskSchema};

/// Maps a localized command/action pair to a canonical task.
pub trait TaskResolver: Send + Sync {
    fn command_to_task(&self, command: &str, action: Option<&str>) -> Option<TaskId>;
}

impl<F> TaskResolver for F
where
    F: Fn(&str, Option<&str>) -> Option<TaskId> + Send + Sync,
{
    fn command_to_task(&self, command: &str, action: Option<&str>) -> Option<TaskId> {
        self(command, action)
    }
}

/// Supplies the schema for a task mode in a given language.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    async fn task_schema(&self, task_mode: &TaskId, language: &str) -> Result<TaskSchema>;
}

/// One command/action route to a canonical task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    pub task: TaskId,
}

/// Schemas and routes for one language.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageCatalog {
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskSchema>,
    #[serde(default)]
    pub routes: Vec<Route>,
}

/// All task schemas, keyed by language.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaCatalog {
    #[serde(default)]
    pub languages: BTreeMap<String, LanguageCatalog>,
}

impl SchemaCatalog {
    /// Load a catalog from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&content)?;
        info!(
            languages = catalog.languages.len(),
            "Schema catalog loaded from {}",
            path.display()
        );
        Ok(catalog)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn language(&self, language: &str) -> Result<&LanguageCatalog> {
        self.languages
            .get(language)
            .ok_or_else(|| TaskweaveError::UnknownLanguage(language.to_string()))
    }

    /// Build a resolver over the routes of one language.
    pub fn resolver(&self, language: &str) -> Result<CatalogResolver> {
        Ok(CatalogResolver {
            routes: self.language(language)?.routes.clone(),
        })
    }
}

#[async_trait]
impl SchemaProvider for SchemaCatalog {
    async fn task_schema(&self, task_mode: &TaskId, language: &str) -> Result<TaskSchema> {
        self.language(language)?
            .tasks
            .get(task_mode.as_str())
            .cloned()
            .ok_or_else(|| TaskweaveError::UnknownTaskMode {
                mode: task_mode.to_string(),
                language: language.to_string(),
            })
    }
}

/// Route-table resolver for one language.
///
/// An exact command+action route wins; otherwise a command-only route for
/// the same command applies. Command and action words match ASCII
/// case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct CatalogResolver {
    routes: Vec<Route>,
}

impl TaskResolver for CatalogResolver {
    fn command_to_task(&self, command: &str, action: Option<&str>) -> Option<TaskId> {
        let same_command = |r: &&Route| r.command.eq_ignore_ascii_case(command);

        if let Some(action) = action {
            let exact = self.routes.iter().filter(same_command).find(|r| {
                r.action
                    .as_deref()
                    .is_some_and(|a| a.eq_ignore_ascii_case(action))
            });
            if let Some(route) = exact {
                return Some(route.task.clone());
            }
        }

        self.routes
            .iter()
            .filter(same_command)
            .find(|r| r.action.is_none())
            .map(|r| r.task.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
        [languages.en.tasks.Routine]
        label = "Routines"
        commands = { routine = "routine" }
        actions = ["add", "delete"]
        properties = ["description", { name = "name", type = "string", is_required = true }]

        [languages.en.tasks.BotAdd]
        label = "Add a bot"
        commands = { bot = "bot" }

        [[languages.en.routes]]
        command = "routine"
        action = "add"
        task = "RoutineAdd"

        [[languages.en.routes]]
        command = "routine"
        action = "delete"
        task = "RoutineDelete"

        [[languages.en.routes]]
        command = "bot"
        task = "BotAdd"
    "#;

    fn catalog() -> SchemaCatalog {
        SchemaCatalog::from_toml_str(CATALOG).unwrap()
    }

    #[tokio::test]
    async fn test_task_schema_lookup() {
        let schema = catalog()
            .task_schema(&TaskId::new("Routine"), "en")
            .await
            .unwrap();
        assert_eq!(schema.label, "Routines");
        assert_eq!(schema.actions, vec!["add", "delete"]);
        assert_eq!(schema.required_properties().collect::<Vec<_>>(), vec!["name"]);
    }

    #[tokio::test]
    async fn test_unknown_task_mode() {
        let err = catalog()
            .task_schema(&TaskId::new("Nope"), "en")
            .await
            .unwrap_err();
        assert!(matches!(err, TaskweaveError::UnknownTaskMode { .. }));
    }

    #[tokio::test]
    async fn test_unknown_language() {
        let err = catalog()
            .task_schema(&TaskId::new("Routine"), "fr")
            .await
            .unwrap_err();
        assert!(matches!(err, TaskweaveError::UnknownLanguage(_)));
        assert!(catalog().resolver("fr").is_err());
    }

    #[test]
    fn test_resolver_exact_route() {
        let resolver = catalog().resolver("en").unwrap();
        assert_eq!(
            resolver.command_to_task("routine", Some("add")),
            Some(TaskId::new("RoutineAdd"))
        );
        assert_eq!(
            resolver.command_to_task("Routine", Some("DELETE")),
            Some(TaskId::new("RoutineDelete"))
        );
    }

    #[test]
    fn test_resolver_command_only_fallback() {
        let resolver = catalog().resolver("en").unwrap();
        assert_eq!(resolver.command_to_task("bot", None), Some(TaskId::new("BotAdd")));
        assert_eq!(
            resolver.command_to_task("bot", Some("whatever")),
            Some(TaskId::new("BotAdd"))
        );
        assert_eq!(resolver.command_to_task("routine", Some("rename")), None);
        assert_eq!(resolver.command_to_task("routine", None), None);
        assert_eq!(resolver.command_to_task("unknown", None), None);
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |command: &str, _action: Option<&str>| {
            (command == "add").then(|| TaskId::new("Add"))
        };
        assert_eq!(resolver.command_to_task("add", None), Some(TaskId::new("Add")));
        assert_eq!(resolver.command_to_task("drop", None), None);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.toml");
        std::fs::write(&path, CATALOG).unwrap();
        let loaded = SchemaCatalog::load(&path).unwrap();
        assert_eq!(loaded.languages["en"].routes.len(), 3);
        assert!(loaded.languages["en"].tasks.contains_key("BotAdd"));
    }

    #[test]
    fn test_invalid_catalog() {
        let err = SchemaCatalog::from_toml_str("[languages.en\n").unwrap_err();
        assert!(matches!(err, TaskweaveError::Config(_)));
    }
}
