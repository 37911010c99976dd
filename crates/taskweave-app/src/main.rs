//! Taskweave binary - composition root.
//!
//! 1. Load configuration from TOML
//! 2. Load the schema catalog and build the command resolver
//! 3. Read a message from a file or stdin
//! 4. Run the task pipeline and print the result as JSON

mod cli;

use std::sync::Arc;

use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use taskweave_core::config::TaskweaveConfig;
use taskweave_core::schema::SchemaCatalog;
use taskweave_core::types::{ExistingData, TaskId};
use taskweave_engine::{parse_mode, TaskEngine};

use cli::CliArgs;

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// `RUST_LOG` takes precedence over `level`.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Load the config file and switch tracing to its log level.
///
/// Must run after the subscriber is installed so load failures are reported.
fn load_config(
    args: &CliArgs,
    filter: &FilterHandle,
) -> Result<TaskweaveConfig, Box<dyn std::error::Error>> {
    let config_file = args.resolve_config_path();
    let config = TaskweaveConfig::load_or_default(&config_file);
    filter.reload(env_filter(&args.resolve_log_level(&config.general.log_level)))?;
    tracing::debug!(path = %config_file.display(), "Configuration resolved");
    Ok(config)
}

async fn read_message(args: &CliArgs) -> std::io::Result<String> {
    match args.input_path() {
        Some(path) => tokio::fs::read_to_string(path).await,
        None => {
            let mut message = String::new();
            tokio::io::stdin().read_to_string(&mut message).await?;
            Ok(message)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Tracing goes to stderr so stdout stays machine-readable.
    let (filter, filter_handle) =
        reload::Layer::new(env_filter(args.log_level.as_deref().unwrap_or("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = load_config(&args, &filter_handle)?;

    if let Some(language) = &args.language {
        config.extraction.language = language.clone();
    }
    let mode = match &args.mode {
        Some(raw) => parse_mode(raw)?,
        None => config.extraction.mode,
    };
    let existing: ExistingData = match &args.existing {
        Some(raw) => serde_json::from_str(raw)?,
        None => ExistingData::new(),
    };

    let schema_path = args.resolve_schema_path(&config.schema.path);
    let catalog = SchemaCatalog::load(&schema_path)?;
    let resolver = catalog.resolver(&config.extraction.language)?;

    let message = read_message(&args).await?;
    let engine = TaskEngine::new(config.extraction.clone(), Arc::new(resolver), Arc::new(catalog));

    if args.candidates {
        let candidates = engine.extract_candidates(&message);
        println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(());
    }

    let task_mode = TaskId::new(args.task_mode.as_str());
    let result = engine
        .get_valid_tasks_from_message(&message, &task_mode, mode, &existing)
        .await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
