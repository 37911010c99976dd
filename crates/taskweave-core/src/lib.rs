//! Shared types, configuration, and schema catalog for taskweave.

pub mod config;
pub mod error;
pub mod schema;
pub mod types;

pub use config::TaskweaveConfig;
pub use error::{Result, TaskweaveError};
pub use schema::{CatalogResolver, SchemaCatalog, SchemaProvider, TaskResolver};
pub use types::*;
