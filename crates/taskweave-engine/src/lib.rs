//! Task extraction engine for taskweave.
//!
//! Finds slash commands embedded in model output, separates suggested
//! commands from ones to run, validates them against a task schema, and
//! strips them from the user-visible message.

pub mod charclass;
pub mod engine;
pub mod error;
pub mod extract;
pub mod filter;
pub mod json;
pub mod remove;
pub mod transition;
pub mod wrapped;

pub use engine::{parse_mode, TaskEngine};
pub use error::EngineError;
pub use extract::{extract_tasks, StreamingExtractor};
pub use filter::{filter_invalid_tasks, TaskFilter};
pub use json::extract_json_tasks;
pub use remove::remove_tasks;
pub use transition::{transition, ParseSection, TransitionEvent, TransitionState};
pub use wrapped::{find_wrapped_tasks, WrappedTasks};
