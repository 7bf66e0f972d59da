//! # alice-core
//!
//! Core types, traits, and abstractions for the Alice proposal assistant.
//!
//! This crate provides the data structures and trait seams that the storage
//! (`alice-db`), remote service (`alice-inference`), and HTTP (`alice-api`)
//! crates depend on.
//!
//! ## Logging conventions
//!
//! All crates log through `tracing` with these structured fields:
//!
//! | Field         | Meaning                                             |
//! |---------------|-----------------------------------------------------|
//! | `subsystem`   | `api`, `db`, or `inference`                         |
//! | `component`   | module-level name (`orchestrator`, `normalizer`...) |
//! | `op`          | operation name (`run_analysis`, `persist`...)       |
//! | `project_id`  | project the operation belongs to                    |
//! | `duration_ms` | elapsed time of a remote or database call           |
//!
//! Levels: `error` for failures surfaced to the caller, `warn` for records
//! skipped or substituted while the operation continues, `info` for
//! operation completion, `debug` for per-item detail. File contents and
//! remote response bodies are never logged.

pub mod defaults;
pub mod error;
pub mod file_safety;
pub mod json;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use file_safety::{detect_content_type, sanitize_filename, validate_file, ValidationResult};
pub use json::{into_object, JsonObject, JsonObjectExt};
pub use models::*;
pub use traits::*;
