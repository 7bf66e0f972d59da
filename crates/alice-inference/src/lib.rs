//! # alice-inference
//!
//! Client for the remote document analysis and generation service.
//!
//! This crate provides:
//! - [`RemoteInferenceClient`]: multipart analysis upload, chat turns,
//!   table-of-contents lookup, law verification, and draft comparison
//! - [`ConversationRouter`]: endpoint selection and reply interpretation for chat turns
//! - [`InferenceConfig`]: TOML/env configuration with validation
//!
//! # Feature Flags
//!
//! - `mock`: Enable [`mock::MockInferenceService`] for downstream tests
//!
//! # Example
//!
//! ```rust,no_run
//! use alice_inference::{InferenceConfig, InferenceService, RemoteInferenceClient};
//!
//! #[tokio::main]
//! async fn main() -> alice_core::Result<()> {
//!     let client = RemoteInferenceClient::new(InferenceConfig::load()?)?;
//!     let toc = client.fetch_table_of_contents(42).await?;
//!     println!("{} keys", toc.len());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod conversation;

// Mock inference service for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use alice_core::*;

pub use client::{validate_analyze_input, RemoteInferenceClient};
pub use config::{ConfigError, ConfigResult, InferenceConfig, RoutingPolicy};
pub use conversation::{interpret_response, ConversationRouter};
