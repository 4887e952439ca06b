//! Shared data model, error type, and configuration for the voice-agent
//! conductor: the `Turn`/`ToolCallRequest`/`ToolDefinition` types every
//! other crate exchanges, plus the ambient `Error`/`Config`/`TraceEvent`
//! machinery.

pub mod config;
pub mod error;
pub mod stream;
pub mod tool;
pub mod trace;

pub use error::{Error, Result};
