// ocular-core/src/lib.rs

#![doc = include_str!("../../README.md")]

pub mod config;
pub mod errors;
pub mod executor;
pub mod progress;
pub mod response;
pub mod tools;


pub use config::OcularConfig;
pub use errors::OcularError;
pub use executor::execute_command;
pub use progress::{ChannelProgress, ProgressSink, ProgressUpdate, TracingProgress};
pub use response::ServiceResponse;
pub use tools::{run_tool, ServiceTool, ToolError, ToolRegistry, ToolSettings};

pub use async_trait::async_trait;
