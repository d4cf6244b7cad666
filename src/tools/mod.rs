// src/tools/mod.rs

pub mod args;
pub mod dispatcher;
pub mod handlers;
pub mod registry;

pub use args::ToolCall;
pub use dispatcher::{Dispatcher, ExecutionContext, Session};
pub use registry::{RegistryBuilder, RegistryError, ToolDescriptor, ToolRegistry};
