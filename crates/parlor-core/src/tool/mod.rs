//! Tool registry and dispatch.
//!
//! - `ToolSpec`: a named tool with an ordered parameter schema and a handler
//! - `ToolRegistry`: immutable name -> spec mapping, built once at startup
//! - `ToolDispatcher`: validates model-issued calls and runs handlers,
//!   turning every failure into a `ToolCallResult::Failure` value

pub mod arguments;
pub mod dispatcher;
pub mod handler;
pub mod registry;
pub mod spec;

pub use arguments::ToolArguments;
pub use dispatcher::ToolDispatcher;
pub use handler::{ToolHandler, tool_fn};
pub use registry::{ToolRegistry, ToolRegistryBuilder};
pub use spec::ToolSpec;
