//! The tool-calling SQL agent: tool registry, built-in tools and the run loop.

mod prompt;
mod registry;
mod runner;
mod schema;
mod tools;

pub use prompt::{DEFAULT_RESULT_LIMIT, system_prompt};
pub use registry::{HandlerError, ToolError, ToolHandler, ToolRegistry, ToolResult};
pub use runner::{Agent, AgentError, DEFAULT_MAX_TURNS, DEFAULT_TURN_TIMEOUT, Outcome, Step};
pub use schema::validate_arguments;
pub use tools::{Toolbox, standard_registry};
