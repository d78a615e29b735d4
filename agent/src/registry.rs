use std::error::Error;
use std::fmt::Display;
use std::sync::Arc;

use ai::{ToolCall, ToolSpec, Value};
use async_trait::async_trait;

use crate::schema::validate_arguments;

pub type HandlerError = Box<dyn Error + Send + Sync>;

/// The code behind a registered tool. Receives arguments that already passed
/// schema validation.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Value) -> Result<String, HandlerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{name} is not a valid tool, try one of [{available}]")]
    UnknownTool { name: String, available: String },

    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("tool {0} is already registered")]
    DuplicateTool(String),
}

/// Outcome of one tool call, addressed to the call that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub call_id: String,
    pub name: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(call: &ToolCall, content: String) -> Self {
        Self {
            call_id: call.id.clone(),
            name: call.name.clone(),
            content,
            is_error: false,
        }
    }

    pub fn failure(call: &ToolCall, error: impl Display) -> Self {
        Self {
            call_id: call.id.clone(),
            name: call.name.clone(),
            content: format!("Error: {error}"),
            is_error: true,
        }
    }
}

struct Registered {
    spec: ToolSpec,
    handler: Arc<dyn ToolHandler>,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Registered>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        spec: ToolSpec,
        handler: impl ToolHandler + 'static,
    ) -> Result<(), ToolError> {
        if self.get(&spec.name).is_some() {
            return Err(ToolError::DuplicateTool(spec.name));
        }

        tracing::debug!(tool = %spec.name, "registered tool");
        self.tools.push(Registered {
            spec,
            handler: Arc::new(handler),
        });
        Ok(())
    }

    /// Tool specs in registration order, as offered to the model.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|tool| tool.spec.clone()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.spec.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    fn get(&self, name: &str) -> Option<&Registered> {
        self.tools.iter().find(|tool| tool.spec.name == name)
    }

    /// Runs `call`. Unknown names and invalid arguments are rejected before
    /// any handler runs; a failing handler becomes an error result.
    pub async fn dispatch(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let tool = self.get(&call.name).ok_or_else(|| ToolError::UnknownTool {
            name: call.name.clone(),
            available: self.names().join(", "),
        })?;

        let arguments = validate_arguments(&tool.spec.parameters, &call.arguments).map_err(
            |reason| ToolError::InvalidArguments {
                tool: call.name.clone(),
                reason,
            },
        )?;

        match tool.handler.call(arguments).await {
            Ok(content) => {
                tracing::info!(tool = %call.name, id = %call.id, "tool call succeeded");
                Ok(ToolResult::success(call, content))
            }
            Err(e) => {
                tracing::warn!(tool = %call.name, id = %call.id, error = %e, "tool call failed");
                Ok(ToolResult::failure(call, e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ai::{create_tool, json};
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Clone, Default)]
    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ToolHandler for Counting {
        async fn call(&self, arguments: Value) -> Result<String, HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match arguments.get("query").and_then(Value::as_str) {
                Some("boom") => Err("no such table: Nope".into()),
                Some(query) => Ok(format!("ran {query}")),
                None => Ok(String::new()),
            }
        }
    }

    fn query_spec() -> ToolSpec {
        create_tool(
            "sql_db_query",
            "Run a query",
            json!({
                "type": "object",
                "properties": {"query": {"type": "string"}},
                "required": ["query"],
            }),
        )
    }

    fn registry() -> (ToolRegistry, Counting) {
        let handler = Counting::default();
        let mut registry = ToolRegistry::new();
        registry.register(query_spec(), handler.clone()).unwrap();
        (registry, handler)
    }

    #[tokio::test]
    async fn dispatch_runs_the_handler() {
        let (registry, handler) = registry();
        let call = ToolCall::new("call_1", "sql_db_query", json!({"query": "SELECT 1"}));

        let result = registry.dispatch(&call).await.unwrap();
        assert_eq!(
            result,
            ToolResult {
                call_id: "call_1".into(),
                name: "sql_db_query".into(),
                content: "ran SELECT 1".into(),
                is_error: false,
            }
        );
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_tool_has_no_side_effect() {
        let (registry, handler) = registry();
        let call = ToolCall::new("call_1", "drop_everything", json!({}));

        let err = registry.dispatch(&call).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool { ref name, .. } if name == "drop_everything"));
        assert_eq!(
            err.to_string(),
            "drop_everything is not a valid tool, try one of [sql_db_query]"
        );
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_arguments_are_rejected_before_the_handler() {
        let (registry, handler) = registry();
        let call = ToolCall::new("call_1", "sql_db_query", json!({"query": 42}));

        let err = registry.dispatch(&call).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn handler_failure_becomes_result_content() {
        let (registry, _) = registry();
        let call = ToolCall::new("call_9", "sql_db_query", json!({"query": "boom"}));

        let result = registry.dispatch(&call).await.unwrap();
        assert!(result.is_error);
        assert_eq!(result.content, "Error: no such table: Nope");
        assert_eq!(result.call_id, "call_9");
    }

    #[test]
    fn duplicate_names_are_refused() {
        let (mut registry, _) = registry();
        let err = registry.register(query_spec(), Counting::default()).unwrap_err();
        assert!(matches!(err, ToolError::DuplicateTool(name) if name == "sql_db_query"));
        assert_eq!(registry.len(), 1);
    }
}
