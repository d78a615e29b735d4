use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A callable action as advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON-Schema-like object: `type`, `properties`, `required`.
    pub parameters: Value,
}

impl ToolSpec {
    /// Names listed under `required` in the parameter schema.
    pub fn required(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// The `{"type": "function", "function": {...}}` envelope used on the wire.
    pub fn to_wire(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            },
        })
    }
}

/// Helper function to create a tool with the given name, description, and parameters
///
/// # Example
/// ```rust
/// use ai::{create_tool, json};
///
/// let tool = create_tool(
///     "sql_db_query",
///     "Execute a SQL query against the database",
///     json!({
///         "type": "object",
///         "properties": {
///             "query": {
///                 "type": "string",
///                 "description": "The SQL query to execute",
///             },
///         },
///         "required": ["query"],
///     }),
/// );
/// assert_eq!(tool.required(), vec!["query"]);
/// ```
pub fn create_tool(
    name: impl Into<String>,
    description: impl Into<String>,
    parameters: Value,
) -> ToolSpec {
    ToolSpec {
        name: name.into(),
        description: description.into(),
        parameters,
    }
}
