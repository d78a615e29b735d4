use std::sync::Arc;

use ai::{ToolSpec, Value, create_tool, json};
use async_trait::async_trait;
use nouns::ProperNounResolver;

use crate::registry::{HandlerError, ToolHandler};

pub(crate) fn search_spec() -> ToolSpec {
    create_tool(
        "search_proper_nouns",
        "Use to look up values to filter on. Input is an approximate spelling of the proper noun, \
output is valid proper nouns. Use the noun most similar to the search.",
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "query to look up in retriever",
                },
            },
            "required": ["query"],
        }),
    )
}

pub(crate) struct SearchProperNouns {
    pub(crate) resolver: Arc<ProperNounResolver>,
    pub(crate) top_k: usize,
}

#[async_trait]
impl ToolHandler for SearchProperNouns {
    async fn call(&self, arguments: Value) -> Result<String, HandlerError> {
        let candidate = arguments
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let hits = self.resolver.resolve(candidate, self.top_k).await?;
        Ok(hits.join("\n\n"))
    }
}
