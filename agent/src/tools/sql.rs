use std::sync::Arc;

use ai::{ChatModel, Conversation, ToolSpec, Value, create_tool, json};
use async_trait::async_trait;
use db::Database;

use crate::registry::{HandlerError, ToolHandler};

const QUERY_CHECKER: &str = "Double check the {dialect} query above for common mistakes, including:
- Using NOT IN with NULL values
- Using UNION when UNION ALL should have been used
- Using BETWEEN for exclusive ranges
- Data type mismatch in predicates
- Properly quoting identifiers
- Using the correct number of arguments for functions
- Casting to the correct data type
- Using the proper columns for joins

If there are any of the above mistakes, rewrite the query. If there are no mistakes, just reproduce the original query.

Output the final SQL query only.";

fn string_arg<'a>(arguments: &'a Value, name: &str) -> &'a str {
    arguments.get(name).and_then(Value::as_str).unwrap_or_default()
}

pub(crate) fn query_spec() -> ToolSpec {
    create_tool(
        "sql_db_query",
        "Input to this tool is a detailed and correct SQL query, output is a result from the database. \
If the query is not correct, an error message will be returned. If an error is returned, rewrite the query, \
check the query, and try again. If you encounter an issue with Unknown column 'xxxx' in 'field list', \
use sql_db_schema to query the correct table fields.",
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "A detailed and correct SQL query.",
                },
            },
            "required": ["query"],
        }),
    )
}

pub(crate) struct QueryTool {
    pub(crate) database: Arc<dyn Database>,
}

#[async_trait]
impl ToolHandler for QueryTool {
    async fn call(&self, arguments: Value) -> Result<String, HandlerError> {
        let result = self.database.execute(string_arg(&arguments, "query")).await?;
        Ok(result.to_json())
    }
}

pub(crate) fn schema_spec() -> ToolSpec {
    create_tool(
        "sql_db_schema",
        "Input to this tool is a comma-separated list of tables, output is the schema and sample rows \
for those tables. Be sure that the tables actually exist by calling sql_db_list_tables first! \
Example Input: table1, table2, table3",
        json!({
            "type": "object",
            "properties": {
                "table_names": {
                    "type": "string",
                    "description": "A comma-separated list of the table names for which to return the schema. Example input: 'table1, table2, table3'",
                },
            },
            "required": ["table_names"],
        }),
    )
}

pub(crate) struct SchemaTool {
    pub(crate) database: Arc<dyn Database>,
}

#[async_trait]
impl ToolHandler for SchemaTool {
    async fn call(&self, arguments: Value) -> Result<String, HandlerError> {
        let tables: Vec<String> = string_arg(&arguments, "table_names")
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToString::to_string)
            .collect();

        Ok(self.database.table_info(&tables).await?)
    }
}

pub(crate) fn list_tables_spec() -> ToolSpec {
    create_tool(
        "sql_db_list_tables",
        "Input is an empty string, output is a comma-separated list of tables in the database.",
        json!({
            "type": "object",
            "properties": {
                "tool_input": {
                    "type": "string",
                    "description": "An empty string",
                },
            },
            "required": [],
        }),
    )
}

pub(crate) struct ListTablesTool {
    pub(crate) database: Arc<dyn Database>,
}

#[async_trait]
impl ToolHandler for ListTablesTool {
    async fn call(&self, _arguments: Value) -> Result<String, HandlerError> {
        Ok(self.database.list_tables().await?.join(", "))
    }
}

pub(crate) fn query_checker_spec() -> ToolSpec {
    create_tool(
        "sql_db_query_checker",
        "Use this tool to double check if your query is correct before executing it. \
Always use this tool before executing a query with sql_db_query!",
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "A detailed and SQL query to be checked.",
                },
            },
            "required": ["query"],
        }),
    )
}

/// Hands the query to the chat model with a fixed review checklist.
pub(crate) struct QueryCheckerTool {
    pub(crate) model: Arc<dyn ChatModel>,
    pub(crate) dialect: String,
}

impl QueryCheckerTool {
    fn instructions(&self) -> String {
        QUERY_CHECKER.replace("{dialect}", &self.dialect)
    }
}

#[async_trait]
impl ToolHandler for QueryCheckerTool {
    async fn call(&self, arguments: Value) -> Result<String, HandlerError> {
        let conversation = Conversation::new(self.instructions(), string_arg(&arguments, "query"));
        let reply = self.model.complete(&conversation, &[]).await?;
        Ok(reply.content)
    }
}
