pub mod guard;
pub mod sqlite;

use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

pub use sqlite::SqliteDatabase;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("empty query")]
    Empty,

    #[error("could not parse SQL: {0}")]
    Malformed(String),

    #[error("only read-only queries are allowed, got {0}")]
    Forbidden(String),

    #[error("table_names {0:?} not found in database")]
    UnknownTables(Vec<String>),

    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

/// Read-only access to a relational store.
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute a read-only query and return its rows.
    async fn execute(&self, query: &str) -> Result<DatabaseResult, QueryError>;

    /// Names of all usable tables, sorted.
    async fn list_tables(&self) -> Result<Vec<String>, QueryError>;

    /// `CREATE TABLE` statement plus a few sample rows for each table.
    async fn table_info(&self, tables: &[String]) -> Result<String, QueryError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatabaseResult {
    /// `(column_name, column_type)` pairs.
    pub headers: Vec<(String, String)>,
    pub rows: Vec<Vec<Value>>,
}

impl DatabaseResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.headers.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Compact JSON rendering handed back to the model.
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "columns": self.column_names(),
            "rows": self.rows,
        })
        .to_string()
    }
}

static NUMERIC_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+\b").expect("static regex"));

/// Runs `query` and turns every non-null cell into a candidate proper noun.
pub async fn proper_nouns(db: &dyn Database, query: &str) -> Result<Vec<String>, QueryError> {
    let result = db.execute(query).await?;
    let nouns = normalize_nouns(result.rows.into_iter().flatten());
    tracing::debug!(query, count = nouns.len(), "collected proper nouns");
    Ok(nouns)
}

/// Strips standalone numbers, trims, drops empties and de-duplicates in first-seen order.
pub fn normalize_nouns(values: impl IntoIterator<Item = Value>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut nouns = Vec::new();

    for value in values {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s,
            other => other.to_string(),
        };

        let cleaned = NUMERIC_TOKEN.replace_all(&text, "").trim().to_string();
        if cleaned.is_empty() {
            continue;
        }

        if seen.insert(cleaned.clone()) {
            nouns.push(cleaned);
        }
    }

    nouns
}
