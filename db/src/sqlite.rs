use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{Value, json};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::{Database, DatabaseResult, QueryError, guard};

const SAMPLE_ROWS: usize = 3;
const SAMPLE_CELL_CHARS: usize = 100;

#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Opens `url` (e.g. `sqlite://Chinook.db`) read-only.
    pub async fn connect(url: &str) -> Result<Self, QueryError> {
        let options = SqliteConnectOptions::from_str(url)?.read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        tracing::info!(url, "connected to database");
        Ok(Self { pool })
    }

    async fn fetch(&self, query: &str) -> Result<DatabaseResult, QueryError> {
        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        let mut results = DatabaseResult::default();

        let Some(first) = rows.first() else {
            return Ok(results);
        };

        for col in first.columns() {
            results
                .headers
                .push((col.name().to_string(), col.type_info().name().to_string()));
        }

        for row in &rows {
            results.rows.push(row_values(row));
        }

        Ok(results)
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn execute(&self, query: &str) -> Result<DatabaseResult, QueryError> {
        guard::ensure_read_only(query)?;

        let results = self.fetch(query).await?;
        tracing::debug!(query, rows = results.rows.len(), "executed query");
        Ok(results)
    }

    async fn list_tables(&self) -> Result<Vec<String>, QueryError> {
        let tables = sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(tables)
    }

    async fn table_info(&self, tables: &[String]) -> Result<String, QueryError> {
        let known = self.list_tables().await?;
        let missing: Vec<String> = tables
            .iter()
            .filter(|table| !known.contains(table))
            .cloned()
            .collect();

        if !missing.is_empty() {
            return Err(QueryError::UnknownTables(missing));
        }

        let mut sections = Vec::with_capacity(tables.len());

        for table in tables {
            let create = sqlx::query_scalar::<_, String>(
                "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?",
            )
            .bind(table)
            .fetch_one(&self.pool)
            .await?;

            let sample = self
                .fetch(&format!(
                    "SELECT * FROM {} LIMIT {SAMPLE_ROWS}",
                    quote_ident(table)
                ))
                .await?;

            sections.push(format!(
                "{}\n\n/*\n{SAMPLE_ROWS} rows from {table} table:\n{}\n*/",
                create.trim(),
                sample_block(&sample)
            ));
        }

        Ok(sections.join("\n\n"))
    }
}

fn row_values(row: &SqliteRow) -> Vec<Value> {
    (0..row.columns().len()).map(|i| cell_value(row, i)).collect()
}

fn cell_value(row: &SqliteRow, i: usize) -> Value {
    let type_name = match row.try_get_raw(i) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(_) => return Value::Null,
    };

    match type_name.as_str() {
        "BLOB" => row
            .try_get::<Vec<u8>, _>(i)
            .map(|bytes| json!(format!("<{} bytes>", bytes.len())))
            .unwrap_or(Value::Null),

        "BOOLEAN" => row
            .try_get::<bool, _>(i)
            .map(|v| json!(v))
            .unwrap_or(Value::Null),

        "INTEGER" => row
            .try_get::<i64, _>(i)
            .map(|v| json!(v))
            .or_else(|_| row.try_get::<f64, _>(i).map(float_value))
            .unwrap_or(Value::Null),

        "REAL" | "NUMERIC" => row
            .try_get::<f64, _>(i)
            .map(float_value)
            .or_else(|_| row.try_get::<i64, _>(i).map(|v| json!(v)))
            .unwrap_or(Value::Null),

        _ => row
            .try_get::<String, _>(i)
            .map(|v| json!(v))
            .unwrap_or(Value::Null),
    }
}

fn float_value(v: f64) -> Value {
    serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn sample_block(sample: &DatabaseResult) -> String {
    let mut lines = vec![sample.column_names().join("\t")];

    for row in &sample.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| {
                let text = match cell {
                    Value::String(s) => s.clone(),
                    Value::Null => "NULL".to_string(),
                    other => other.to_string(),
                };
                text.chars().take(SAMPLE_CELL_CHARS).collect()
            })
            .collect();
        lines.push(cells.join("\t"));
    }

    lines.join("\n")
}
