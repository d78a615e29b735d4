//! Rejects anything that is not a single read-only query before it reaches the store.

use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

use crate::QueryError;

pub fn ensure_read_only(sql: &str) -> Result<(), QueryError> {
    if sql.trim().trim_end_matches(';').trim().is_empty() {
        return Err(QueryError::Empty);
    }

    let statements = Parser::parse_sql(&SQLiteDialect {}, sql)
        .map_err(|e| QueryError::Malformed(e.to_string()))?;

    let [statement] = statements.as_slice() else {
        return Err(QueryError::Malformed(format!(
            "expected exactly one statement, found {}",
            statements.len()
        )));
    };

    match statement {
        Statement::Query(query) if is_read_only(query) => Ok(()),
        _ => Err(QueryError::Forbidden(leading_keyword(sql))),
    }
}

fn is_read_only(query: &Query) -> bool {
    let ctes_read_only = query
        .with
        .as_ref()
        .is_none_or(|with| with.cte_tables.iter().all(|cte| is_read_only(&cte.query)));

    ctes_read_only && is_read_only_body(&query.body)
}

fn is_read_only_body(body: &SetExpr) -> bool {
    match body {
        SetExpr::Select(_) | SetExpr::Values(_) => true,
        SetExpr::Query(query) => is_read_only(query),
        SetExpr::SetOperation { left, right, .. } => {
            is_read_only_body(left) && is_read_only_body(right)
        }
        _ => false,
    }
}

fn leading_keyword(sql: &str) -> String {
    sql.split_whitespace()
        .next()
        .unwrap_or_default()
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_selects() {
        for sql in [
            "SELECT Name FROM Artist",
            "select a.Title from Album a join Artist r on a.ArtistId = r.ArtistId limit 5;",
            "WITH totals AS (SELECT CustomerId, SUM(Total) t FROM Invoice GROUP BY 1) SELECT * FROM totals",
            "SELECT Name FROM Artist UNION SELECT Title FROM Album",
            "SELECT 'DELETE FROM Artist' AS text",
        ] {
            assert!(ensure_read_only(sql).is_ok(), "{sql}");
        }
    }

    #[test]
    fn rejects_mutations() {
        for sql in [
            "DELETE FROM Artist",
            "insert into Artist (Name) values ('x')",
            "UPDATE Artist SET Name = 'x'",
            "DROP TABLE Artist",
            "CREATE TABLE t (id INTEGER)",
        ] {
            assert!(
                matches!(ensure_read_only(sql), Err(QueryError::Forbidden(_))),
                "{sql}"
            );
        }
    }

    #[test]
    fn rejects_stacked_statements() {
        let err = ensure_read_only("SELECT 1; DELETE FROM Artist").unwrap_err();
        assert!(matches!(err, QueryError::Malformed(_)));
    }

    #[test]
    fn rejects_garbage_and_empty() {
        assert!(matches!(
            ensure_read_only("SELEKT * FROM"),
            Err(QueryError::Malformed(_))
        ));
        assert!(matches!(ensure_read_only("  ; "), Err(QueryError::Empty)));
    }

    #[test]
    fn forbidden_reports_statement_keyword() {
        let err = ensure_read_only("delete from Album").unwrap_err();
        assert_eq!(err.to_string(), "only read-only queries are allowed, got DELETE");
    }
}
