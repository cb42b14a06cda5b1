use crate::error::{AssistantError, Result};
use regex::Regex;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Rows and column names from one executed statement. Rows preserve the
/// store-returned order; columns and rows are always co-present.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => Value::String(format!("<blob {} bytes>", blob.len())),
    }
}

/// Wrap a store failure in a diagnostic that embeds the offending statement.
/// When the failure names a missing column, the token is extracted as a
/// structured hint. The extraction is a best-effort match on SQLite's error
/// text, not a guaranteed classification.
fn classify_failure(statement: &str, err: rusqlite::Error) -> AssistantError {
    let error_text = err.to_string();
    let message = format!("SQLite error: {}\nQuery: {}", error_text, statement);
    let unknown_column = Regex::new(r"(?i)no such column:\s*(\S+)")
        .ok()
        .and_then(|re| re.captures(&error_text).map(|caps| caps[1].to_string()));
    AssistantError::Execution { message, unknown_column }
}

/// Run a single sanitized read statement. The connection lives only for the
/// duration of this call. A failed execution is terminal for the request;
/// retries, if desired, happen at the orchestration layer by re-prompting.
pub fn execute(db_path: &Path, statement: &str) -> Result<QueryResult> {
    debug!("executing statement: {}", statement);

    let conn = Connection::open(db_path)?;
    let mut stmt = conn
        .prepare(statement)
        .map_err(|e| classify_failure(statement, e))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|name| name.to_string()).collect();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([]).map_err(|e| classify_failure(statement, e))?;
    loop {
        match cursor.next() {
            Ok(Some(row)) => {
                let mut cells = Vec::with_capacity(columns.len());
                for i in 0..columns.len() {
                    let value = row.get_ref(i).map_err(|e| classify_failure(statement, e))?;
                    cells.push(value_to_json(value));
                }
                rows.push(cells);
            }
            Ok(None) => break,
            Err(e) => return Err(classify_failure(statement, e)),
        }
    }

    debug!("statement returned {} rows", rows.len());
    Ok(QueryResult { columns, rows })
}
