use regex::Regex;

/// SQL derived from one completion. Immutable once produced.
#[derive(Debug, Clone)]
pub struct GeneratedSql {
    /// Raw completion text, possibly with explanation around the statement.
    pub completion: String,
    /// The extracted statement, or the raw completion when no SELECT span was found.
    pub statement: String,
    /// The statement after sanitization; this is what gets executed.
    pub sanitized: String,
}

impl GeneratedSql {
    pub fn from_completion(completion: String) -> Self {
        let statement = extract_select(&completion).to_string();
        let sanitized = sanitize_sql(&statement);
        Self { completion, statement, sanitized }
    }
}

/// Pull the SQL statement out of free-form completion text. The model may
/// prepend explanation, so the statement is taken as the span from the first
/// SELECT to the end of the text. When no SELECT is present the input is
/// returned unchanged; the executor surfaces the resulting error.
pub fn extract_select(completion: &str) -> &str {
    let lower = completion.to_lowercase();
    match lower.find("select") {
        Some(pos) => completion[pos..].trim(),
        None => completion,
    }
}

/// Normalize a statement into a single, SQLite-safe, numerically-correct
/// SELECT. Pure and idempotent.
pub fn sanitize_sql(statement: &str) -> String {
    let mut sql = statement.trim().to_string();

    // The store API rejects multi-statement execution. Strip one trailing
    // terminator, then keep only the text before any remaining one.
    if let Some(stripped) = sql.strip_suffix(';') {
        sql = stripped.to_string();
    }
    if let Some(pos) = sql.find(';') {
        sql = sql[..pos].to_string();
    }

    // SQLite doesn't handle CAST(x AS FLOAT) well; REAL is the supported synonym.
    if sql.contains("CAST(") && sql.contains("AS FLOAT") {
        sql = sql.replace("AS FLOAT", "AS REAL");
    }

    // SQLite divides integers with truncation, so a ratio below 1 silently
    // becomes 0. When the statement computes a percentage and no floating
    // literal or cast is already present, force the division path to float.
    if sql.to_lowercase().contains("percentage") && sql.contains('/') {
        if !sql.contains("1.0") && !sql.contains("100.0") {
            let scale = Regex::new(r"(\*\s*)100([^0-9.]|$)").unwrap();
            sql = scale.replace_all(&sql, "${1}100.0${2}").to_string();
            if !sql.contains("AS REAL") {
                let count_divisor = Regex::new(r"/\s*COUNT\(([^)]*)\)").unwrap();
                sql = count_divisor.replace_all(&sql, "/ CAST(COUNT(${1}) AS REAL)").to_string();
            }
        }
    }

    sql
}
