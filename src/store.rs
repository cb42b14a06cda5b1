use crate::error::{AssistantError, Result};
use crate::schema::{self, DataHorizon};
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info};

/// Tables carrying a native DD/MM/YYYY date column that gets a derived
/// ISO date_formatted column and an index for range queries.
const DATED_TABLES: [&str; 2] = ["enforcement", "report_data"];

/// Load the four CSV files into the store if it is not already populated.
/// Re-loading is idempotent: when every table exists and holds rows, the call
/// returns without re-ingesting.
pub fn ensure_loaded(db_path: &Path, data_dir: &Path) -> Result<()> {
    let mut conn = Connection::open(db_path)?;

    let populated = schema::REGISTRY
        .iter()
        .map(|table| table_is_populated(&conn, table.name))
        .collect::<Result<Vec<bool>>>()?;
    if populated.iter().all(|&p| p) {
        debug!("store already populated, skipping ingest");
        return Ok(());
    }

    for table in schema::REGISTRY {
        let path = data_dir.join(table.source_file);
        load_csv_table(&mut conn, &path, table.name)?;
    }
    prepare_date_columns(&conn)?;
    Ok(())
}

fn table_is_populated(conn: &Connection, name: &str) -> Result<bool> {
    let exists: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Ok(false);
    }
    let rows: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM \"{}\"", name), [], |row| row.get(0))?;
    Ok(rows > 0)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Numbers in the CSVs arrive as text; store them typed so numeric
/// comparisons in generated SQL behave.
fn infer_cell(raw: &str) -> SqlValue {
    if raw.is_empty() {
        SqlValue::Null
    } else if let Ok(i) = raw.parse::<i64>() {
        SqlValue::Integer(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        SqlValue::Real(f)
    } else {
        SqlValue::Text(raw.to_string())
    }
}

fn load_csv_table(conn: &mut Connection, path: &Path, table: &str) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .from_path(path)
        .map_err(|e| AssistantError::Ingest(format!("failed to open {}: {}", path.display(), e)))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AssistantError::Ingest(format!("failed to read headers of {}: {}", path.display(), e)))?
        .iter()
        .map(str::to_string)
        .collect();

    conn.execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)), [])?;
    let column_list = headers.iter().map(|h| quote_ident(h)).collect::<Vec<_>>().join(", ");
    conn.execute(&format!("CREATE TABLE {} ({})", quote_ident(table), column_list), [])?;

    let placeholders = vec!["?"; headers.len()].join(", ");
    let insert_sql = format!("INSERT INTO {} VALUES ({})", quote_ident(table), placeholders);

    let tx = conn.transaction()?;
    let mut inserted = 0usize;
    {
        let mut stmt = tx.prepare(&insert_sql)?;
        for record in reader.records() {
            let record = record
                .map_err(|e| AssistantError::Ingest(format!("bad record in {}: {}", path.display(), e)))?;
            let values: Vec<SqlValue> = record.iter().map(infer_cell).collect();
            stmt.execute(rusqlite::params_from_iter(values))?;
            inserted += 1;
        }
    }
    tx.commit()?;

    info!("loaded {} rows into {}", inserted, table);
    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Add the derived ISO date column beside the native DD/MM/YYYY one and index
/// it for range queries. Safe to call repeatedly.
pub fn prepare_date_columns(conn: &Connection) -> Result<()> {
    for table in DATED_TABLES {
        if !has_column(conn, table, "date_formatted")? {
            conn.execute(
                &format!("ALTER TABLE {} ADD COLUMN date_formatted TEXT", quote_ident(table)),
                [],
            )?;
        }
        conn.execute(
            &format!(
                "UPDATE {table} SET date_formatted = \
                 substr(תאריך, 7, 4) || '-' || substr(תאריך, 4, 2) || '-' || substr(תאריך, 1, 2) \
                 WHERE תאריך LIKE '__/__/____'",
                table = quote_ident(table)
            ),
            [],
        )?;
        conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_date ON {quoted} (date_formatted)",
                table = table,
                quoted = quote_ident(table)
            ),
            [],
        )?;
    }
    Ok(())
}

/// Inspect date formatting in the store: presence of the derived column,
/// sample original/formatted pairs, null count, and the row count for the
/// final month of the data horizon.
pub fn date_diagnostics(db_path: &Path, horizon: &DataHorizon) -> Result<serde_json::Value> {
    let conn = Connection::open(db_path)?;
    let mut report = serde_json::Map::new();

    let has_formatted = has_column(&conn, "enforcement", "date_formatted")?;
    report.insert("has_date_formatted_column".to_string(), serde_json::json!(has_formatted));

    let mut stmt = conn.prepare("SELECT תאריך FROM enforcement LIMIT 5")?;
    let originals: Vec<String> = stmt
        .query_map([], |row| row.get::<_, Option<String>>(0))?
        .filter_map(|r| r.ok().flatten())
        .collect();
    report.insert("sample_original_dates".to_string(), serde_json::json!(originals));

    if has_formatted {
        let mut stmt = conn.prepare("SELECT תאריך, date_formatted FROM enforcement LIMIT 5")?;
        let pairs: Vec<(Option<String>, Option<String>)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .filter_map(|r| r.ok())
            .collect();
        report.insert("sample_formatted_dates".to_string(), serde_json::json!(pairs));

        let nulls: i64 = conn.query_row(
            "SELECT COUNT(*) FROM enforcement WHERE date_formatted IS NULL",
            [],
            |row| row.get(0),
        )?;
        report.insert("null_formatted_dates".to_string(), serde_json::json!(nulls));

        let final_month: i64 = conn.query_row(
            "SELECT COUNT(*) FROM enforcement WHERE date_formatted BETWEEN ?1 AND ?2",
            [
                horizon.final_month_start().to_string(),
                horizon.final_month_end().to_string(),
            ],
            |row| row.get(0),
        )?;
        report.insert("final_month_records".to_string(), serde_json::json!(final_month));
    }

    Ok(serde_json::Value::Object(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_inference_types_numbers_and_text() {
        assert_eq!(infer_cell(""), SqlValue::Null);
        assert_eq!(infer_cell("250"), SqlValue::Integer(250));
        assert_eq!(infer_cell("33.5"), SqlValue::Real(33.5));
        assert_eq!(infer_cell("תל אביב"), SqlValue::Text("תל אביב".to_string()));
        assert_eq!(infer_cell("05/12/2024"), SqlValue::Text("05/12/2024".to_string()));
    }

    #[test]
    fn date_column_rewrite_produces_iso_dates() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE enforcement (תאריך TEXT);
             CREATE TABLE report_data (תאריך TEXT);
             INSERT INTO enforcement VALUES ('05/12/2024'), ('not a date'), (NULL);",
        )
        .unwrap();

        prepare_date_columns(&conn).unwrap();
        // Idempotent re-run must not fail or duplicate the column.
        prepare_date_columns(&conn).unwrap();

        let formatted: Option<String> = conn
            .query_row(
                "SELECT date_formatted FROM enforcement WHERE תאריך = '05/12/2024'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(formatted.as_deref(), Some("2024-12-05"));

        let unformatted: Option<String> = conn
            .query_row(
                "SELECT date_formatted FROM enforcement WHERE תאריך = 'not a date'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(unformatted.is_none());
    }
}
