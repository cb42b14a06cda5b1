use crate::error::Result;
use crate::executor::QueryResult;
use crate::llm::CompletionClient;
use serde_json::Value;
use tokio::sync::mpsc;

/// One step of a narration stream. A stream yields zero or more Tokens and
/// terminates in exactly one of Done (the complete answer) or Failed.
#[derive(Debug, Clone, PartialEq)]
pub enum NarrationEvent {
    Token(String),
    Done(String),
    Failed(String),
}

pub const NO_DATA_MESSAGE: &str = "No data was found for this query.";

pub const NARRATION_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that explains database query results.";

/// Result sets at or below this row count are rendered in full; larger sets
/// get a capped sample plus summary statistics.
const FULL_RENDER_LIMIT: usize = 20;
const SAMPLE_ROWS: usize = 5;

/// Narration target language, chosen by a strict single-signal heuristic:
/// Hebrew iff the question contains a character in the Hebrew Unicode block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Language {
    Hebrew,
    English,
}

impl Language {
    pub fn of(question: &str) -> Self {
        if question.chars().any(|c| ('\u{0590}'..='\u{05FF}').contains(&c)) {
            Language::Hebrew
        } else {
            Language::English
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Language::Hebrew => "hebrew",
            Language::English => "english",
        }
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_table(columns: &[String], rows: &[Vec<Value>]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let render_row = |row: &[String]| -> String {
        row.iter()
            .enumerate()
            .map(|(i, cell)| format!("{:>width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
    };

    let mut out = render_row(&columns.iter().map(|c| c.to_string()).collect::<Vec<_>>());
    for row in &cells {
        out.push('\n');
        out.push_str(&render_row(row));
    }
    out
}

fn as_number(value: &Value) -> Option<f64> {
    value.as_f64()
}

/// Summary statistics over numeric columns only. A column counts as numeric
/// when every non-null value in it is a number.
fn numeric_summary(columns: &[String], rows: &[Vec<Value>]) -> Option<String> {
    let mut lines = Vec::new();
    for (i, column) in columns.iter().enumerate() {
        let mut values = Vec::new();
        let mut non_numeric = false;
        for row in rows {
            match row.get(i) {
                Some(Value::Null) | None => {}
                Some(value) => match as_number(value) {
                    Some(n) => values.push(n),
                    None => {
                        non_numeric = true;
                        break;
                    }
                },
            }
        }
        if non_numeric || values.is_empty() {
            continue;
        }
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        lines.push(format!(
            "{}: count={} mean={:.2} min={} max={}",
            column, count, mean, min, max
        ));
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Compact textual description of a result set, fed into the narration
/// prompt. An empty result is the fixed no-data sentence.
pub fn describe_result(result: &QueryResult) -> String {
    if result.is_empty() {
        return NO_DATA_MESSAGE.to_string();
    }

    let mut description = format!("Found {} rows of data.\n\n", result.rows.len());
    if result.rows.len() <= FULL_RENDER_LIMIT {
        description.push_str(&render_table(&result.columns, &result.rows));
    } else {
        description.push_str(&format!(
            "Sample of data (first {} rows):\n{}\n\n",
            SAMPLE_ROWS,
            render_table(&result.columns, &result.rows[..SAMPLE_ROWS])
        ));
        if let Some(stats) = numeric_summary(&result.columns, &result.rows) {
            description.push_str("Summary statistics for numeric columns:\n");
            description.push_str(&stats);
        }
    }
    description
}

/// Issue the single streaming narration request. The statement argument is
/// the executed SQL, or a fixed label when the special-case strategy produced
/// the result.
pub async fn narrate(
    client: &CompletionClient,
    question: &str,
    statement: &str,
    result: &QueryResult,
    language: Language,
) -> Result<mpsc::Receiver<NarrationEvent>> {
    let description = describe_result(result);
    let prompt = format!(
        r#"
The user asked the following question:
{question}

The following SQL query was executed to answer this question:
{statement}

The query returned the following results:
{description}

Please generate a natural, conversational answer that explains these results in a way that directly answers the original question.
The answer should be in {language} and should be easy to understand for someone who doesn't know SQL.
"#,
        question = question,
        statement = statement,
        description = description,
        language = language.name(),
    );

    client.stream(NARRATION_SYSTEM_PROMPT, &prompt, 0.3).await
}
