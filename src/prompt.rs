use crate::exemplars;
use crate::schema::{self, DataHorizon};

/// System prompt for the SQL generation path.
pub const SQL_SYSTEM_PROMPT: &str = "You are a helpful assistant that generates SQL queries for SQLite based on natural language questions and a given database schema. Use specific date literals rather than SQLite date functions.";

/// True when the question refers to a relative "last month" window, in either
/// supported language. Such questions must be resolved against the data
/// horizon, not wall-clock time.
pub fn is_recency_question(question: &str) -> bool {
    question.contains("חודש האחרון") || question.to_lowercase().contains("last month")
}

fn date_handling_note(horizon: &DataHorizon) -> String {
    format!(
        r#"
Note about Date Handling:
- Dates in the database are in DD/MM/YYYY format but have been converted to YYYY-MM-DD in the date_formatted column
- For date queries, use the date_formatted column instead of תאריך
- The database contains data from {earliest} to {latest}
- When querying recent data, use specific date literals instead of DATE('now') functions
- Examples of effective date queries:
  * For the last month of data: WHERE date_formatted BETWEEN '{month_start}' AND '{month_end}'
  * For a specific year-month: WHERE strftime('%Y-%m', date_formatted) = '{month_key}'
  * For date ranges: WHERE date_formatted BETWEEN '{year}-01-01' AND '{year}-03-31'
"#,
        earliest = horizon.earliest.format("%d/%m/%Y"),
        latest = horizon.latest.format("%d/%m/%Y"),
        month_start = horizon.final_month_start(),
        month_end = horizon.final_month_end(),
        month_key = horizon.final_month_key(),
        year = horizon.latest.format("%Y"),
    )
}

/// Assemble the full SQL generation prompt: schema text with the date policy,
/// the merged exemplar bank, and the user question. Deterministic for
/// identical inputs.
pub fn build_sql_prompt(question: &str, horizon: &DataHorizon) -> String {
    let schema_with_date_info = format!("{}{}", schema::render_schema(), date_handling_note(horizon));

    let mut prompt = format!("Schema:\n{}\n\nExamples:\n", schema_with_date_info);
    for exemplar in exemplars::merged() {
        prompt.push_str(&format!("Question: {}\nSQL: {}\n\n", exemplar.question, exemplar.sql));
    }

    if is_recency_question(question) {
        // The store's relative-date functions run on wall-clock time, which
        // disagrees with a fixed historical dataset. Pin "last month" to the
        // final month the data actually covers.
        prompt.push_str(&format!(
            r#"New Question: {question}

Important: This question is asking about the "last month". Since the database only contains data until {latest}, interpret "last month" as {month_name} (the most recent month in the database).
Use WHERE date_formatted BETWEEN '{month_start}' AND '{month_end}' instead of DATE('now', '-1 month').
"#,
            latest = horizon.latest.format("%d/%m/%Y"),
            month_name = horizon.final_month_name(),
            month_start = horizon.final_month_start(),
            month_end = horizon.final_month_end(),
        ));
    } else {
        prompt.push_str(&format!("New Question: {}\n", question));
    }

    prompt.push_str("Please generate the SQL query with appropriate date handling as instructed above.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_recency_phrases_in_both_languages() {
        assert!(is_recency_question("How many tickets were issued last month?"));
        assert!(is_recency_question("כמה דוחות ניתנו בחודש האחרון?"));
        assert!(!is_recency_question("How many tickets were issued in December 2024?"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let horizon = DataHorizon::known();
        let a = build_sql_prompt("What is the fine for report number 123?", &horizon);
        let b = build_sql_prompt("What is the fine for report number 123?", &horizon);
        assert_eq!(a, b);
    }

    #[test]
    fn prompt_carries_schema_exemplars_and_date_policy() {
        let horizon = DataHorizon::known();
        let prompt = build_sql_prompt("What is the fine for report number 123?", &horizon);
        assert!(prompt.contains("Table: enforcement"));
        assert!(prompt.contains("Question: How many tickets were issued in December 2024?"));
        assert!(prompt.contains("use the date_formatted column instead of תאריך"));
        assert!(prompt.contains("from 01/01/2021 to 31/12/2024"));
        assert!(!prompt.contains("Important: This question is asking about the \"last month\""));
    }

    #[test]
    fn recency_question_pins_last_month_to_horizon_literals() {
        let horizon = DataHorizon::known();
        let prompt = build_sql_prompt("How many tickets were issued last month?", &horizon);
        assert!(prompt.contains("interpret \"last month\" as December 2024"));
        assert!(prompt.contains("BETWEEN '2024-12-01' AND '2024-12-31' instead of DATE('now', '-1 month')"));
    }
}
