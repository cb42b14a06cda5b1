use reports_assistant::error::AssistantError;
use reports_assistant::executor;
use reports_assistant::llm::{CompletionClient, DUMMY_API_KEY};
use reports_assistant::narrator::{self, NarrationEvent};
use reports_assistant::pipeline::{Pipeline, QueryStrategy};
use reports_assistant::special;
use reports_assistant::store;
use serde_json::json;
use std::fs;
use std::path::PathBuf;

/// Write a small but representative copy of the four source CSVs.
fn write_test_csvs(data_dir: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(data_dir)?;

    fs::write(
        data_dir.join("אכיפה.csv"),
        "מס' דו''ח,תאריך,נכה,קנס\n\
         123,05/12/2024,כן,250\n\
         124,15/11/2024,לא,100\n\
         125,20/12/2024,0,500\n",
    )?;
    fs::write(
        data_dir.join("תנועות כספיות.csv"),
        "מס' דו''ח,תאריך,חיוב\n123,05/12/2024,250\n",
    )?;
    fs::write(
        data_dir.join("מאגר כתובות.csv"),
        "מס' דו''ח,עיר\n123,תל אביב\n",
    )?;
    fs::write(
        data_dir.join("דטא דוחות.csv"),
        "מס' דו''ח,תאריך,שולם\n123,05/12/2024,250\n",
    )?;
    Ok(())
}

/// Fresh store in a per-test temp directory, loaded from the test CSVs.
fn setup_store(name: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let dir = std::env::temp_dir().join(format!("reports_assistant_test_{}", name));
    let _ = fs::remove_dir_all(&dir);
    write_test_csvs(&dir)?;

    let db_path = dir.join("reports.db");
    store::ensure_loaded(&db_path, &dir)?;
    Ok(db_path)
}

fn offline_pipeline(db_path: PathBuf) -> Pipeline {
    Pipeline::new(CompletionClient::new(DUMMY_API_KEY.to_string()), db_path)
}

#[tokio::test]
async fn test_fine_lookup_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n🧪 Fine lookup for a single report\n");
    let db_path = setup_store("fine_lookup")?;
    let pipeline = offline_pipeline(db_path);

    let answer = pipeline.submit_question("What is the fine for report number 123?").await?;

    assert_eq!(answer.request.strategy, QueryStrategy::Generic);
    assert_eq!(answer.result.rows.len(), 1);
    assert_eq!(answer.result.rows[0][0], json!(250));
    assert!(answer.statement.contains("קנס"));
    Ok(())
}

#[tokio::test]
async fn test_recency_question_resolves_to_literal_month() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n🧪 Recency question pinned to the data horizon\n");
    let db_path = setup_store("recency")?;
    let pipeline = offline_pipeline(db_path);

    let answer = pipeline.submit_question("How many tickets were issued last month?").await?;

    assert!(answer.request.recency);
    // The statement must carry the literal final month of the data, not a
    // relative-date expression evaluated at wall-clock time.
    assert!(answer.statement.contains("BETWEEN '2024-12-01' AND '2024-12-31'"));
    assert!(!answer.statement.contains("DATE('now'"));
    // Two of the three seeded enforcement rows fall in December 2024.
    assert_eq!(answer.result.rows[0][0], json!(2));
    Ok(())
}

#[tokio::test]
async fn test_empty_result_describes_as_no_data() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n🧪 Empty result produces the fixed no-data sentence\n");
    let db_path = setup_store("empty_result")?;
    let pipeline = offline_pipeline(db_path);

    let answer = pipeline.submit_question("What is the fine for report number 999?").await?;

    assert!(answer.result.rows.is_empty());
    assert_eq!(narrator::describe_result(&answer.result), narrator::NO_DATA_MESSAGE);
    Ok(())
}

#[tokio::test]
async fn test_unknown_column_surfaces_structured_hint() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n🧪 Unknown column diagnostic\n");
    let db_path = setup_store("unknown_column")?;

    let err = executor::execute(&db_path, "SELECT foo FROM enforcement").unwrap_err();
    match err {
        AssistantError::Execution { message, unknown_column } => {
            assert!(message.contains("SELECT foo FROM enforcement"));
            assert_eq!(unknown_column.as_deref(), Some("foo"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_disabled_vehicle_strategy() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n🧪 Disabled-vehicle percentage shortcut\n");
    let db_path = setup_store("disabled_vehicle")?;
    let pipeline = offline_pipeline(db_path);

    let answer = pipeline.submit_question("כמה אחוז מהדוחות ניתנו לרכבי נכים?").await?;

    assert_eq!(answer.request.strategy, QueryStrategy::DisabledVehicleShare);
    assert_eq!(answer.statement, special::DISABLED_VEHICLE_LABEL);
    assert_eq!(
        answer.result.columns,
        vec!["Total Tickets", "Disabled Vehicle Tickets", "Percentage"]
    );
    assert_eq!(answer.result.rows.len(), 1);
    assert_eq!(answer.result.rows[0][0], json!(3));
    assert_eq!(answer.result.rows[0][1], json!(1));
    // One of three tickets: 33.33 after explicit floating-point scaling,
    // never 33 or 0.
    let percentage = answer.result.rows[0][2].as_f64().expect("percentage is numeric");
    assert!((percentage - 33.33).abs() < 1e-6, "got {}", percentage);
    Ok(())
}

#[tokio::test]
async fn test_disabled_keyword_alone_stays_generic() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n🧪 Conjunctive special-case trigger\n");
    let db_path = setup_store("conjunctive_trigger")?;
    let pipeline = offline_pipeline(db_path);

    let answer = pipeline.submit_question("How many disabled residents are registered?").await?;

    assert_eq!(answer.request.strategy, QueryStrategy::Generic);
    assert_ne!(answer.statement, special::DISABLED_VEHICLE_LABEL);
    Ok(())
}

#[tokio::test]
async fn test_narration_stream_terminates_with_answer() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n🧪 Streamed narration\n");
    let db_path = setup_store("narration")?;
    let pipeline = offline_pipeline(db_path);

    let answer = pipeline.submit_question("What is the fine for report number 123?").await?;
    let mut events = pipeline.stream_answer(&answer).await?;

    let mut tokens = String::new();
    let mut terminal = None;
    while let Some(event) = events.recv().await {
        match event {
            NarrationEvent::Token(token) => tokens.push_str(&token),
            other => terminal = Some(other),
        }
    }
    match terminal {
        Some(NarrationEvent::Done(full)) => assert_eq!(full, tokens),
        other => panic!("stream must terminate with Done, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_reload_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n🧪 Idempotent store loading\n");
    let db_path = setup_store("reload")?;
    let data_dir = db_path.parent().unwrap().to_path_buf();

    // A second load must pass the freshness check and not re-ingest.
    store::ensure_loaded(&db_path, &data_dir)?;
    let result = executor::execute(&db_path, "SELECT COUNT(*) FROM enforcement")?;
    assert_eq!(result.rows[0][0], json!(3));
    Ok(())
}
