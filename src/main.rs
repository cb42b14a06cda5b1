use anyhow::Result;
use clap::Parser;
use reports_assistant::error::AssistantError;
use reports_assistant::llm::{CompletionClient, DEFAULT_BASE_URL, DEFAULT_MODEL, DUMMY_API_KEY};
use reports_assistant::narrator::{self, NarrationEvent};
use reports_assistant::pipeline::Pipeline;
use reports_assistant::schema::DataHorizon;
use reports_assistant::store;
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "reports-assistant")]
#[command(about = "Natural-language question answering over municipal report data")]
struct Args {
    /// The question, in Hebrew or English
    question: String,

    /// Path to the SQLite database file
    #[arg(long, default_value = "reports.db")]
    db: PathBuf,

    /// Directory holding the source CSV files
    #[arg(short, long, default_value = ".")]
    data_dir: PathBuf,

    /// OpenAI API key (or set OPENAI_API_KEY env var)
    #[arg(long)]
    api_key: Option<String>,

    /// Chat completion model
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Completion service base URL (or set OPENAI_BASE_URL env var)
    #[arg(long)]
    base_url: Option<String>,

    /// Print date-formatting diagnostics for the store and exit
    #[arg(long)]
    diagnose_dates: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    info!("Reports assistant starting...");
    store::ensure_loaded(&args.db, &args.data_dir)?;

    if args.diagnose_dates {
        let report = store::date_diagnostics(&args.db, &DataHorizon::known())?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let api_key = args
        .api_key
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .unwrap_or_else(|| DUMMY_API_KEY.to_string());
    let base_url = args
        .base_url
        .or_else(|| std::env::var("OPENAI_BASE_URL").ok())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let client = CompletionClient::new(api_key)
        .with_base_url(base_url)
        .with_model(args.model);
    let pipeline = Pipeline::new(client, args.db.clone());

    let answer = match pipeline.submit_question(&args.question).await {
        Ok(answer) => answer,
        Err(AssistantError::Execution { message, unknown_column }) => {
            error!("query failed: {}", message);
            if let Some(column) = unknown_column {
                eprintln!(
                    "The column '{}' does not exist. Available columns might be different.",
                    column
                );
            }
            anyhow::bail!("{}", message);
        }
        Err(e) => return Err(e.into()),
    };

    println!("\n=== SQL ===");
    println!("{}", answer.statement);
    println!("\n=== Results ===");
    println!("{}", narrator::describe_result(&answer.result));

    println!("\n=== Answer ===");
    let mut events = pipeline.stream_answer(&answer).await?;
    while let Some(event) = events.recv().await {
        match event {
            NarrationEvent::Token(token) => {
                print!("{}", token);
                std::io::stdout().flush()?;
            }
            NarrationEvent::Done(_) => println!(),
            NarrationEvent::Failed(message) => {
                eprintln!("\n{}", message);
                break;
            }
        }
    }

    Ok(())
}
