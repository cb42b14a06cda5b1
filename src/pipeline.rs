use crate::error::Result;
use crate::executor::{self, QueryResult};
use crate::llm::CompletionClient;
use crate::narrator::{self, Language, NarrationEvent};
use crate::prompt;
use crate::sanitize::GeneratedSql;
use crate::schema::DataHorizon;
use crate::special;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// How a question gets answered. Selected once per request; both variants
/// produce the same QueryResult contract, so narration and the caller stay
/// strategy-agnostic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryStrategy {
    /// Prompt the model for SQL, extract, sanitize, execute.
    Generic,
    /// Hand-authored disabled-vehicle percentage aggregate.
    DisabledVehicleShare,
}

impl QueryStrategy {
    pub fn select(question: &str) -> Self {
        if special::matches(question) {
            QueryStrategy::DisabledVehicleShare
        } else {
            QueryStrategy::Generic
        }
    }
}

/// One user submission. Created per request, never persisted.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub id: String,
    pub question: String,
    pub language: Language,
    pub recency: bool,
    pub strategy: QueryStrategy,
}

impl QueryRequest {
    pub fn new(question: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            question: question.to_string(),
            language: Language::of(question),
            recency: prompt::is_recency_question(question),
            strategy: QueryStrategy::select(question),
        }
    }
}

/// Everything the caller needs after a submission: the executed statement (or
/// the special-case label) and the result rows.
#[derive(Debug)]
pub struct Answer {
    pub request: QueryRequest,
    /// Present only on the generic path.
    pub generated: Option<GeneratedSql>,
    /// The sanitized statement, or the fixed special-case label.
    pub statement: String,
    pub result: QueryResult,
}

pub struct Pipeline {
    client: CompletionClient,
    db_path: PathBuf,
    horizon: DataHorizon,
}

impl Pipeline {
    pub fn new(client: CompletionClient, db_path: PathBuf) -> Self {
        Self { client, db_path, horizon: DataHorizon::known() }
    }

    /// Run the full question-to-result pipeline. One request, one response,
    /// no retry; every failure is terminal for this request.
    pub async fn submit_question(&self, question: &str) -> Result<Answer> {
        let request = QueryRequest::new(question);
        info!(id = %request.id, "processing question: {}", request.question);

        match request.strategy {
            QueryStrategy::DisabledVehicleShare => {
                debug!(id = %request.id, "dispatching to the disabled-vehicle strategy");
                let result = special::run(&self.db_path)?;
                Ok(Answer {
                    request,
                    generated: None,
                    statement: special::DISABLED_VEHICLE_LABEL.to_string(),
                    result,
                })
            }
            QueryStrategy::Generic => {
                let prompt_text = prompt::build_sql_prompt(question, &self.horizon);
                let completion = self
                    .client
                    .complete(prompt::SQL_SYSTEM_PROMPT, &prompt_text, 0.0, 150)
                    .await?;
                let generated = GeneratedSql::from_completion(completion);
                debug!(id = %request.id, "sanitized statement: {}", generated.sanitized);

                let result = executor::execute(&self.db_path, &generated.sanitized)?;
                Ok(Answer {
                    request,
                    statement: generated.sanitized.clone(),
                    generated: Some(generated),
                    result,
                })
            }
        }
    }

    /// Stream the natural-language narration for a completed answer.
    pub async fn stream_answer(&self, answer: &Answer) -> Result<mpsc::Receiver<NarrationEvent>> {
        narrator::narrate(
            &self.client,
            &answer.request.question,
            &answer.statement,
            &answer.result,
            answer.request.language,
        )
        .await
    }
}
