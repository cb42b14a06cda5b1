use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Completion service error: {0}")]
    Completion(String),

    /// The store rejected a statement. `unknown_column` is a best-effort hint
    /// extracted from SQLite's error text when the failure names a missing column.
    #[error("{message}")]
    Execution {
        message: String,
        unknown_column: Option<String>,
    },

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Ingest error: {0}")]
    Ingest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AssistantError>;
