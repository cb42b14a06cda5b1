pub mod error;
pub mod exemplars;
pub mod executor;
pub mod llm;
pub mod narrator;
pub mod pipeline;
pub mod prompt;
pub mod sanitize;
pub mod schema;
pub mod special;
pub mod store;
