use crate::error::{AssistantError, Result};
use crate::narrator::NarrationEvent;
use futures::StreamExt;
use regex::Regex;
use tokio::sync::mpsc;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Sentinel key that switches both paths to deterministic offline responses.
pub const DUMMY_API_KEY: &str = "dummy-api-key";

/// Client for an OpenAI-style chat completion service. One completed text for
/// the SQL generation path, an incremental token stream for narration.
pub struct CompletionClient {
    api_key: String,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl CompletionClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    fn offline(&self) -> bool {
        self.api_key == DUMMY_API_KEY
    }

    /// One blocking completion. Used for SQL generation with temperature near
    /// zero for determinism.
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<String> {
        if self.offline() {
            return Ok(offline_sql_completion(user));
        }

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "temperature": temperature,
            "max_tokens": max_tokens
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Completion(format!("API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Completion(format!("HTTP {}: {}", status, error_body)));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AssistantError::Completion(format!("Failed to parse response: {}", e)))?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AssistantError::Completion("No content in completion response".to_string()))?;

        Ok(content.trim().to_string())
    }

    /// Streaming completion for the narration path. Tokens are delivered
    /// through a single-consumer channel as the service yields them. A
    /// transport failure mid-stream terminates with Failed and the partial
    /// answer is discarded.
    pub async fn stream(
        &self,
        system: &str,
        user: &str,
        temperature: f64,
    ) -> Result<mpsc::Receiver<NarrationEvent>> {
        let (tx, rx) = mpsc::channel::<NarrationEvent>(100);

        if self.offline() {
            tokio::spawn(async move {
                let mut answer = String::new();
                for token in offline_narration_tokens() {
                    answer.push_str(&token);
                    if tx.send(NarrationEvent::Token(token)).await.is_err() {
                        return;
                    }
                }
                let _ = tx.send(NarrationEvent::Done(answer)).await;
            });
            return Ok(rx);
        }

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "temperature": temperature,
            "stream": true
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Completion(format!("API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Completion(format!("HTTP {}: {}", status, error_body)));
        }

        let byte_stream = response.bytes_stream();
        tokio::spawn(async move {
            let mut buffer = String::new();
            let mut answer = String::new();
            let mut stream = Box::pin(byte_stream);

            while let Some(chunk) = stream.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        // Fail fast: the partial answer is dropped, only the
                        // error string reaches the consumer.
                        let _ = tx
                            .send(NarrationEvent::Failed(format!("Error generating textual answer: {}", e)))
                            .await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_string();
                    buffer.drain(..=pos);
                    if let Some(token) = parse_sse_line(&line) {
                        answer.push_str(&token);
                        if tx.send(NarrationEvent::Token(token)).await.is_err() {
                            return;
                        }
                    }
                }
            }

            let _ = tx.send(NarrationEvent::Done(answer)).await;
        });

        Ok(rx)
    }
}

/// Parse one SSE line ("data: {...}") into its content delta, if any.
fn parse_sse_line(line: &str) -> Option<String> {
    let payload = line.strip_prefix("data: ")?;
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
    value["choices"][0]["delta"]["content"].as_str().map(|s| s.to_string())
}

/// Deterministic stand-in for the SQL generation path. Reads the trailing
/// question block of the prompt and answers with a plausible statement, so
/// the pipeline can run end-to-end without a network.
fn offline_sql_completion(prompt: &str) -> String {
    let question = prompt.rsplit("New Question:").next().unwrap_or(prompt);
    debug!("offline completion for question block: {}", question.trim());

    // A recency prompt carries an explicit literal range instruction; obey it.
    if let Some(caps) = Regex::new(r"BETWEEN '(\d{4}-\d{2}-\d{2})' AND '(\d{4}-\d{2}-\d{2})'")
        .ok()
        .and_then(|re| re.captures(question))
    {
        return format!(
            "SELECT COUNT(*) FROM enforcement WHERE date_formatted BETWEEN '{}' AND '{}';",
            &caps[1], &caps[2]
        );
    }

    if question.to_lowercase().contains("fine") {
        if let Some(number) = question
            .split(|c: char| !c.is_ascii_digit())
            .find(|part| !part.is_empty())
        {
            return format!("SELECT קנס FROM enforcement WHERE \"מס' דו''ח\" = {};", number);
        }
    }

    "SELECT COUNT(*) FROM enforcement;".to_string()
}

fn offline_narration_tokens() -> Vec<String> {
    "Based on the query results shown above, here is the answer to your question."
        .split_inclusive(' ')
        .map(|word| word.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_completion_answers_fine_lookup() {
        let prompt = "Schema...\n\nNew Question: What is the fine for report number 123?\nPlease generate the SQL query with appropriate date handling as instructed above.";
        assert_eq!(
            offline_sql_completion(prompt),
            "SELECT קנס FROM enforcement WHERE \"מס' דו''ח\" = 123;"
        );
    }

    #[test]
    fn offline_completion_obeys_literal_range_instruction() {
        let prompt = "Schema with BETWEEN '2024-01-01' AND '2024-03-31' examples...\n\nNew Question: How many tickets were issued last month?\n\nImportant: interpret \"last month\" as December 2024.\nUse WHERE date_formatted BETWEEN '2024-12-01' AND '2024-12-31' instead of DATE('now', '-1 month').";
        let sql = offline_sql_completion(prompt);
        assert!(sql.contains("BETWEEN '2024-12-01' AND '2024-12-31'"));
        assert!(!sql.contains("DATE('now'"));
    }

    #[test]
    fn sse_line_parsing() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#;
        assert_eq!(parse_sse_line(line).as_deref(), Some("Hello"));
        assert_eq!(parse_sse_line("data: [DONE]"), None);
        assert_eq!(parse_sse_line("event: ping"), None);
        assert_eq!(parse_sse_line(r#"data: {"choices":[{"delta":{}}]}"#), None);
    }

    #[tokio::test]
    async fn offline_stream_terminates_with_complete_answer() {
        let client = CompletionClient::new(DUMMY_API_KEY.to_string());
        let mut rx = client.stream("system", "user", 0.3).await.unwrap();

        let mut tokens = String::new();
        let mut done = None;
        while let Some(event) = rx.recv().await {
            match event {
                NarrationEvent::Token(token) => tokens.push_str(&token),
                NarrationEvent::Done(answer) => done = Some(answer),
                NarrationEvent::Failed(message) => panic!("unexpected failure: {}", message),
            }
        }
        let answer = done.expect("stream must terminate with Done");
        assert_eq!(answer, tokens);
        assert!(answer.contains("answer to your question"));
    }
}
