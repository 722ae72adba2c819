use std::time::Duration;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
}

/// One entry in a conversation. Persisted as a single JSON line and
/// sent as-is in the `messages` array of a chat request.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Message {
            role,
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: &str) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    /// Nothing is listening at the backend address, usually because
    /// `ollama serve` isn't running.
    #[error("could not connect to the backend at {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The backend answered but rejected the request.
    #[error("backend error: {status} {status_text}")]
    Backend { status: u16, status_text: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    fn from_send(url: &str, err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            ClientError::Connection {
                url: url.to_string(),
                source: err,
            }
        } else {
            ClientError::Transport(err)
        }
    }

    fn from_status(status: reqwest::StatusCode) -> Self {
        ClientError::Backend {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
        }
    }
}

// {"model":"llama3","created_at":"...","message":{"role":"assistant","content":"Hi"},"done":false}
// {"model":"llama3","created_at":"...","response":"Hi","done":false}
#[derive(Debug, Default, Deserialize)]
pub struct RecordMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// A single newline delimited record from a streamed response. The
/// chat endpoint nests the text under `message.content` while the
/// generate endpoint uses a flat `response` field, so both are
/// optional.
#[derive(Debug, Default, Deserialize)]
pub struct StreamRecord {
    #[serde(default)]
    pub message: Option<RecordMessage>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl StreamRecord {
    /// Token text for this record: `message.content`, then
    /// `response`, then nothing.
    pub fn text(&self) -> &str {
        if let Some(content) = self.message.as_ref().and_then(|m| m.content.as_deref())
            && !content.is_empty()
        {
            return content;
        }
        if let Some(response) = self.response.as_deref() {
            return response;
        }
        ""
    }
}

/// Carry-over buffer for newline delimited records that arrive in
/// arbitrarily sized chunks. Works on raw bytes so a multi-byte
/// character split between two chunks is decoded only once the whole
/// line is available.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every line completed by it. The
    /// trailing segment after the last newline stays buffered.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let Some(last_newline) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };
        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        complete
            .split(|b| *b == b'\n')
            .filter(|line| !line.is_empty())
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect()
    }

    /// Whatever is left once the connection ends without a final
    /// newline.
    pub fn finish(self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.pending).into_owned())
        }
    }
}

/// Whether the stream should keep going after a line.
#[derive(Debug, PartialEq, Eq)]
enum LineOutcome {
    Continue,
    Done,
}

fn process_line<F>(line: &str, on_token: &mut F) -> LineOutcome
where
    F: FnMut(&str),
{
    let line = line.trim();
    if line.is_empty() {
        return LineOutcome::Continue;
    }

    let record = match serde_json::from_str::<StreamRecord>(line) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!("Skipping malformed stream line {:?}: {}", line, e);
            return LineOutcome::Continue;
        }
    };

    if let Some(err) = &record.error {
        tracing::warn!("Backend reported an error mid-stream: {}", err);
    }

    let text = record.text();
    if !text.is_empty() {
        on_token(text);
    }

    if record.done {
        LineOutcome::Done
    } else {
        LineOutcome::Continue
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

/// Client for a local Ollama server.
#[derive(Clone, Debug)]
pub struct OllamaClient {
    base_url: String,
    http: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends the full conversation and calls `on_token` once per
    /// streamed text fragment, in arrival order. Returns once the
    /// backend sends a `done` record or closes the connection.
    pub async fn stream_chat<F>(
        &self,
        model: &str,
        messages: &[Message],
        mut on_token: F,
    ) -> Result<(), ClientError>
    where
        F: FnMut(&str),
    {
        let url = self.url("/api/chat");
        let payload = json!({
            "model": model,
            "messages": messages,
            "stream": true,
        });

        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| ClientError::from_send(&url, e))?;

        if !response.status().is_success() {
            return Err(ClientError::from_status(response.status()));
        }

        let mut stream = response.bytes_stream();
        let mut buffer = LineBuffer::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for line in buffer.push(&chunk) {
                if process_line(&line, &mut on_token) == LineOutcome::Done {
                    tracing::debug!("Stream finished with done record");
                    return Ok(());
                }
            }
        }

        if let Some(line) = buffer.finish() {
            process_line(&line, &mut on_token);
        }
        tracing::debug!("Stream closed by backend");

        Ok(())
    }

    /// Models available on the backend, in the order it reports them.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, ClientError> {
        let url = self.url("/api/tags");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::from_send(&url, e))?;

        if !response.status().is_success() {
            return Err(ClientError::from_status(response.status()));
        }

        let body = response.text().await?;
        let tags: TagsResponse = serde_json::from_str(&body)?;
        Ok(tags.models)
    }

    pub async fn model_exists(&self, name: &str) -> Result<bool, ClientError> {
        let models = self.list_models().await?;
        Ok(models.iter().any(|m| m.name == name))
    }

    /// Liveness probe. Any HTTP answer counts as alive.
    pub async fn check_connection(&self) -> bool {
        self.http
            .get(self.url("/api/tags"))
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .is_ok()
    }
}

pub fn format_size(bytes: u64) -> String {
    let gb = bytes as f64 / (1024.0 * 1024.0 * 1024.0);
    if gb >= 1.0 {
        format!("{:.1} GB", gb)
    } else {
        format!("{:.0} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
