//! Test utilities for integration tests
use std::collections::VecDeque;
use std::path::Path;

use yak::chat::{Chat, ChatBuilder, DisplaySink, InputSource, SessionStore};
use yak::core::Settings;
use yak::ollama::ClientError;
use yak::web::WebEnhancer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Notice(String),
    Started,
    Token(String),
    Finished,
    Failed(String),
}

/// Display sink that remembers everything it was shown.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<SinkEvent>,
}

impl RecordingSink {
    pub fn tokens(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Token(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SinkEvent::Failed(_)))
            .count()
    }
}

impl DisplaySink for RecordingSink {
    fn notice(&mut self, text: &str) {
        self.events.push(SinkEvent::Notice(text.to_string()));
    }
    fn turn_started(&mut self) {
        self.events.push(SinkEvent::Started);
    }
    fn token(&mut self, text: &str) {
        self.events.push(SinkEvent::Token(text.to_string()));
    }
    fn turn_finished(&mut self) {
        self.events.push(SinkEvent::Finished);
    }
    fn turn_failed(&mut self, err: &ClientError) {
        self.events.push(SinkEvent::Failed(err.to_string()));
    }
}

/// Input that replays a fixed list of lines.
pub struct ScriptedInput(pub VecDeque<String>);

impl ScriptedInput {
    pub fn new(lines: &[&str]) -> Self {
        Self(lines.iter().map(|l| l.to_string()).collect())
    }
}

impl InputSource for ScriptedInput {
    fn next_line(&mut self) -> Option<String> {
        self.0.pop_front()
    }
}

pub fn test_store(dir: &Path) -> SessionStore {
    SessionStore::new(
        &dir.join("chats"),
        &dir.join("config.json"),
        Settings::default(),
    )
}

pub fn test_chat(dir: &Path, ollama_url: &str, web: bool) -> Chat {
    let builder = ChatBuilder::new(ollama_url, "llama3", test_store(dir));
    if web {
        builder.web_enhancer(WebEnhancer::new()).build()
    } else {
        builder.build()
    }
}

/// A streamed chat response body: one record per token followed by a
/// final `done` record.
pub fn chat_stream_body(tokens: &[&str]) -> String {
    let mut body = String::new();
    for token in tokens {
        let record = serde_json::json!({
            "model": "llama3",
            "message": {"role": "assistant", "content": token},
            "done": false
        });
        body.push_str(&record.to_string());
        body.push('\n');
    }
    body.push_str(r#"{"model":"llama3","message":{"role":"assistant","content":""},"done":true}"#);
    body.push('\n');
    body
}
