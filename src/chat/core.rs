use crate::ollama::{Message, OllamaClient};
use crate::web::{WebEnhancer, extract_urls};

use super::models::{DisplaySink, InputSource, Transcript, TurnOutcome, TurnState};
use super::store::{SessionStore, StoreError};

pub const QUIT_TOKENS: [&str; 2] = ["/bye", "/quit"];

/// Runs a conversation against a local model, one turn at a time.
///
/// Each turn:
/// - Stores the user's message exactly as typed
/// - Optionally folds linked web pages into the copy sent to the model
/// - Streams the reply to a `DisplaySink`
/// - Stores the trimmed reply once the stream completes
///
/// A failed backend call ends the turn without storing a reply.
/// Storage errors are returned to the caller.
///
/// Use `ChatBuilder` to construct a `Chat`.
pub struct Chat {
    client: OllamaClient,
    store: SessionStore,
    enhancer: Option<WebEnhancer>,
    model: String,
    state: TurnState,
}

impl Chat {
    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Processes one line of user input through a full turn.
    pub async fn handle_input<S>(
        &mut self,
        input: &str,
        sink: &mut S,
    ) -> Result<TurnOutcome, StoreError>
    where
        S: DisplaySink + ?Sized,
    {
        let command = input.trim();
        if command.is_empty() {
            return Ok(TurnOutcome::Ignored);
        }
        if QUIT_TOKENS.contains(&command) {
            self.state = TurnState::Exit;
            return Ok(TurnOutcome::Exit);
        }

        // Saved before anything touches the network so the message
        // survives a failed turn
        self.store.append_message(&Message::user(input))?;
        let transcript = Transcript::new_with_messages(self.store.read_history()?);

        self.state = TurnState::Enhancing;
        let context = match &self.enhancer {
            Some(enhancer) if !extract_urls(input).is_empty() => {
                sink.notice("Detected URL(s), fetching content...");
                let enhancement = enhancer.enhance(input).await;
                for url in &enhancement.fetched {
                    sink.notice(&format!("Fetched {}", url));
                }
                for (url, err) in &enhancement.failed {
                    sink.notice(&format!("Failed to fetch {}: {}", url, err));
                }
                transcript.augmented_context(&enhancement)
            }
            _ => transcript.messages(),
        };

        self.state = TurnState::Streaming;
        sink.turn_started();
        let mut reply = String::new();
        let result = self
            .client
            .stream_chat(&self.model, &context, |token| {
                reply.push_str(token);
                sink.token(token);
            })
            .await;

        if let Err(e) = result {
            tracing::error!("Turn failed: {}", e);
            sink.turn_failed(&e);
            self.state = TurnState::AwaitingInput;
            return Ok(TurnOutcome::Failed(e));
        }

        self.state = TurnState::Persisting;
        let message = Message::assistant(reply.trim());
        let stored = self.store.append_message(&message);
        sink.turn_finished();
        self.state = TurnState::AwaitingInput;
        stored?;

        Ok(TurnOutcome::Replied(message))
    }

    /// Reads input until a quit token or the end of input.
    pub async fn run<I, S>(&mut self, input: &mut I, sink: &mut S) -> Result<(), StoreError>
    where
        I: InputSource + ?Sized,
        S: DisplaySink + ?Sized,
    {
        self.state = TurnState::AwaitingInput;
        while let Some(line) = input.next_line() {
            if let TurnOutcome::Exit = self.handle_input(&line, sink).await? {
                break;
            }
        }
        self.state = TurnState::Exit;
        Ok(())
    }
}

pub struct ChatBuilder {
    ollama_host: String,
    model: String,
    store: SessionStore,
    enhancer: Option<WebEnhancer>,
}

impl ChatBuilder {
    pub fn new(ollama_host: &str, model: &str, store: SessionStore) -> Self {
        Self {
            ollama_host: ollama_host.to_string(),
            model: model.to_string(),
            store,
            enhancer: None,
        }
    }

    pub fn web_enhancer(mut self, enhancer: WebEnhancer) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    pub fn build(self) -> Chat {
        Chat {
            client: OllamaClient::new(&self.ollama_host),
            store: self.store,
            enhancer: self.enhancer,
            model: self.model,
            state: TurnState::AwaitingInput,
        }
    }
}
