//! The core models for running a conversation turn by turn.
use crate::ollama::{ClientError, Message, Role};
use crate::web::Enhancement;

/// Where a turn is in its lifecycle. A turn always ends back in
/// `AwaitingInput` unless the user quits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnState {
    AwaitingInput,
    Enhancing,
    Streaming,
    Persisting,
    Exit,
}

#[derive(Debug)]
pub enum TurnOutcome {
    /// Blank input, nothing happened.
    Ignored,
    Exit,
    Replied(Message),
    /// The backend call failed. The user message is kept, no reply
    /// was stored.
    Failed(ClientError),
}

/// Receives everything the user should see during a turn.
pub trait DisplaySink {
    fn notice(&mut self, text: &str);
    fn turn_started(&mut self);
    fn token(&mut self, text: &str);
    fn turn_finished(&mut self);
    fn turn_failed(&mut self, err: &ClientError);
}

/// Line oriented user input. `None` means the input is exhausted.
pub trait InputSource {
    fn next_line(&mut self) -> Option<String>;
}

#[derive(Default)]
pub struct Transcript(Vec<Message>);

impl Transcript {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn new_with_messages(messages: Vec<Message>) -> Self {
        Self(messages)
    }

    pub fn messages(&self) -> Vec<Message> {
        self.0.clone()
    }

    pub fn push(&mut self, msg: Message) {
        self.0.push(msg)
    }

    /// Copy of the transcript to send to the backend. When the
    /// enhancement changed the prompt, the final user message of the
    /// copy carries the augmented text. The transcript itself is
    /// never modified.
    pub fn augmented_context(&self, enhancement: &Enhancement) -> Vec<Message> {
        let mut context = self.messages();
        if let Some(last) = context.last_mut()
            && last.role == Role::User
            && last.content != enhancement.prompt.as_str()
        {
            last.content = enhancement.prompt.as_str().to_string();
        }
        context
    }
}
