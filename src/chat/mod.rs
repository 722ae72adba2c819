pub mod core;
pub mod models;
pub mod store;

pub use self::core::{Chat, ChatBuilder, QUIT_TOKENS};
pub use models::{DisplaySink, InputSource, Transcript, TurnOutcome, TurnState};
pub use store::{SessionStore, StoreError, sanitize_name};
