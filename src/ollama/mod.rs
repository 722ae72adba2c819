pub mod core;
pub use self::core::{
    ClientError, DEFAULT_OLLAMA_HOST, LineBuffer, Message, ModelInfo, OllamaClient, Role,
    StreamRecord, format_size,
};
