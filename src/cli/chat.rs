use anyhow::Result;

use crate::chat::{ChatBuilder, SessionStore};
use crate::cli::ui::{LineEditor, TerminalSink};
use crate::core::{AppConfig, load_settings};
use crate::web::WebEnhancer;

pub async fn run(config: &AppConfig) -> Result<()> {
    let settings = load_settings(&config.settings_path)?;
    let store = SessionStore::new(&config.chats_path, &config.settings_path, settings.clone());

    println!("🧠 Model: {}   💬 Chat: {}", settings.model, store.current_session());
    println!("💡 /bye or /quit to exit, include a URL to pull in web content\n");

    let mut builder = ChatBuilder::new(&config.ollama_host, &settings.model, store);
    if config.web_enhance {
        builder = builder.web_enhancer(WebEnhancer::new());
    }
    let mut chat = builder.build();

    let mut input = LineEditor::new()?;
    let mut sink = TerminalSink::new();
    chat.run(&mut input, &mut sink).await?;

    Ok(())
}
