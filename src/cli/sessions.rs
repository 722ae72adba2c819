use anyhow::Result;

use crate::chat::SessionStore;
use crate::core::{AppConfig, load_settings};

pub fn open_store(config: &AppConfig) -> Result<SessionStore> {
    let settings = load_settings(&config.settings_path)?;
    Ok(SessionStore::new(
        &config.chats_path,
        &config.settings_path,
        settings,
    ))
}

pub fn list(config: &AppConfig) -> Result<()> {
    let store = open_store(config)?;
    let current = store.current_session();

    for name in store.list_sessions()? {
        if name == current {
            println!("👉 {} (current)", name);
        } else {
            println!("   {}", name);
        }
    }
    Ok(())
}

pub fn create(config: &AppConfig, name: &str) -> Result<()> {
    let mut store = open_store(config)?;
    let name = store.create_session(name)?;
    println!("✓ Created and switched to: {}", name);
    Ok(())
}

pub fn switch(config: &AppConfig, name: &str) -> Result<()> {
    let mut store = open_store(config)?;
    let name = store.switch_session(name)?;
    println!("✓ Switched to: {}", name);
    Ok(())
}

pub fn delete(config: &AppConfig, name: &str) -> Result<()> {
    let mut store = open_store(config)?;
    let name = store.delete_session(name)?;
    println!("✓ Deleted chat: {}", name);
    Ok(())
}

pub fn reset(config: &AppConfig) -> Result<()> {
    let store = open_store(config)?;
    store.reset_current()?;
    println!("✓ Cleared history of: {}", store.current_session());
    Ok(())
}

pub fn show_config(config: &AppConfig) -> Result<()> {
    let settings = load_settings(&config.settings_path)?;
    println!("🧠 Model          {}", settings.model);
    println!("💬 Current Chat   {}", settings.current_chat);
    println!("🌐 Ollama         {}", config.ollama_host);
    println!("📁 Storage Path   {}", config.storage_path.display());
    println!("📁 Config Path    {}", config.settings_path.display());
    println!("📁 Chats Path     {}", config.chats_path.display());
    Ok(())
}
