use anyhow::{Result, bail};

use crate::core::{AppConfig, load_settings, save_settings};
use crate::ollama::{OllamaClient, format_size};

pub async fn list(config: &AppConfig) -> Result<()> {
    let settings = load_settings(&config.settings_path)?;
    let client = OllamaClient::new(&config.ollama_host);
    let models = client.list_models().await?;

    if models.is_empty() {
        println!("📥 No models found");
        println!("💡 Download one with: ollama pull gemma2:2b");
        return Ok(());
    }

    for model in models {
        let marker = if model.name == settings.model { "👉" } else { "  " };
        println!("{} {:<30} {}", marker, model.name, format_size(model.size));
    }
    println!("\nCurrent model: {}", settings.model);
    Ok(())
}

pub async fn switch(config: &AppConfig, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Model name required: yak model <name>");
    }

    let client = OllamaClient::new(&config.ollama_host);
    if !client.model_exists(name).await? {
        bail!("Model \"{}\" not found, use `yak models` to see available models", name);
    }

    let mut settings = load_settings(&config.settings_path)?;
    settings.model = name.to_string();
    save_settings(&config.settings_path, &settings)?;
    println!("✓ Switched to model: {}", name);
    Ok(())
}
