use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ollama::DEFAULT_OLLAMA_HOST;

pub const DEFAULT_MODEL: &str = "llama3:instruct";
pub const DEFAULT_CHAT: &str = "default";

/// Process level configuration read from the environment.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub storage_path: PathBuf,
    pub settings_path: PathBuf,
    pub chats_path: PathBuf,
    pub ollama_host: String,
    pub web_enhance: bool,
}

impl AppConfig {
    pub fn new(storage_path: &Path, ollama_host: &str, web_enhance: bool) -> Self {
        Self {
            storage_path: storage_path.to_path_buf(),
            settings_path: storage_path.join("config.json"),
            chats_path: storage_path.join("chats"),
            ollama_host: ollama_host.to_string(),
            web_enhance,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let storage_path = env::var("YAK_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".yak")
            });
        let ollama_host =
            env::var("YAK_OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_OLLAMA_HOST.to_string());
        let web_enhance = env::var("YAK_WEB_ENHANCE")
            .map(|v| !matches!(v.to_lowercase().as_str(), "0" | "false" | "off" | "no"))
            .unwrap_or(true);

        Self::new(&storage_path, &ollama_host, web_enhance)
    }
}

/// The small persisted record of user choices: which model to talk to
/// and which chat session is current.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub model: String,
    pub current_chat: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            current_chat: DEFAULT_CHAT.to_string(),
        }
    }
}

/// Reads settings from `path`. A missing file gives the defaults and
/// so does unreadable JSON, with a warning, so a hand edited config
/// can't keep the client from starting.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Settings::default()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    match serde_json::from_str::<Settings>(&content) {
        Ok(settings) => Ok(settings),
        Err(e) => {
            tracing::warn!(
                "Ignoring corrupt settings in {} ({}), using defaults",
                path.display(),
                e
            );
            Ok(Settings::default())
        }
    }
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(settings)?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
