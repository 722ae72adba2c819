//! File backed chat sessions. Each session is a newline delimited
//! JSON file `<chats_dir>/<name>.jsonl` holding one `Message` per
//! line in conversation order. The file is only ever appended to,
//! truncated by a reset, or removed by a delete.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::config::DEFAULT_CHAT;
use crate::core::{Settings, save_settings};
use crate::ollama::Message;

const SESSION_EXT: &str = "jsonl";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("chat name is empty")]
    InvalidName,
    #[error("chat \"{0}\" already exists")]
    AlreadyExists(String),
    #[error("chat \"{0}\" not found")]
    NotFound(String),
    #[error("cannot delete the current chat \"{0}\", switch to another chat first")]
    CannotDeleteCurrent(String),
    #[error("chat \"{session}\" has an unreadable entry on line {line}: {source}")]
    Corrupt {
        session: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Settings(#[from] anyhow::Error),
}

/// Replaces anything outside `[A-Za-z0-9_-]` with `-` after trimming.
/// Distinct raw names that map to the same string refer to the same
/// session.
pub fn sanitize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

pub struct SessionStore {
    chats_dir: PathBuf,
    settings_path: PathBuf,
    settings: Settings,
}

impl SessionStore {
    /// The current session named in `settings` is sanitized like any
    /// other name before it is used as a path. A name with nothing
    /// usable left falls back to the default session.
    pub fn new(chats_dir: &Path, settings_path: &Path, mut settings: Settings) -> Self {
        let current = sanitize_name(&settings.current_chat);
        if current != settings.current_chat {
            tracing::warn!(
                "Current chat {:?} in settings is not a valid name",
                settings.current_chat
            );
        }
        settings.current_chat = if current.is_empty() {
            DEFAULT_CHAT.to_string()
        } else {
            current
        };

        Self {
            chats_dir: chats_dir.to_path_buf(),
            settings_path: settings_path.to_path_buf(),
            settings,
        }
    }

    pub fn current_session(&self) -> &str {
        &self.settings.current_chat
    }

    fn session_path(&self, name: &str) -> PathBuf {
        self.chats_dir.join(format!("{}.{}", name, SESSION_EXT))
    }

    fn exists(&self, name: &str) -> bool {
        name == self.current_session() || self.session_path(name).exists()
    }

    /// Moves the current pointer. The session being left is written
    /// out first so it stays listed even if it never got a message.
    fn set_current(&mut self, name: &str) -> Result<(), StoreError> {
        let previous = self.session_path(self.current_session());
        if !previous.exists() {
            fs::create_dir_all(&self.chats_dir)?;
            fs::write(&previous, "")?;
        }

        self.settings.current_chat = name.to_string();
        save_settings(&self.settings_path, &self.settings)?;
        Ok(())
    }

    /// Sorted session names. The current session is always included
    /// even before anything has been written to it.
    pub fn list_sessions(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();

        match fs::read_dir(&self.chats_dir) {
            Ok(entries) => {
                for entry in entries {
                    let path = entry?.path();
                    if path.extension().and_then(|e| e.to_str()) != Some(SESSION_EXT) {
                        continue;
                    }
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        names.push(stem.to_string());
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let current = self.current_session().to_string();
        if !names.contains(&current) {
            names.push(current);
        }
        names.sort();
        Ok(names)
    }

    /// Creates an empty session and makes it current. Returns the
    /// sanitized name actually used.
    pub fn create_session(&mut self, name: &str) -> Result<String, StoreError> {
        let name = sanitize_name(name);
        if name.is_empty() {
            return Err(StoreError::InvalidName);
        }
        if self.exists(&name) {
            return Err(StoreError::AlreadyExists(name));
        }

        fs::create_dir_all(&self.chats_dir)?;
        fs::write(self.session_path(&name), "")?;
        self.set_current(&name)?;
        tracing::info!("Created chat session {}", name);

        Ok(name)
    }

    pub fn switch_session(&mut self, name: &str) -> Result<String, StoreError> {
        let name = sanitize_name(name);
        if name.is_empty() {
            return Err(StoreError::InvalidName);
        }
        if !self.exists(&name) {
            return Err(StoreError::NotFound(name));
        }

        self.set_current(&name)?;
        Ok(name)
    }

    /// Removes a session and all of its messages. The current session
    /// can't be deleted so the current pointer never dangles.
    pub fn delete_session(&mut self, name: &str) -> Result<String, StoreError> {
        let name = sanitize_name(name);
        if name.is_empty() {
            return Err(StoreError::InvalidName);
        }
        if name == self.current_session() {
            return Err(StoreError::CannotDeleteCurrent(name));
        }

        match fs::remove_file(self.session_path(&name)) {
            Ok(()) => {
                tracing::info!("Deleted chat session {}", name);
                Ok(name)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(name)),
            Err(e) => Err(e.into()),
        }
    }

    /// All messages of the current session in the order they were
    /// appended. A session that was never written to is empty.
    pub fn read_history(&self) -> Result<Vec<Message>, StoreError> {
        let session = self.current_session();
        let content = match fs::read_to_string(self.session_path(session)) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str::<Message>(line).map_err(|source| StoreError::Corrupt {
                    session: session.to_string(),
                    line: idx + 1,
                    source,
                })
            })
            .collect()
    }

    pub fn append_message(&self, message: &Message) -> Result<(), StoreError> {
        fs::create_dir_all(&self.chats_dir)?;

        let mut line = serde_json::to_string(message).map_err(std::io::Error::from)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.session_path(self.current_session()))?;
        file.write_all(line.as_bytes())?;
        file.flush()?;

        Ok(())
    }

    /// Clears the current session's messages but keeps the session.
    pub fn reset_current(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.chats_dir)?;
        fs::write(self.session_path(self.current_session()), "")?;
        Ok(())
    }
}
