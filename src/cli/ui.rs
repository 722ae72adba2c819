//! Terminal side of a chat: line input and streamed output.
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::task::JoinHandle;

use crate::chat::{DisplaySink, InputSource};
use crate::ollama::ClientError;

pub const USER_PROMPT: &str = "🦧 ❯ ";
pub const ASSISTANT_PROMPT: &str = "🤖 │ ";

const FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const FRAME_INTERVAL: Duration = Duration::from_millis(80);

fn clear_line(out: &mut impl Write) {
    let _ = write!(out, "\r{}\r", " ".repeat(60));
    let _ = out.flush();
}

/// Spinner shown while waiting for the first token. Stopping it (or
/// dropping it) guarantees no further frames are drawn.
pub struct TypingIndicator {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TypingIndicator {
    pub fn start() -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(FRAME_INTERVAL);
            let mut frame = 0;
            loop {
                interval.tick().await;
                let keep_going = {
                    let mut out = io::stdout().lock();
                    if flag.load(Ordering::SeqCst) {
                        let _ = write!(
                            out,
                            "\r{}{} ",
                            ASSISTANT_PROMPT,
                            FRAMES[frame % FRAMES.len()]
                        );
                        let _ = out.flush();
                        true
                    } else {
                        false
                    }
                };
                if !keep_going {
                    break;
                }
                frame += 1;
            }
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        // Holding the stdout lock while flipping the flag means the
        // task can't be halfway through drawing a frame
        let mut out = io::stdout().lock();
        if self.running.swap(false, Ordering::SeqCst) {
            clear_line(&mut out);
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for TypingIndicator {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Default)]
pub struct TerminalSink {
    indicator: Option<TypingIndicator>,
}

impl TerminalSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops the spinner if it's still running. Returns true the first
    /// time it is called in a turn.
    fn stop_indicator(&mut self) -> bool {
        match self.indicator.take() {
            Some(mut indicator) => {
                indicator.stop();
                true
            }
            None => false,
        }
    }
}

impl DisplaySink for TerminalSink {
    fn notice(&mut self, text: &str) {
        println!("{}", text);
    }

    fn turn_started(&mut self) {
        self.indicator = Some(TypingIndicator::start());
    }

    fn token(&mut self, text: &str) {
        let mut out = io::stdout();
        if self.stop_indicator() {
            let _ = write!(out, "{}", ASSISTANT_PROMPT);
        }
        let _ = write!(out, "{}", text);
        let _ = out.flush();
    }

    fn turn_finished(&mut self) {
        self.stop_indicator();
        println!();
    }

    fn turn_failed(&mut self, err: &ClientError) {
        self.stop_indicator();
        println!();
        match err {
            ClientError::Connection { .. } => {
                eprintln!("Failed to connect to Ollama. Is `ollama serve` running?")
            }
            other => eprintln!("Error: {}", other),
        }
    }
}

/// Interactive line input with history for the current process.
pub struct LineEditor {
    editor: DefaultEditor,
}

impl LineEditor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl InputSource for LineEditor {
    fn next_line(&mut self) -> Option<String> {
        match self.editor.readline(USER_PROMPT) {
            Ok(line) => {
                let _ = self.editor.add_history_entry(line.as_str());
                Some(line)
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => None,
            Err(err) => {
                tracing::error!("Reading input failed: {:?}", err);
                None
            }
        }
    }
}
