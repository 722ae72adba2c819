use std::io::{self, Write};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::process::{Child, Command};

use crate::core::AppConfig;
use crate::ollama::OllamaClient;

const STARTUP_ATTEMPTS: u32 = 10;
const STARTUP_INTERVAL: Duration = Duration::from_secs(1);

/// An `ollama serve` process launched by this client. It is killed
/// on `shutdown` or, failing that, when the handle is dropped.
pub struct BackendProcess {
    child: Child,
}

impl BackendProcess {
    pub fn spawn(program: &str) -> Result<Self> {
        let child = Command::new(program)
            .arg("serve")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to launch `{} serve`", program))?;
        tracing::info!("Launched backend process {:?}", child.id());
        Ok(Self { child })
    }

    pub async fn shutdown(mut self) -> Result<()> {
        if self.child.try_wait()?.is_none() {
            tracing::info!("Stopping backend process {:?}", self.child.id());
            self.child.kill().await?;
        }
        Ok(())
    }
}

/// Polls the backend until it answers or `attempts` runs out.
pub async fn wait_for_backend(client: &OllamaClient, attempts: u32, interval: Duration) -> bool {
    for _ in 0..attempts {
        if client.check_connection().await {
            return true;
        }
        print!(".");
        let _ = io::stdout().flush();
        tokio::time::sleep(interval).await;
    }
    false
}

/// Makes sure a backend is reachable, launching one if needed, then
/// runs the interactive chat. A backend launched here is shut down
/// when the chat ends.
pub async fn run(config: &AppConfig) -> Result<()> {
    println!("🦧 Yak - Starting up...\n");
    let client = OllamaClient::new(&config.ollama_host);

    if client.check_connection().await {
        println!("✅ Ollama is running\n");
        return super::chat::run(config).await;
    }

    println!("🔄 Starting Ollama...");
    let backend = BackendProcess::spawn("ollama")?;
    print!("⏳ Waiting for Ollama to start");
    let _ = io::stdout().flush();

    if !wait_for_backend(&client, STARTUP_ATTEMPTS, STARTUP_INTERVAL).await {
        backend.shutdown().await?;
        bail!("Ollama did not start, try running `ollama serve` yourself");
    }
    println!("\n✅ Ollama is ready\n");

    let result = super::chat::run(config).await;
    backend.shutdown().await?;
    result
}
