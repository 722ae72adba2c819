use anyhow::Result;
use yak::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
