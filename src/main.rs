// Claude Code container sessions over MCP stdio
//
// stdout carries the protocol; all logging goes to stderr.

use anyhow::Result;
use kodegen_claude_container::{ServerConfig, serve_stdio};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = ServerConfig::from_env()?;
    serve_stdio(config).await
}
