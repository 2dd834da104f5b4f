//! Interactive GridKV client
//!
//! Reads one request per stdin line, sends it and prints the reply. A line
//! with five fields (`SET key value EX 60`) carries a TTL in seconds from
//! now.

use anyhow::Context;
use gridkv::client::{Client, ClientError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

struct Config {
    host: String,
    port: u16,
}

impl Config {
    fn from_args() -> anyhow::Result<Self> {
        let mut config = Config {
            host: gridkv::DEFAULT_HOST.to_string(),
            port: gridkv::DEFAULT_PORT,
        };
        let mut args = std::env::args().skip(1);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--host" | "-h" => {
                    config.host = args.next().context("--host requires a value")?;
                }
                "--port" | "-p" => {
                    let raw = args.next().context("--port requires a value")?;
                    config.port = raw
                        .parse()
                        .with_context(|| format!("invalid port number '{}'", raw))?;
                }
                "--help" => {
                    println!("USAGE:\n    gridkv-cli [--host <HOST>] [--port <PORT>]");
                    std::process::exit(0);
                }
                other => anyhow::bail!("unknown argument: {}", other),
            }
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let config = Config::from_args()?;
    let addr = format!("{}:{}", config.host, config.port);
    let mut client = Client::connect(addr.as_str())
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;
    debug!(server = %addr, "Connected");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        match client.send(&line).await {
            Ok(reply) => println!("{}", reply),
            Err(ClientError::Request(e)) => warn!(error = %e, "Request not sent"),
            Err(e) => return Err(e).context("lost connection to server"),
        }
    }

    Ok(())
}
