//! GridKV server
//!
//! Opens the store, starts its sweeper and migrator, and serves framed
//! requests until Ctrl+C.

use gridkv::commands::CommandHandler;
use gridkv::connection::{handle_connection, ConnectionStats};
use gridkv::storage::{Store, StoreConfig, StoreFrontier};
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Server configuration
struct Config {
    host: String,
    port: u16,
    store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: gridkv::DEFAULT_HOST.to_string(),
            port: gridkv::DEFAULT_PORT,
            store: StoreConfig::default(),
        }
    }
}

/// Reads the value following `args[i]`, exiting with a message when it is
/// missing or malformed.
fn flag_value<T: FromStr>(args: &[String], i: usize) -> T {
    let flag = &args[i];
    let Some(raw) = args.get(i + 1) else {
        eprintln!("Error: {} requires a value", flag);
        std::process::exit(1);
    };
    raw.parse().unwrap_or_else(|_| {
        eprintln!("Error: invalid value '{}' for {}", raw, flag);
        std::process::exit(1);
    })
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => config.host = flag_value(&args, i),
                "--port" | "-p" => config.port = flag_value(&args, i),
                "--capacity" | "-c" => config.store.initial_capacity = flag_value(&args, i),
                "--load-factor" => config.store.resize.load_factor = flag_value(&args, i),
                "--growth-factor" => config.store.resize.growth_factor = flag_value(&args, i),
                "--shards-per-manager" => {
                    config.store.resize.shards_per_manager = flag_value(&args, i)
                }
                "--migration-batch" => config.store.migration.batch_size = flag_value(&args, i),
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("GridKV version {}", gridkv::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
            i += 2;
        }

        if let Err(e) = config.store.resize.validate() {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        if config.store.migration.batch_size == 0 {
            eprintln!("Error: --migration-batch must be at least 1");
            std::process::exit(1);
        }

        config
    }

    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn print_help() {
    println!(
        r#"
GridKV - In-memory key-value store with online resharding

USAGE:
    gridkv [OPTIONS]

OPTIONS:
    -h, --host <HOST>                Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>                Port to listen on (default: 8080)
    -c, --capacity <KEYS>            Initial capacity in keys (default: 80)
        --load-factor <RATIO>        Grow once used/total exceeds this (default: 0.75)
        --growth-factor <N>          Capacity multiplier per resize (default: 2)
        --shards-per-manager <N>     Shards in each manager (default: 16)
        --migration-batch <N>        Keys moved per migration step (default: 256)
    -v, --version                    Print version information
        --help                       Print this help message

EXAMPLES:
    gridkv                           # Start on 127.0.0.1:8080
    gridkv --capacity 100000         # Pre-size for 100k keys
    RUST_LOG=debug gridkv            # Verbose logging

CONNECTING:
    $ gridkv-cli --port 8080
    > SET session abc EX 60
    OK
    > GET session
    abc
"#
    );
}

fn print_banner(config: &Config, frontier: &StoreFrontier) {
    println!(
        r#"
GridKV v{} - In-memory key-value store
──────────────────────────────────────────────────────────────
Server started on {}
Topology {} (capacity {})
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        gridkv::VERSION,
        config.bind_address(),
        frontier.topology(),
        config.store.initial_capacity
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let store = Store::open(config.store.clone());
    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address()).await?;
    print_banner(&config, store.frontier());
    info!("Listening on {}", config.bind_address());

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, stopping server..."),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, stopping server..."),
        }
    };

    let command_handler = CommandHandler::new(Arc::clone(store.frontier()));

    tokio::select! {
        _ = accept_loop(listener, command_handler, stats) => {}
        _ = shutdown => {}
    }

    store.close();
    info!("Server shutdown complete");
    Ok(())
}

/// Accepts connections forever, one task per client.
///
/// Every connection gets a clone of the same handler, so INFO reports
/// server uptime.
async fn accept_loop(
    listener: TcpListener,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = command_handler.clone();
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    handle_connection(stream, addr, handler, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
