use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use journal_storage::{
    select_backend, Config, KeyValueBackend, RemoteStorage, SessionPrincipal, SyncBackoff,
};
use serde_json::{json, Value};
use tokio::signal;
use tokio::sync::watch as tokio_watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "journal-storage")]
#[command(about = "Local-first journal storage with remote sync", version)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the remote kv_records table
    InitRemote,

    #[command(flatten)]
    Store(StoreCommand),
}

/// Commands that run against the selected backend.
#[derive(Subcommand, Debug)]
enum StoreCommand {
    /// Print the value stored under a key
    Get { key: String },
    /// Store a JSON value under a key
    Set {
        key: String,
        /// JSON document, e.g. '{"mood":5}'
        value: String,
    },
    /// Remove a key
    Remove { key: String },
    /// List keys starting with a prefix
    List {
        #[arg(long, default_value = "")]
        prefix: String,
    },
    /// Remove every key in the namespace
    Clear,
    /// Probe the selected backend
    Health,
    /// Replay pending writes against the remote store
    Sync {
        /// Keep draining until interrupted, backing off while the remote fails
        #[arg(long)]
        follow: bool,
        #[arg(long, default_value = "1000")]
        base_delay_ms: u64,
        #[arg(long, default_value = "300000")]
        max_delay_ms: u64,
    },
    /// Print writes waiting for the remote store
    Pending,
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let principal = Arc::new(SessionPrincipal::new(cli.config.principal()));

    match cli.command {
        Command::InitRemote => init_remote(&cli.config, principal).await,
        Command::Store(command) => run(command, &cli.config, principal).await,
    }
}

async fn init_remote(config: &Config, principal: Arc<SessionPrincipal>) -> anyhow::Result<()> {
    let remote_config = config
        .remote_config()
        .context("init-remote needs CLOUDFLARE_ACCOUNT_ID, CLOUDFLARE_API_TOKEN and D1_DATABASE_ID")?;
    RemoteStorage::new(&remote_config, principal)?
        .ensure_schema()
        .await?;
    info!("Remote schema ready");
    Ok(())
}

async fn run(
    command: StoreCommand,
    config: &Config,
    principal: Arc<SessionPrincipal>,
) -> anyhow::Result<()> {
    let storage_config = config.storage_config();
    info!(
        "Starting journal-storage v{} ({} backend)",
        env!("CARGO_PKG_VERSION"),
        storage_config.backend_kind()
    );
    let backend = select_backend(&storage_config, principal).await?;

    match command {
        StoreCommand::Get { key } => {
            let value = backend.get(&key).await?;
            print_json(&json!({"key": key, "found": value.is_some(), "value": value}))?;
        }
        StoreCommand::Set { key, value } => {
            let value: Value = serde_json::from_str(&value)
                .with_context(|| format!("value for {} is not valid JSON", key))?;
            backend.set(&key, &value).await?;
            print_json(&json!({"key": key, "pending": backend.pending_writes().len()}))?;
        }
        StoreCommand::Remove { key } => {
            backend.remove(&key).await?;
        }
        StoreCommand::List { prefix } => {
            let mut keys = backend.list_keys(&prefix).await?;
            keys.sort();
            print_json(&keys)?;
        }
        StoreCommand::Clear => {
            backend.clear().await?;
        }
        StoreCommand::Health => {
            let healthy = backend.health_check().await;
            print_json(&json!({"backend": backend.kind(), "healthy": healthy}))?;
            if !healthy {
                anyhow::bail!("{} backend is unhealthy", backend.kind());
            }
        }
        StoreCommand::Sync {
            follow,
            base_delay_ms,
            max_delay_ms,
        } => {
            let mut backoff = SyncBackoff::new(
                Duration::from_millis(base_delay_ms),
                Duration::from_millis(max_delay_ms),
            );
            let mut shutdown_rx = create_shutdown_signal();

            loop {
                let report = backend.process_sync_queue().await;
                print_json(&report)?;
                if !follow {
                    break;
                }

                let delay = backoff.next_delay(&report);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {},
                    _ = shutdown_rx.wait_for(|&v| v) => break,
                }
            }
        }
        StoreCommand::Pending => {
            print_json(&backend.pending_writes())?;
        }
    }

    Ok(())
}

/// Create a shutdown signal that triggers on Ctrl+C or SIGTERM.
fn create_shutdown_signal() -> tokio_watch::Receiver<bool> {
    let (tx, rx) = tokio_watch::channel(false);

    tokio::spawn(async move {
        let ctrl_c = async {
            match signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl+C, stopping"),
                Err(_) => std::future::pending::<()>().await,
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                    info!("Received SIGTERM, stopping");
                }
                Err(_) => std::future::pending::<()>().await,
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        let _ = tx.send(true);
    });

    rx
}
