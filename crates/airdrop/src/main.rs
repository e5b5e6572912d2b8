mod cli;
mod server;
mod sync;

use std::path::Path;
use std::sync::Arc;

use axum::http::HeaderValue;
use clap::Parser;
use eyre::{eyre, WrapErr};

use airdrop_core::store::{FileStore, MemoryStore, RecordStore};
use airdrop_core::{TokenRecord, TokenService};

use cli::{Command, ServeArgs, StorageKind};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .init();

    match args.command {
        Command::Serve(args) => serve(args).await,
        Command::Sync(args) => sync::run(args).await,
    }
}

async fn serve(args: ServeArgs) -> eyre::Result<()> {
    let store = open_store(&args).await?;

    let cors_origin = args
        .cors_origin
        .as_deref()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .wrap_err_with(|| format!("invalid --cors-origin `{origin}`"))
        })
        .transpose()?;

    let state = server::AppState {
        tokens: TokenService::new(store),
    };
    let router = server::build_router(state, cors_origin);

    let bind_addr = format!("{}:{}", args.bind, args.port);
    if args.bind == "0.0.0.0" {
        tracing::warn!("server is bound to 0.0.0.0; it is accessible from the network");
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .context("bind TCP listener")?;

    tracing::info!("listening on {bind_addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("run HTTP server")?;

    Ok(())
}

/// Pick the record store backend once, at startup.
async fn open_store(args: &ServeArgs) -> eyre::Result<Arc<dyn RecordStore>> {
    match args.storage {
        StorageKind::File => {
            if args.seed.is_some() {
                tracing::warn!("--seed only applies to the memory backend; ignoring it");
            }
            tracing::info!(path = %args.data_file.display(), "using file snapshot store");
            Ok(Arc::new(FileStore::new(&args.data_file)))
        }
        StorageKind::Memory => {
            let records = match &args.seed {
                Some(path) => load_seed(path).await?,
                None => Vec::new(),
            };
            tracing::warn!(
                seeded = records.len(),
                "using in-memory store, records are lost on exit"
            );
            Ok(Arc::new(MemoryStore::with_records(records)))
        }
    }
}

/// An explicitly requested seed must exist and decode; unlike the file
/// backend there is nothing to fall back to.
async fn load_seed(path: &Path) -> eyre::Result<Vec<TokenRecord>> {
    if !path.is_file() {
        return Err(eyre!("seed snapshot not found: {}", path.display()));
    }
    let content = tokio::fs::read(path)
        .await
        .wrap_err_with(|| format!("read seed snapshot {}", path.display()))?;
    serde_json::from_slice(&content)
        .wrap_err_with(|| format!("decode seed snapshot {}", path.display()))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received, draining connections");
}
