use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Airdrop: issue limited-quantity access codes and track redeeming accounts.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP service.
    Serve(ServeArgs),
    /// Replace the local snapshot with the records served by a running instance.
    Sync(SyncArgs),
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageKind {
    /// Pretty-printed JSON snapshot on disk.
    File,
    /// Process memory only; optionally seeded from a snapshot.
    Memory,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind the web server to.
    #[arg(long, default_value = "127.0.0.1", env = "AIRDROP_BIND")]
    pub bind: String,

    /// Port to listen on.
    #[arg(long, default_value = "3000", env = "AIRDROP_PORT")]
    pub port: u16,

    /// Where token records are kept.
    #[arg(long, value_enum, default_value = "file", env = "AIRDROP_STORAGE")]
    pub storage: StorageKind,

    /// Snapshot file used by the `file` backend.
    #[arg(long, default_value = "db/auth.json", env = "AIRDROP_DATA_FILE")]
    pub data_file: PathBuf,

    /// Snapshot loaded into the `memory` backend at startup.
    #[arg(long, env = "AIRDROP_SEED")]
    pub seed: Option<PathBuf>,

    /// Browser origin allowed to call the API. CORS is off when omitted.
    #[arg(long, env = "AIRDROP_CORS_ORIGIN")]
    pub cors_origin: Option<String>,
}

#[derive(Args)]
pub struct SyncArgs {
    /// Token listing endpoint of the source instance, e.g. https://host/auth.
    #[arg(long = "from", env = "AIRDROP_SYNC_URL")]
    pub source_url: String,

    /// Local snapshot file to overwrite.
    #[arg(long, default_value = "db/auth.json", env = "AIRDROP_DATA_FILE")]
    pub data_file: PathBuf,

    /// Request timeout in seconds.
    #[arg(long, default_value = "10")]
    pub timeout_secs: u64,
}
