//! `airdrop sync`: pull the record list from a running instance into the
//! local snapshot, keeping a timestamped backup of whatever was there.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use eyre::{bail, WrapErr};
use serde_json::Value;

use airdrop_core::store::{decode_records, FileStore};
use airdrop_core::TokenRecord;

use crate::cli::SyncArgs;

/// Leading characters of each token shown in the sync summary.
const TOKEN_PREVIEW_LEN: usize = 20;

pub async fn run(args: SyncArgs) -> eyre::Result<()> {
    tracing::info!(url = %args.source_url, "fetching token records from source instance");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()
        .context("build HTTP client")?;

    let response = client
        .get(&args.source_url)
        .send()
        .await
        .wrap_err_with(|| format!("request `{}`", args.source_url))?;
    let status = response.status();
    if !status.is_success() {
        bail!("source instance answered HTTP {status}");
    }

    let payload: Value = response.json().await.context("decode response body as JSON")?;
    let records = summarize_records(&payload)?;

    write_snapshot(&args.data_file, &payload).await?;

    tracing::info!(
        path = %args.data_file.display(),
        tokens = payload.as_array().map_or(0, Vec::len),
        "snapshot synchronized"
    );
    for (index, record) in records.iter().enumerate() {
        tracing::info!(
            index = index + 1,
            token = %token_preview(&record.token),
            accounts = record.acounts.len(),
            "synced token"
        );
    }

    Ok(())
}

fn summarize_records(payload: &Value) -> eyre::Result<Vec<TokenRecord>> {
    let Some(items) = payload.as_array() else {
        bail!("source instance did not return a JSON array of token records");
    };
    Ok(decode_records(items.clone()))
}

/// Back up the current snapshot, then replace it with the fetched document
/// as-is. The typed view of the records only feeds the summary log.
async fn write_snapshot(path: &Path, payload: &Value) -> eyre::Result<()> {
    if let Some(backup) = backup_existing(path).await? {
        tracing::info!(path = %backup.display(), "backed up previous snapshot");
    }
    FileStore::new(path)
        .save_value(payload)
        .await
        .context("write local snapshot")
}

/// Copy an existing snapshot to `<file>.backup.<unix-millis>`.
async fn backup_existing(path: &Path) -> eyre::Result<Option<PathBuf>> {
    let exists = tokio::fs::try_exists(path)
        .await
        .wrap_err_with(|| format!("inspect {}", path.display()))?;
    if !exists {
        return Ok(None);
    }

    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("get current time")?
        .as_millis();
    let backup = PathBuf::from(format!("{}.backup.{millis}", path.display()));
    tokio::fs::copy(path, &backup)
        .await
        .wrap_err_with(|| format!("back up {} to {}", path.display(), backup.display()))?;
    Ok(Some(backup))
}

fn token_preview(token: &str) -> &str {
    token
        .char_indices()
        .nth(TOKEN_PREVIEW_LEN)
        .map_or(token, |(idx, _)| &token[..idx])
}
