//! Concurrent multi-pack import and single-document download.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use tokio::sync::Semaphore;

use aiqx_core::pack::Pack;
use aiqx_core::traits::{file_name, PackSource};
use aiqx_core::workspace::{ImportOutcome, OnConflict, Workspace};

use crate::config::CatalogConfig;
use crate::error::FetchError;

/// Upper bound for the backoff between retries.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Concurrency and retry settings for remote fetches.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub parallelism: usize,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from(&CatalogConfig::default())
    }
}

impl From<&CatalogConfig> for FetchOptions {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            parallelism: config.parallelism.max(1),
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Callback trait for reporting import progress.
pub trait ImportProgress: Send + Sync {
    fn on_fetch_start(&self, path: &str);
    fn on_fetch_complete(&self, path: &str, pack: &Pack);
    fn on_fetch_error(&self, path: &str, error: &str);
}

/// No-op progress reporter.
pub struct NoProgress;

impl ImportProgress for NoProgress {
    fn on_fetch_start(&self, _: &str) {}
    fn on_fetch_complete(&self, _: &str, _: &Pack) {}
    fn on_fetch_error(&self, _: &str, _: &str) {}
}

/// Run `op`, retrying transient fetch errors with exponential backoff.
///
/// A rate-limit hint from the source replaces the current delay.
pub async fn with_retry<T, F, Fut>(
    options: &FetchOptions,
    label: &str,
    mut op: F,
) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut delay = options.retry_delay;
    let mut retry = 0;
    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if retry >= options.max_retries || FetchError::is_permanent_error(&err) {
            return Err(err);
        }
        if let Some(FetchError::RateLimited { retry_after_ms }) = err.downcast_ref::<FetchError>() {
            delay = Duration::from_millis(*retry_after_ms);
        }
        retry += 1;
        tracing::warn!(
            path = label,
            retry,
            delay_ms = delay.as_millis() as u64,
            "retrying fetch: {err}"
        );
        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(MAX_RETRY_DELAY);
    }
}

/// Fetch and validate one pack, retrying transient failures.
pub async fn fetch_with_retry(
    source: &dyn PackSource,
    path: &str,
    options: &FetchOptions,
) -> anyhow::Result<Pack> {
    with_retry(options, path, || source.fetch_pack(path)).await
}

/// Fetch every path with at most `options.parallelism` requests in flight.
///
/// Results come back in the order of `paths`, whatever order the fetches
/// finished in.
pub async fn fetch_packs(
    source: &dyn PackSource,
    paths: &[String],
    options: &FetchOptions,
    progress: &dyn ImportProgress,
) -> Vec<(String, anyhow::Result<Pack>)> {
    let semaphore = Semaphore::new(options.parallelism.max(1));
    let mut futures = FuturesUnordered::new();

    for (idx, path) in paths.iter().enumerate() {
        let semaphore = &semaphore;
        futures.push(async move {
            let result = match semaphore.acquire().await {
                Ok(_permit) => {
                    progress.on_fetch_start(path);
                    fetch_with_retry(source, path, options).await
                }
                Err(_) => Err(anyhow::anyhow!("semaphore closed")),
            };
            (idx, result)
        });
    }

    let mut slots: Vec<Option<anyhow::Result<Pack>>> = paths.iter().map(|_| None).collect();
    while let Some((idx, result)) = futures.next().await {
        match &result {
            Ok(pack) => progress.on_fetch_complete(&paths[idx], pack),
            Err(e) => {
                tracing::error!(path = %paths[idx], "pack fetch failed: {e:#}");
                progress.on_fetch_error(&paths[idx], &format!("{e:#}"));
            }
        }
        slots[idx] = Some(result);
    }

    paths
        .iter()
        .cloned()
        .zip(slots)
        .map(|(path, slot)| {
            let result = slot.unwrap_or_else(|| Err(anyhow::anyhow!("fetch did not complete")));
            (path, result)
        })
        .collect()
}

/// Per-path outcome of a multi-pack import.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub path: String,
    pub status: ImportStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ImportStatus {
    Imported {
        id: String,
        name: String,
        outcome: ImportOutcome,
    },
    Failed {
        error: String,
        /// Retrying later cannot help.
        permanent: bool,
    },
}

impl ImportReport {
    pub fn is_success(&self) -> bool {
        matches!(self.status, ImportStatus::Imported { .. })
    }
}

/// Insert fetched packs into the custom set in request order.
pub fn apply_imports(
    workspace: &mut Workspace,
    fetched: Vec<(String, anyhow::Result<Pack>)>,
    on_conflict: OnConflict,
) -> Vec<ImportReport> {
    let reports: Vec<ImportReport> = fetched
        .into_iter()
        .map(|(path, result)| {
            let status = match result {
                Ok(pack) => {
                    let (id, name) = (pack.id.clone(), pack.name.clone());
                    let outcome = workspace.import_pack(pack, on_conflict);
                    ImportStatus::Imported {
                        id,
                        name,
                        outcome,
                    }
                }
                Err(e) => ImportStatus::Failed {
                    permanent: FetchError::is_permanent_error(&e),
                    error: format!("{e:#}"),
                },
            };
            ImportReport { path, status }
        })
        .collect();

    let ok = reports.iter().filter(|r| r.is_success()).count();
    tracing::info!(imported = ok, failed = reports.len() - ok, "remote import finished");
    reports
}

/// Fetch one document and write it, pretty-printed, into `dir`.
///
/// The file takes the last segment of `path` as its name. The document is
/// saved as-is, without pack validation.
pub async fn download(
    source: &dyn PackSource,
    path: &str,
    dir: &Path,
    options: &FetchOptions,
) -> anyhow::Result<PathBuf> {
    let name = file_name(path);
    anyhow::ensure!(!name.is_empty(), "catalog path has no file name: {path}");

    let doc = with_retry(options, path, || source.fetch(path)).await?;
    let content = serde_json::to_string_pretty(&doc)?;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;
    let target = dir.join(name);
    std::fs::write(&target, content)
        .with_context(|| format!("failed to write {}", target.display()))?;
    tracing::info!(path, file = %target.display(), "downloaded pack document");
    Ok(target)
}
