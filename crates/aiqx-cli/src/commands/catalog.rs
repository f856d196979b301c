//! The `aiqx catalog` commands.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;
use comfy_table::{Cell, Table};

use aiqx_catalog::cache::{list_cached, ListingCache};
use aiqx_catalog::import::{apply_imports, download, fetch_packs, FetchOptions, ImportProgress};
use aiqx_catalog::{GitHubSource, ImportStatus};
use aiqx_core::pack::Pack;
use aiqx_core::workspace::OnConflict;

use crate::app::{App, Options};
use crate::output::print_json;

#[derive(Subcommand)]
pub enum CatalogCommand {
    /// List the packs available remotely
    List {
        /// Ignore the cached listing
        #[arg(long)]
        refresh: bool,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Fetch packs and add them to the custom set
    Import {
        /// Catalog paths, as shown by `catalog list`
        #[arg(required = true)]
        paths: Vec<String>,

        /// Replace packs whose id is already taken
        #[arg(long)]
        replace: bool,
    },

    /// Save a pack document to disk without importing it
    Download {
        /// Catalog path
        path: String,

        /// Target directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

/// Console progress reporter.
struct ConsoleReporter;

impl ImportProgress for ConsoleReporter {
    fn on_fetch_start(&self, path: &str) {
        eprintln!("  Fetching: {path}");
    }

    fn on_fetch_complete(&self, path: &str, pack: &Pack) {
        eprintln!("  Done: {path} ({} v{})", pack.id, pack.version);
    }

    fn on_fetch_error(&self, path: &str, error: &str) {
        eprintln!("  ERROR: {path}: {error}");
    }
}

pub async fn execute(opts: &Options, cmd: CatalogCommand) -> Result<()> {
    let mut app = App::open(opts)?;
    let catalog = app.config.catalog.clone();
    let source = GitHubSource::new(&catalog)?;
    let options = FetchOptions::from(&catalog);

    match cmd {
        CatalogCommand::List { refresh, format } => {
            let ttl = Duration::from_secs(catalog.cache_ttl_secs);
            let cache = ListingCache::new(&app.store, ttl);
            let listing = list_cached(&source, &cache, Utc::now(), refresh).await?;

            if format == "json" {
                return print_json(&listing.entries);
            }
            let mut table = Table::new();
            table.set_header(vec!["Pack", "Path", "Community", "Size"]);
            for entry in &listing.entries {
                let size = entry
                    .size
                    .map(|s| format!("{:.1} KB", s as f64 / 1024.0))
                    .unwrap_or_default();
                table.add_row(vec![
                    Cell::new(entry.display_name()),
                    Cell::new(&entry.path),
                    Cell::new(if entry.community { "yes" } else { "" }),
                    Cell::new(size),
                ]);
            }
            println!("{table}");
            let age = if listing.from_cache { "cached" } else { "fetched" };
            println!(
                "{} pack(s), {age} {}",
                listing.entries.len(),
                listing.fetched_at.format("%Y-%m-%d %H:%M UTC")
            );
        }
        CatalogCommand::Import { paths, replace } => {
            let on_conflict = if replace {
                OnConflict::Replace
            } else {
                OnConflict::Keep
            };
            let fetched = fetch_packs(&source, &paths, &options, &ConsoleReporter).await;
            let reports = apply_imports(&mut app.workspace, fetched, on_conflict);
            app.save()?;

            let mut failed = 0usize;
            for report in &reports {
                match &report.status {
                    ImportStatus::Imported { id, name, outcome } => {
                        println!("{}: {name} ({id}) {outcome}", report.path);
                    }
                    ImportStatus::Failed { error, permanent } => {
                        failed += 1;
                        let hint = if *permanent { "" } else { " (try again later)" };
                        println!("{}: failed: {error}{hint}", report.path);
                    }
                }
            }
            anyhow::ensure!(failed == 0, "{failed} of {} pack(s) failed to import", reports.len());
        }
        CatalogCommand::Download { path, dir } => {
            let target = download(&source, &path, &dir, &options).await?;
            println!("Saved {}", target.display());
        }
    }
    Ok(())
}
