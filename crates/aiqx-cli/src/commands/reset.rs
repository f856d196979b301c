//! The `aiqx reset` command.

use anyhow::Result;

use aiqx_catalog::config::load_config_from;
use aiqx_core::store::{FileStore, KvStore};

use crate::app::Options;

/// Erase every stored model, pack, selection and cached listing.
///
/// The workspace is not loaded first, so a corrupt data directory can still
/// be reset.
pub fn execute(opts: &Options, yes: bool) -> Result<()> {
    let mut config = load_config_from(opts.config.as_deref())?;
    if let Some(dir) = &opts.data_dir {
        config.data_dir = dir.clone();
    }
    let store = FileStore::new(config.data_dir);

    anyhow::ensure!(
        yes,
        "this erases all models, test history and packs in {}; re-run with --yes to confirm",
        store.dir().display()
    );

    let removed = store.clear()?;
    tracing::info!(dir = %store.dir().display(), removed, "workspace reset");
    println!("Removed {removed} stored item(s) from {}", store.dir().display());
    println!("Run `aiqx init` to reinstall the built-in packs.");
    Ok(())
}
