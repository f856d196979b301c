//! Bulk `export` and `import` of the whole workspace.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;

use aiqx_core::bundle::{export_bundle, merge_import, parse_bundle};

use crate::app::{App, Options};

pub fn export(opts: &Options, output: Option<PathBuf>) -> Result<()> {
    let app = App::open(opts)?;
    let now = Utc::now();
    let bundle = export_bundle(&app.workspace, now);

    let path = output.unwrap_or_else(|| {
        PathBuf::from(format!("aiqx-export-{}.json", now.format("%Y-%m-%d")))
    });
    let content = serde_json::to_string_pretty(&bundle)?;
    std::fs::write(&path, content)
        .with_context(|| format!("failed to write {}", path.display()))?;

    let records: usize = app.workspace.models.iter().map(|m| m.history.len()).sum();
    println!(
        "Exported {} model(s), {} test(s), {} pack(s) to {}",
        app.workspace.models.len(),
        records,
        app.workspace.installed_packs.len() + app.workspace.custom_packs.len(),
        path.display()
    );
    Ok(())
}

pub fn import(opts: &Options, file: PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(&file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let bundle =
        parse_bundle(&content).with_context(|| format!("failed to import {}", file.display()))?;

    let mut app = App::open(opts)?;
    let (merged, stats) = merge_import(&app.workspace, bundle);
    app.workspace = merged;
    if app.session.model.is_none() {
        app.session.model = app.workspace.models.first().map(|m| m.name.clone());
    }
    app.save()?;

    println!(
        "Imported {} new model(s), extended {}, {} test(s), {} new pack(s)",
        stats.models_added, stats.models_extended, stats.records_added, stats.packs_added
    );
    Ok(())
}
