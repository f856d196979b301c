//! The `aiqx pack` commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::{Cell, Table};

use aiqx_core::pack::load_pack;
use aiqx_core::workspace::{ImportOutcome, OnConflict, PackOrigin};

use crate::app::{App, Options};

#[derive(Subcommand)]
pub enum PackCommand {
    /// List installed and custom packs
    List,

    /// Show a pack's metadata and tiers
    Show {
        /// Pack id
        id: String,
    },

    /// Import pack files into the custom set
    Import {
        /// Pack JSON files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Replace packs whose id is already taken
        #[arg(long)]
        replace: bool,
    },

    /// Write a pack to a JSON file
    Export {
        /// Pack id
        id: String,

        /// Output file (defaults to <id>-v<version>.json)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Delete a custom pack
    Delete {
        /// Pack id
        id: String,
    },

    /// Select the pack used for prompts and analysis
    Select {
        /// Pack id
        id: String,
    },
}

pub fn execute(opts: &Options, cmd: PackCommand) -> Result<()> {
    match cmd {
        PackCommand::List => list(opts),
        PackCommand::Show { id } => show(opts, &id),
        PackCommand::Import { files, replace } => import(opts, &files, replace),
        PackCommand::Export { id, output } => export(opts, &id, output),
        PackCommand::Delete { id } => delete(opts, &id),
        PackCommand::Select { id } => select(opts, &id),
    }
}

fn list(opts: &Options) -> Result<()> {
    let app = App::open(opts)?;
    let packs: Vec<_> = app.workspace.all_packs().collect();
    if packs.is_empty() {
        println!("No packs installed. Run `aiqx init` or `aiqx pack import <file>`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["", "Id", "Name", "Version", "Origin", "Tiers", "Questions"]);
    for (pack, origin) in packs {
        let selected = app.session.pack.as_deref() == Some(pack.id.as_str());
        let tiers: Vec<_> = pack.tiers.iter().map(|(name, _)| name.as_str()).collect();
        table.add_row(vec![
            Cell::new(if selected { "*" } else { "" }),
            Cell::new(&pack.id),
            Cell::new(&pack.name),
            Cell::new(&pack.version),
            Cell::new(origin_label(origin)),
            Cell::new(tiers.join(", ")),
            Cell::new(pack.total_questions()),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn origin_label(origin: PackOrigin) -> &'static str {
    match origin {
        PackOrigin::Installed => "installed",
        PackOrigin::Custom => "custom",
    }
}

fn show(opts: &Options, id: &str) -> Result<()> {
    let app = App::open(opts)?;
    let (pack, origin) = app
        .workspace
        .find_pack_with_origin(id)
        .with_context(|| format!("unknown pack: {id}"))?;

    println!("{} ({}) v{}", pack.name, pack.id, pack.version);
    println!("Origin:     {}", origin_label(origin));
    println!("Author:     {}", pack.author);
    println!("Difficulty: {}", pack.difficulty);
    if !pack.tags.is_empty() {
        println!("Tags:       {}", pack.tags.join(", "));
    }
    println!("\n{}", pack.description);

    if !pack.domains.is_empty() {
        println!("\nDomains:");
        for domain in &pack.domains {
            println!("  {:<12} {}", domain.id, domain.name);
        }
    }

    println!("\nTiers:");
    for (name, tier) in pack.tiers.iter() {
        println!(
            "  {:<9} {} question(s): {}",
            name.as_str(),
            tier.question_count,
            tier.expected_domains.join(", ")
        );
    }
    Ok(())
}

fn import(opts: &Options, files: &[PathBuf], replace: bool) -> Result<()> {
    let mut app = App::open(opts)?;
    let on_conflict = if replace {
        OnConflict::Replace
    } else {
        OnConflict::Keep
    };

    let mut failed = 0usize;
    for file in files {
        match load_pack(file) {
            Ok(pack) => {
                let (id, name) = (pack.id.clone(), pack.name.clone());
                match app.workspace.import_pack(pack, on_conflict) {
                    ImportOutcome::Skipped => {
                        println!("Skipped {id}: already exists (use --replace)")
                    }
                    outcome => println!("Imported {name} ({id}): {outcome}"),
                }
            }
            Err(e) => {
                eprintln!("  ERROR: {e:#}");
                failed += 1;
            }
        }
    }
    app.save()?;

    anyhow::ensure!(failed == 0, "{failed} of {} pack file(s) failed to import", files.len());
    Ok(())
}

fn export(opts: &Options, id: &str, output: Option<PathBuf>) -> Result<()> {
    let app = App::open(opts)?;
    let pack = app
        .workspace
        .find_pack(id)
        .with_context(|| format!("unknown pack: {id}"))?;

    let path = output.unwrap_or_else(|| PathBuf::from(pack.export_file_name()));
    let content = serde_json::to_string_pretty(pack)?;
    std::fs::write(&path, content)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Exported {} to {}", pack.id, path.display());
    Ok(())
}

fn delete(opts: &Options, id: &str) -> Result<()> {
    let mut app = App::open(opts)?;
    let pack = app.workspace.delete_custom_pack(id)?;
    app.session.pack_deleted(id, &app.workspace);
    app.save()?;
    println!("Deleted pack {} ({})", pack.name, pack.id);
    Ok(())
}

fn select(opts: &Options, id: &str) -> Result<()> {
    let mut app = App::open(opts)?;
    let pack = app
        .workspace
        .find_pack(id)
        .with_context(|| format!("unknown pack: {id}"))?;
    println!("Selected pack {} ({})", pack.name, pack.id);
    if pack.tier(app.session.tier).is_none() {
        println!("Note: this pack has no {} tier", app.session.tier);
    }
    app.session.pack = Some(pack.id.clone());
    app.save()?;
    Ok(())
}
