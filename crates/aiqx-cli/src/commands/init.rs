//! The `aiqx init` command.

use std::path::Path;

use anyhow::Result;

use aiqx_core::builtin::builtin_packs;

use crate::app::{App, Options};

pub fn execute(opts: &Options) -> Result<()> {
    // Create aiqx.toml
    if opts.config.is_some() || Path::new("aiqx.toml").exists() {
        println!("aiqx.toml already exists, skipping.");
    } else {
        std::fs::write("aiqx.toml", SAMPLE_CONFIG)?;
        println!("Created aiqx.toml");
    }

    let mut app = App::open(opts)?;
    if app.workspace.installed_packs.is_empty() {
        for pack in builtin_packs()? {
            println!("Installed pack {} ({})", pack.id, pack.name);
            app.workspace.install_pack(pack);
        }
        if app.session.pack.is_none() {
            app.session.pack = app.workspace.installed_packs.first().map(|p| p.id.clone());
        }
    } else {
        println!(
            "{} pack(s) already installed, skipping.",
            app.workspace.installed_packs.len()
        );
    }
    app.save()?;
    println!("Workspace ready in {}", app.store.dir().display());

    println!("\nNext steps:");
    println!("  1. Run: aiqx model new \"<model name>\"");
    println!("  2. Run: aiqx prompt, and paste it into the model");
    println!("  3. Run: aiqx analyze response.txt");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# aiqx configuration

data_dir = "./aiqx-data"
default_tier = "basic"

[catalog]
owner = "BLGardner"
repo = "aiq-x"
branch = "main"
pack_prefix = "Test-Packs/"
cache_ttl_secs = 600
parallelism = 4
# token = "${AIQX_GITHUB_TOKEN}"
"#;
