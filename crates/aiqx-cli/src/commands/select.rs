//! Current selection: `status`, `tier` and `prompt`.

use anyhow::Result;

use aiqx_core::TierName;

use crate::app::{App, Options};

pub fn status(opts: &Options) -> Result<()> {
    let app = App::open(opts)?;
    let session = &app.session;

    let pack = match session.pack.as_deref() {
        Some(id) => match app.workspace.find_pack(id) {
            Some(pack) => format!("{} ({})", pack.name, pack.id),
            None => format!("{id} (not installed)"),
        },
        None => "(none)".to_string(),
    };
    println!("Model: {}", session.model.as_deref().unwrap_or("(none)"));
    println!("Pack:  {pack}");
    println!("Tier:  {}", session.tier);
    println!(
        "{} model(s), {} installed pack(s), {} custom pack(s)",
        app.workspace.models.len(),
        app.workspace.installed_packs.len(),
        app.workspace.custom_packs.len()
    );
    Ok(())
}

pub fn tier(opts: &Options, tier: TierName) -> Result<()> {
    let mut app = App::open(opts)?;
    app.session.tier = tier;
    app.save()?;
    println!("Selected tier {tier}");

    if let Err(e) = app.session.resolve(&app.workspace) {
        println!("Note: {e}");
    }
    Ok(())
}

pub fn prompt(opts: &Options) -> Result<()> {
    let app = App::open(opts)?;
    println!("{}", app.session.prompt(&app.workspace)?);
    Ok(())
}
