//! The `aiqx model` commands.

use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::{Cell, Table};

use aiqx_core::history::LatestSummary;

use crate::app::{App, Options};

#[derive(Subcommand)]
pub enum ModelCommand {
    /// List models with their latest overall score
    List,

    /// Register a model and select it
    New {
        /// Display name, e.g. "GPT-4o"
        name: String,
    },

    /// Rename a model, keeping its history
    Rename { old: String, new: String },

    /// Delete a model and its whole history
    Delete { name: String },

    /// Select the model that analyses are recorded for
    Select { name: String },
}

pub fn execute(opts: &Options, cmd: ModelCommand) -> Result<()> {
    let mut app = App::open(opts)?;

    match cmd {
        ModelCommand::List => {
            if app.workspace.models.is_empty() {
                println!("No models yet. Run `aiqx model new <name>`.");
                return Ok(());
            }
            let mut table = Table::new();
            table.set_header(vec!["", "Model", "Tests", "Latest", "Overall"]);
            for model in &app.workspace.models {
                let selected = app.session.model.as_deref() == Some(model.name.as_str());
                let (latest, overall) = match LatestSummary::of(model) {
                    Some(s) => (
                        format!(
                            "{} {} ({})",
                            app.workspace.pack_label(&s.pack_id),
                            s.tier,
                            s.time.format("%Y-%m-%d")
                        ),
                        format!("{} ({})", s.overall, s.band),
                    ),
                    None => ("-".to_string(), "-".to_string()),
                };
                table.add_row(vec![
                    Cell::new(if selected { "*" } else { "" }),
                    Cell::new(&model.name),
                    Cell::new(model.history.len()),
                    Cell::new(latest),
                    Cell::new(overall),
                ]);
            }
            println!("{table}");
            return Ok(());
        }
        ModelCommand::New { name } => {
            let name = app.workspace.add_model(&name)?;
            println!("Added model {name}");
            app.session.model = Some(name);
        }
        ModelCommand::Rename { old, new } => {
            let new = new.trim().to_string();
            if app.workspace.rename_model(&old, &new)? {
                app.session.model_renamed(&old, &new);
                println!("Renamed {old} to {new}");
            } else {
                println!("Name unchanged");
            }
        }
        ModelCommand::Delete { name } => {
            let model = app.workspace.delete_model(&name)?;
            app.session.model_deleted(&name, &app.workspace);
            println!(
                "Deleted model {} and {} recorded test(s)",
                model.name,
                model.history.len()
            );
        }
        ModelCommand::Select { name } => {
            let model = app
                .workspace
                .model(&name)
                .with_context(|| format!("unknown model: {name}"))?;
            println!("Selected model {}", model.name);
            app.session.model = Some(model.name.clone());
        }
    }

    app.save()
}
