//! Per-model views: `results`, `history` and `delete-test`.

use anyhow::{Context, Result};

use aiqx_core::compare::history_matrix;
use aiqx_core::history::LatestSummary;

use crate::app::{App, Options};
use crate::output::{matrix_table, print_json, score_cell, scores_table};

pub fn latest(opts: &Options, model: Option<String>, format: String) -> Result<()> {
    let app = App::open(opts)?;
    let name = app.model_or_current(model)?;
    let model = app
        .workspace
        .model(&name)
        .with_context(|| format!("unknown model: {name}"))?;

    let Some(summary) = LatestSummary::of(model) else {
        println!("{name} has not been tested yet.");
        return Ok(());
    };
    if format == "json" {
        return print_json(&summary);
    }

    let pack = app.workspace.find_pack(&summary.pack_id);
    println!(
        "{} on {} / {} ({})",
        summary.model,
        app.workspace.pack_label(&summary.pack_id),
        summary.tier,
        summary.time.format("%Y-%m-%d %H:%M")
    );
    println!("Overall: {}\n", score_cell(summary.overall));

    println!("{}", scores_table(&app.workspace, &summary.scores, pack));
    Ok(())
}

pub fn history(opts: &Options, model: Option<String>, format: String) -> Result<()> {
    let app = App::open(opts)?;
    let name = app.model_or_current(model)?;
    let matrix = history_matrix(&app.workspace, &name)
        .with_context(|| format!("unknown model: {name}"))?;

    if format == "json" {
        return print_json(&matrix);
    }
    if matrix.columns.is_empty() {
        println!("{name} has not been tested yet.");
        return Ok(());
    }

    let table = matrix_table(
        &matrix,
        "Domain",
        |c| {
            format!(
                "#{} {}\n{} {}",
                c.index,
                c.pack_label,
                c.time.format("%Y-%m-%d"),
                c.tier
            )
        },
        |key| app.workspace.display_name(key, None),
    );
    println!("{name}: {} test(s)\n{table}", matrix.columns.len());
    Ok(())
}

pub fn delete_test(opts: &Options, model: Option<String>, index: usize) -> Result<()> {
    let mut app = App::open(opts)?;
    let name = app.model_or_current(model)?;
    let record = app.workspace.delete_test(&name, index)?;
    app.save()?;
    println!(
        "Deleted test #{index} of {name} ({} / {}, {})",
        app.workspace.pack_label(&record.pack_id),
        record.tier,
        record.time.format("%Y-%m-%d %H:%M")
    );
    Ok(())
}
