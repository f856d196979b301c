//! The `aiqx analyze` command.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use aiqx_core::history::TestRecord;
use aiqx_core::scoring::ScoreBand;
use aiqx_core::statistics::ScoreMap;
use aiqx_core::{aggregate_by_domain, analyze};

use crate::app::{App, Options};
use crate::output::{print_json, score_cell, scores_table};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisOutput<'a> {
    model: &'a str,
    record: &'a TestRecord,
    overall: u32,
    band: ScoreBand,
    domains: ScoreMap,
}

pub fn execute(opts: &Options, file: Option<PathBuf>, format: String) -> Result<()> {
    let response = match &file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read response: {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read response from stdin")?;
            buf
        }
    };

    let mut app = App::open(opts)?;
    let record = analyze(&mut app.workspace, &app.session, &response, chrono::Utc::now())?;
    app.save()?;

    let model = app.session.model.as_deref().unwrap_or_default();
    let overall = record.overall();
    let domains = aggregate_by_domain(&record.scores);

    if format == "json" {
        return print_json(&AnalysisOutput {
            model,
            record: &record,
            overall,
            band: ScoreBand::of(overall),
            domains,
        });
    }

    let pack = app.workspace.find_pack(&record.pack_id);
    println!("{}", scores_table(&app.workspace, &record.scores, pack));

    if domains.len() != record.scores.len() {
        println!("\nBy domain:");
        for (domain, score) in domains.iter() {
            println!(
                "  {:<24} {}",
                app.workspace.display_name(domain, pack),
                score_cell(*score)
            );
        }
    }

    println!(
        "\n{model}: overall {} on {} / {}",
        score_cell(overall),
        app.workspace.pack_label(&record.pack_id),
        record.tier
    );
    Ok(())
}
