//! Table and markdown rendering shared by the view commands.

use comfy_table::{Cell, Table};

use aiqx_core::compare::ScoreMatrix;
use aiqx_core::pack::Pack;
use aiqx_core::scoring::ScoreBand;
use aiqx_core::statistics::{domain_of, ScoreMap};
use aiqx_core::Workspace;

/// Render `matrix` with `key_header` over the row labels.
pub fn matrix_table<C>(
    matrix: &ScoreMatrix<C>,
    key_header: &str,
    column_label: impl Fn(&C) -> String,
    row_label: impl Fn(&str) -> String,
) -> Table {
    let mut table = Table::new();
    let mut header = vec![key_header.to_string()];
    header.extend(matrix.columns.iter().map(&column_label));
    table.set_header(header);

    for row in &matrix.rows {
        let mut cells = vec![Cell::new(row_label(row.key.as_str()))];
        cells.extend(row.cells.iter().map(Cell::new));
        table.add_row(cells);
    }
    table
}

pub fn matrix_markdown<C>(
    matrix: &ScoreMatrix<C>,
    key_header: &str,
    column_label: impl Fn(&C) -> String,
    row_label: impl Fn(&str) -> String,
) -> String {
    let mut header = vec![key_header.to_string()];
    header.extend(matrix.columns.iter().map(&column_label));

    let mut md = format!("| {} |\n", header.join(" | "));
    md.push_str(&format!("|{}\n", "---|".repeat(header.len())));
    for row in &matrix.rows {
        let cells: Vec<String> = row.cells.iter().map(u32::to_string).collect();
        md.push_str(&format!("| {} | {} |\n", row_label(row.key.as_str()), cells.join(" | ")));
    }
    md
}

/// One row per score key, with the domain's display name and band.
pub fn scores_table(workspace: &Workspace, scores: &ScoreMap, pack: Option<&Pack>) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Question", "Domain", "Score"]);
    for (key, score) in scores.iter() {
        table.add_row(vec![
            Cell::new(key),
            Cell::new(workspace.display_name(domain_of(key), pack)),
            Cell::new(score_cell(*score)),
        ]);
    }
    table
}

pub fn score_cell(score: u32) -> String {
    format!("{score} ({})", ScoreBand::of(score))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
