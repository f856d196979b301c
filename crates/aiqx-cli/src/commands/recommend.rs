//! The `aiqx recommend` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use aiqx_core::recommend::{recommend, Recommendation};
use aiqx_core::Workspace;

use crate::app::{App, Options};
use crate::output::print_json;

pub fn execute(opts: &Options, format: String) -> Result<()> {
    let app = App::open(opts)?;
    let ranking = recommend(&app.workspace);

    match format.as_str() {
        "json" => print_json(&ranking)?,
        "markdown" | "md" => println!("{}", to_markdown(&ranking, &app.workspace)),
        _ => {
            if ranking.is_empty() {
                println!("No tested models yet. Run `aiqx analyze` first.");
                return Ok(());
            }
            print_text(&ranking, &app.workspace);
        }
    }
    Ok(())
}

fn strengths_line(rec: &Recommendation, workspace: &Workspace) -> String {
    rec.strengths
        .iter()
        .map(|s| format!("{} {}", workspace.display_name(&s.domain, None), s.score))
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_text(ranking: &[Recommendation], workspace: &Workspace) {
    let mut table = Table::new();
    table.set_header(vec!["Rank", "Model", "Avg", "Tests", "Strengths"]);
    for (rank, rec) in ranking.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&rec.model),
            Cell::new(format!("{:.1}", rec.avg_score)),
            Cell::new(rec.test_count),
            Cell::new(strengths_line(rec, workspace)),
        ]);
    }
    println!("{table}");

    for rec in ranking {
        println!("\n{}", rec.model);
        println!("  Best for:");
        for use_case in &rec.use_cases {
            println!("    - {use_case}");
        }
        println!("  Try next:");
        for pack in &rec.recommended_packs {
            println!("    - {pack}");
        }
    }
}

fn to_markdown(ranking: &[Recommendation], workspace: &Workspace) -> String {
    let mut md = String::from("# Model Recommendations\n\n");
    if ranking.is_empty() {
        md.push_str("No tested models yet.\n");
        return md;
    }

    md.push_str("| Rank | Model | Avg | Tests | Strengths |\n|---|---|---|---|---|\n");
    for (rank, rec) in ranking.iter().enumerate() {
        md.push_str(&format!(
            "| {} | {} | {:.1} | {} | {} |\n",
            rank + 1,
            rec.model,
            rec.avg_score,
            rec.test_count,
            strengths_line(rec, workspace)
        ));
    }

    for rec in ranking {
        md.push_str(&format!("\n## {}\n\n**Best for:**\n", rec.model));
        for use_case in &rec.use_cases {
            md.push_str(&format!("- {use_case}\n"));
        }
        md.push_str("\n**Recommended packs:**\n");
        for pack in &rec.recommended_packs {
            md.push_str(&format!("- {pack}\n"));
        }
    }
    md
}
