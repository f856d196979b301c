//! The `aiqx compare` command.

use anyhow::Result;

use aiqx_core::compare::cross_model_matrix;

use crate::app::{App, Options};
use crate::output::{matrix_markdown, matrix_table, print_json};

pub fn execute(opts: &Options, format: String) -> Result<()> {
    let app = App::open(opts)?;
    let matrix = cross_model_matrix(&app.workspace);
    let row_label = |key: &str| app.workspace.display_name(key, None);

    match format.as_str() {
        "json" => print_json(&matrix)?,
        "markdown" | "md" => {
            println!("{}", matrix_markdown(&matrix, "Domain", String::clone, row_label));
        }
        _ => {
            if matrix.columns.is_empty() {
                println!("No tested models to compare.");
                return Ok(());
            }
            println!("{}", matrix_table(&matrix, "Domain", String::clone, row_label));
        }
    }
    Ok(())
}
