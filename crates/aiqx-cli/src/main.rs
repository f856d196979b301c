//! aiqx CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use aiqx_core::TierName;

mod app;
mod commands;
mod output;

#[derive(Parser)]
#[command(name = "aiqx", version, about = "Score LLM answers to assessment packs")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the workspace (overrides the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and install the built-in packs
    Init,

    /// Show the current model, pack and tier
    Status,

    /// Manage the pack library
    #[command(subcommand)]
    Pack(commands::pack::PackCommand),

    /// Manage models
    #[command(subcommand)]
    Model(commands::model::ModelCommand),

    /// Select the tier used for prompts and analysis
    Tier {
        /// basic, advanced or expert
        tier: TierName,
    },

    /// Print the prompt for the current selection
    Prompt,

    /// Score a model response and record it
    Analyze {
        /// File holding the response (reads stdin when omitted)
        file: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show a model's latest result
    Results {
        /// Model name (defaults to the current model)
        #[arg(long)]
        model: Option<String>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show every recorded test of a model
    History {
        /// Model name (defaults to the current model)
        #[arg(long)]
        model: Option<String>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Delete one recorded test
    DeleteTest {
        /// Position in the model's history, as shown by `history`
        index: usize,

        /// Model name (defaults to the current model)
        #[arg(long)]
        model: Option<String>,
    },

    /// Compare the latest results of every tested model
    Compare {
        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Rank tested models and suggest use cases
    Recommend {
        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Export models and packs to a JSON bundle
    Export {
        /// Output file (defaults to aiqx-export-<date>.json)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Merge a previously exported bundle
    Import {
        /// Bundle file
        file: PathBuf,
    },

    /// Browse and import packs from the remote catalog
    #[command(subcommand)]
    Catalog(commands::catalog::CatalogCommand),

    /// Erase all saved models, results, packs and cached listings
    Reset {
        /// Confirm the erase
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aiqx=info".parse().expect("static directive")),
        )
        .init();

    let cli = Cli::parse();
    let opts = app::Options {
        config: cli.config,
        data_dir: cli.data_dir,
    };

    let result = match cli.command {
        Commands::Init => commands::init::execute(&opts),
        Commands::Status => commands::select::status(&opts),
        Commands::Pack(cmd) => commands::pack::execute(&opts, cmd),
        Commands::Model(cmd) => commands::model::execute(&opts, cmd),
        Commands::Tier { tier } => commands::select::tier(&opts, tier),
        Commands::Prompt => commands::select::prompt(&opts),
        Commands::Analyze { file, format } => commands::analyze::execute(&opts, file, format),
        Commands::Results { model, format } => commands::results::latest(&opts, model, format),
        Commands::History { model, format } => commands::results::history(&opts, model, format),
        Commands::DeleteTest { index, model } => {
            commands::results::delete_test(&opts, model, index)
        }
        Commands::Compare { format } => commands::compare::execute(&opts, format),
        Commands::Recommend { format } => commands::recommend::execute(&opts, format),
        Commands::Export { output } => commands::bundle::export(&opts, output),
        Commands::Import { file } => commands::bundle::import(&opts, file),
        Commands::Catalog(cmd) => commands::catalog::execute(&opts, cmd).await,
        Commands::Reset { yes } => commands::reset::execute(&opts, yes),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
