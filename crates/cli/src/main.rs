//! Reprompt CLI: the main entry point.
//!
//! Commands:
//! - `init`: write a default config file
//! - `doctor`: check config, credentials and dataset files
//! - `materialize`: assemble one document and show its bookkeeping
//! - `run`: execute a single evaluation run
//! - `sweep`: execute a full parameter sweep
//! - `tables`: score results and write the report tables
//! - `build-pubmed`: build the PubMed corpus
//! - `usage`: show accumulated token usage and cost

use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "reprompt",
    about = "Reprompt: long-context retrieval evaluation harness",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Selects one document.
#[derive(Args, Debug, Clone)]
pub struct ExampleArgs {
    /// Dataset name (nq, squad, hotpotqa, pubmed)
    #[arg(short, long)]
    dataset: String,

    /// Question id within the dataset
    #[arg(short, long, default_value_t = 0)]
    question: usize,

    /// Token offset of the gold passage; negative omits it
    #[arg(short = 'p', long, default_value_t = 0, allow_negative_numbers = true)]
    position: i64,

    /// Token budget of the document
    #[arg(short, long, default_value_t = 40_000)]
    context: usize,
}

/// Prompting strategy knobs.
#[derive(Args, Debug, Clone, Default)]
pub struct StrategyArgs {
    /// Insert a reminder every N tokens of document
    #[arg(long)]
    repeat_interval: Option<usize>,

    /// Restate the question right before the answer
    #[arg(long)]
    repeat_before_answer: bool,

    /// Also ask the question before the document
    #[arg(long)]
    repeat_at_beginning: bool,

    /// Reminders are a bare tag instead of the question
    #[arg(long)]
    repeat_tag_only: bool,

    /// Ask for the page number only
    #[arg(long)]
    page_only: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Write ./reprompt.toml instead of ~/.reprompt/config.toml
        #[arg(long)]
        local: bool,
    },

    /// Check config, credentials and dataset files
    Doctor,

    /// Assemble one document and print it with its bookkeeping
    Materialize {
        #[command(flatten)]
        example: ExampleArgs,

        /// Print the assembled document as well
        #[arg(long)]
        show_document: bool,
    },

    /// Execute a single evaluation run
    Run {
        #[command(flatten)]
        example: ExampleArgs,

        #[command(flatten)]
        strategy: StrategyArgs,

        /// Results folder below the results directory
        #[arg(long, default_value = "default")]
        mode: String,

        /// Strategy folder below the context length
        #[arg(long, default_value = "")]
        subfolder: String,

        /// Replace an existing artifact
        #[arg(long)]
        overwrite: bool,
    },

    /// Execute a parameter sweep
    Sweep {
        /// Sweep family: comparison or analysis
        #[arg(short, long, default_value = "analysis")]
        kind: String,

        /// Restrict to these datasets (repeatable)
        #[arg(short, long)]
        dataset: Vec<String>,

        /// Override the context lengths (repeatable)
        #[arg(short, long)]
        context: Vec<usize>,

        /// Override the number of questions per dataset
        #[arg(long)]
        questions: Option<usize>,

        /// Re-run specs whose artifact already exists
        #[arg(long)]
        overwrite: bool,
    },

    /// Score results and write the report tables
    Tables {
        /// Results directory (defaults to the configured one)
        #[arg(long)]
        results: Option<std::path::PathBuf>,

        /// Directory the tables are written to
        #[arg(short, long, default_value = "tables")]
        output: std::path::PathBuf,
    },

    /// Build the PubMed corpus from a source abstract dump
    BuildPubmed {
        /// Number of questions to generate
        #[arg(short = 'n', long, default_value_t = 250)]
        questions: usize,

        /// Only normalize abstracts; do not call the model
        #[arg(long)]
        skip_questions: bool,
    },

    /// Show accumulated token usage and estimated cost
    Usage {
        /// Forget the recorded usage
        #[arg(long)]
        reset: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init { local } => commands::init::run(local).await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Materialize {
            example,
            show_document,
        } => commands::materialize::run(example, show_document).await?,
        Commands::Run {
            example,
            strategy,
            mode,
            subfolder,
            overwrite,
        } => commands::run::run(example, strategy, mode, subfolder, overwrite).await?,
        Commands::Sweep {
            kind,
            dataset,
            context,
            questions,
            overwrite,
        } => commands::sweep::run(&kind, dataset, context, questions, overwrite).await?,
        Commands::Tables { results, output } => commands::tables::run(results, output).await?,
        Commands::BuildPubmed {
            questions,
            skip_questions,
        } => commands::pubmed::run(questions, skip_questions).await?,
        Commands::Usage { reset } => commands::usage::run(reset).await?,
    }

    Ok(())
}
