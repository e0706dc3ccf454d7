//! `reprompt tables`: score results and write the report tables.

use std::path::PathBuf;

use reprompt_config::AppConfig;
use reprompt_scoring::{generate_analysis_tables, MainTable};

pub async fn run(
    results: Option<PathBuf>,
    output: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let results_dir = match results {
        Some(dir) => dir,
        None => AppConfig::load()?.results_dir,
    };

    println!("Generating main table...");
    let main_path = output.join("scores").join("baseline_vs_reprompt.tex");
    MainTable::default().write(&results_dir.join("baseline_vs_reprompt"), &main_path)?;
    println!("  ✅ {}", main_path.display());

    println!("Generating analysis tables...");
    for path in generate_analysis_tables(&results_dir.join("analysis"), &output.join("analysis"))? {
        println!("  ✅ {}", path.display());
    }

    println!("Done!");
    Ok(())
}
