//! `reprompt build-pubmed`: build the PubMed corpus directory.

use reprompt_config::AppConfig;
use reprompt_datasets::{collect_abstracts, generate_questions};

pub async fn run(questions: usize, skip_questions: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let source = &config.datasets.pubmed_source;
    let out_dir = &config.datasets.pubmed_dir;

    println!("Collecting abstracts from {}...", source.display());
    let abstracts = collect_abstracts(source, out_dir)?;
    println!("  ✅ {abstracts} abstracts written to {}", out_dir.display());

    if skip_questions {
        return Ok(());
    }

    println!("Generating questions...");
    let provider = reprompt_providers::build_provider(&config)?;
    let written = generate_questions(provider.as_ref(), out_dir, questions).await?;
    println!("  ✅ {written} questions written");

    println!("Done!");
    Ok(())
}
