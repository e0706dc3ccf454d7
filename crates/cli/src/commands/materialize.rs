//! `reprompt materialize`: assemble one document.

use reprompt_config::AppConfig;
use reprompt_datasets::DatasetKind;

use super::open_adapter;
use crate::ExampleArgs;

pub async fn run(args: ExampleArgs, show_document: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let kind: DatasetKind = args.dataset.parse()?;
    let adapter = open_adapter(&config, kind)?;

    let example = adapter.get(args.question, args.position, args.context)?;

    println!("📄 {kind} q{} a{} c{}", args.question, args.position, args.context);
    println!("─────────────────────────────────────");
    println!("  Question:   {}", example.question);
    println!("  Answer:     {}", example.answer);
    println!("  Gold page:  {}", example.gold_page_number);
    println!("  Gold in doc: {}", example.gold_inserted);
    println!("  Pages:      {}", example.page_count);
    println!("  Tokens:     {} ({})", example.emitted_tokens, adapter.tokenizer_model());

    if show_document {
        println!("\n{}", example.document);
    }

    Ok(())
}
