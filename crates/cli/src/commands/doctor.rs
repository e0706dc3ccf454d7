//! `reprompt doctor`: check config, credentials and dataset files.

use reprompt_config::AppConfig;
use reprompt_core::TokenCounter;
use reprompt_datasets::{configured_path, DatasetKind};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Reprompt Doctor");
    println!("==================\n");

    let mut issues = 0;

    let config_path = AppConfig::resolve_path();
    if config_path.exists() {
        println!("  ✅ Config file: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file, using defaults (run `reprompt init`)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid ({} / {})", config.model_class, config.model);
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config before running anything else.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ✅ API key configured for {}", config.model_class);
    } else {
        println!(
            "  ❌ No API key for {}: set it in the environment or under [providers.{}]",
            config.model_class, config.model_class
        );
        issues += 1;
    }

    match reprompt_providers::build_counter(&config) {
        Ok(counter) => println!("  ✅ Tokenizer ready ({})", counter.model()),
        Err(e) => {
            println!("  ❌ Tokenizer unavailable: {e}");
            issues += 1;
        }
    }

    for kind in DatasetKind::ALL {
        let path = configured_path(kind, &config.datasets);
        if path.exists() {
            println!("  ✅ {kind}: {}", path.display());
        } else {
            println!("  ⚠️  {kind}: missing {}", path.display());
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
