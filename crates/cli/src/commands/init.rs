//! `reprompt init`: write a default config file.

use reprompt_config::{AppConfig, LOCAL_CONFIG_FILE};

pub async fn run(local: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = if local {
        std::path::PathBuf::from(LOCAL_CONFIG_FILE)
    } else {
        AppConfig::config_dir().join("config.toml")
    };

    println!("Reprompt: Setup");
    println!("================\n");

    if let Some(dir) = config_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            println!("✅ Created config directory: {}", dir.display());
        }
    }

    if config_path.exists() {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete it and re-run init.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Set OPENAI_API_KEY or ANTHROPIC_API_KEY (or add it under [providers])");
    println!("   2. Point [datasets] at your dataset files");
    println!("   3. Run: reprompt doctor\n");

    Ok(())
}
