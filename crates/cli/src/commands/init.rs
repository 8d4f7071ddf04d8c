//! `agrishield init`: first-time setup.

use agrishield_config::AppConfig;

pub async fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("AgriShield setup");
    println!("================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    }

    if config_path.exists() && !force {
        println!("  Config file already exists: {}", config_path.display());
        println!("  Re-run with --force to overwrite it.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("  Wrote default config: {}\n", config_path.display());

    let config = AppConfig::load_from(&config_path)?;
    if config.has_api_key() {
        println!("  API key found. Run `agrishield chat` to start.\n");
    } else {
        println!("  Next steps:");
        println!("   1. Set GEMINI_API_KEY (or add api_key to {})", config_path.display());
        println!("   2. Run: agrishield chat");
        println!("   3. Or serve the HTTP API: agrishield serve\n");
    }

    Ok(())
}
