//! `jobsuite onboard`: First-time setup.

use jobsuite_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("jobsuite: First-Time Setup");
    println!("===========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n  Config already exists at: {}", config_path.display());
        println!("  Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("  Created config.toml at: {}", config_path.display());
    println!("\n  Next steps:");
    println!("   1. Set DATABASE_URL (or [database] url) to your job placement database");
    println!("   2. Set OPENAI_API_KEY, or GOOGLE_API_KEY with provider = \"gemini\"");
    println!("   3. Run: jobsuite sync");
    println!("   4. Run: jobsuite chat\n");

    Ok(())
}
