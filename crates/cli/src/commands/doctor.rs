//! `jobsuite doctor`: Diagnose configuration, database and index.

use super::runtime::{build_embedder, open_index};
use jobsuite_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("jobsuite doctor");
    println!("===============\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  [warn] No config file, using defaults. Run `jobsuite onboard`.");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  [ok]   Config valid");
            config
        }
        Err(e) => {
            println!("  [fail] Config invalid: {e}");
            println!("\n  1 blocking issue found.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  [ok]   API key configured");
    } else {
        println!("  [warn] No API key. Set JOBSUITE_API_KEY or OPENAI_API_KEY.");
        issues += 1;
    }

    match config.database.url.as_deref() {
        None => {
            println!("  [fail] No database URL. Set DATABASE_URL.");
            issues += 1;
        }
        Some(url) => {
            match jobsuite_store::connect(
                url,
                &config.database.listings_table,
                config.database.max_connections,
            )
            .await
            {
                Ok(store) => match store.fetch_document_sources().await {
                    Ok(listings) => println!(
                        "  [ok]   Database reachable, {} listings with descriptions in {}",
                        listings.len(),
                        config.database.listings_table
                    ),
                    Err(e) => {
                        println!("  [fail] Cannot read {}: {e}", config.database.listings_table);
                        issues += 1;
                    }
                },
                Err(e) => {
                    println!("  [fail] Database unreachable: {e}");
                    issues += 1;
                }
            }
        }
    }

    match build_embedder(&config) {
        Ok(embedder) => match open_index(&config, embedder.as_ref()).await {
            Ok(index) => {
                let count = index.count().await.unwrap_or(0);
                println!(
                    "  [ok]   Index open ({} model {}, {count} documents)",
                    config.index.collection,
                    embedder.model_id()
                );
                if count == 0 {
                    println!("  [warn] Index is empty. Run `jobsuite sync`.");
                    issues += 1;
                }
            }
            Err(e) => {
                println!("  [fail] Index unusable: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  [fail] Embedder unavailable: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
