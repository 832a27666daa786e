//! `jobsuite sync`: Embed job descriptions into the vector index.

use super::runtime::Runtime;
use jobsuite_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let runtime = Runtime::open(config).await?;

    println!("Syncing {} into the vector index...", runtime.config.database.listings_table);
    let report = runtime.index_sync().sync().await?;

    println!();
    println!("  Fetched:  {}", report.fetched);
    println!("  Written:  {}", report.written);
    println!("  Failed:   {}", report.failed.len());
    for (id, reason) in &report.failed {
        println!("    job_id {id}: {reason}");
    }
    println!("  Indexed:  {} documents", runtime.index.count().await?);
    println!();

    if report.is_complete() {
        println!("Index is up to date.");
    } else {
        println!("Some listings could not be indexed. Re-run `jobsuite sync` to retry them.");
    }
    Ok(())
}
