//! `jobsuite listing`: Show one job listing from the database.

use jobsuite_config::AppConfig;
use jobsuite_core::listing::JobListing;

pub async fn run(job_id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let url = config.database.url.as_deref().ok_or(
        "No database configured. Set DATABASE_URL or [database] url in config.toml",
    )?;
    let store = jobsuite_store::connect(
        url,
        &config.database.listings_table,
        config.database.max_connections,
    )
    .await?;

    match store.fetch_listing(job_id).await? {
        Some(listing) => print!("{}", format_listing(&listing)),
        None => {
            return Err(format!(
                "No listing with job_id {job_id} in {}",
                config.database.listings_table
            )
            .into());
        }
    }
    Ok(())
}

pub fn format_listing(listing: &JobListing) -> String {
    let or_none = |v: Option<String>| v.unwrap_or_else(|| "None".into());
    let mut out = String::new();
    out.push_str(&format!("  job_id:       {}\n", listing.job_id));
    out.push_str(&format!("  title:        {}\n", listing.title));
    out.push_str(&format!("  salary_range: {}\n", listing.salary_range));
    out.push_str(&format!("  location:     {}\n", or_none(listing.location.clone())));
    out.push_str(&format!(
        "  posted_date:  {}\n",
        or_none(listing.posted_date.map(|d| d.to_string()))
    ));
    out.push_str(&format!("  active:       {}\n", listing.active));
    out.push_str(&format!(
        "  description:  {}\n",
        or_none(listing.description.clone())
    ));
    out
}
