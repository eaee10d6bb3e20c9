//! `siteimg list` – show every override row.

use anyhow::Result;
use siteimg_core::store::RestStore;

pub async fn run_list(store: &RestStore) -> Result<()> {
    let records = store.list_overrides().await?;
    if records.is_empty() {
        println!("No overrides in the store.");
    } else {
        println!("{:<28} {:<12} {:<20} {}", "SLOT", "SECTION", "LABEL", "URL");
        for rec in records {
            println!(
                "{:<28} {:<12} {:<20} {}",
                rec.slot_key,
                rec.section.as_deref().unwrap_or("-"),
                rec.label.as_deref().unwrap_or("-"),
                rec.image_url
            );
        }
    }
    Ok(())
}
