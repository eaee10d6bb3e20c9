//! `siteimg upload <path> --slot <key>` – replace a slot's image.

use anyhow::Result;
use siteimg_core::store::RestStore;
use siteimg_core::upload::upload_image;
use std::path::Path;

pub async fn run_upload(
    store: &RestStore,
    slot_key: &str,
    path: &Path,
    label: Option<&str>,
    section: Option<&str>,
) -> Result<()> {
    let outcome = upload_image(store, slot_key, path, label, section).await?;
    println!(
        "Uploaded {} for slot '{}'",
        path.display(),
        outcome.slot_key
    );
    println!("{}", outcome.public_url);
    println!("Already-running sites keep their cached image until reloaded.");
    Ok(())
}
