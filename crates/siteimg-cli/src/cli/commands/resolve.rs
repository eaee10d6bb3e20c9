//! `siteimg resolve <slot_key>` – print a slot's effective image URL.

use anyhow::Result;
use siteimg_core::resolver::SlotResolver;
use siteimg_core::store::RestStore;
use std::sync::Arc;

pub async fn run_resolve(store: &RestStore, slot_key: &str, default_url: &str) -> Result<()> {
    let resolver = SlotResolver::new(Arc::new(store.clone()));
    let url = resolver.resolve_one(slot_key, default_url).await;
    println!("{url}");
    if resolver.peek(slot_key).is_none() {
        eprintln!("(no override for '{slot_key}'; showing the default)");
    }
    Ok(())
}
