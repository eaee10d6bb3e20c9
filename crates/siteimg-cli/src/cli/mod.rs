//! CLI for managing slot-based site image overrides.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use siteimg_core::config;
use siteimg_core::store::RestStore;
use std::path::PathBuf;

use commands::{run_list, run_resolve, run_upload};

/// Top-level CLI for the site image manager.
#[derive(Debug, Parser)]
#[command(name = "siteimg")]
#[command(about = "siteimg: manage image overrides for site slots", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Resolve a slot to its currently-effective image URL.
    Resolve {
        /// Slot key, e.g. `site_logo`.
        slot_key: String,
        /// Fallback URL when no override exists.
        #[arg(long, default_value = "/images/placeholder.svg", value_name = "URL")]
        default: String,
    },

    /// List every override row with its metadata.
    List,

    /// Upload an image file as the new override for a slot.
    Upload {
        /// Path to the image file (JPEG, PNG, WebP, SVG, or GIF; max 5MB).
        path: PathBuf,
        /// Slot key the image belongs to.
        #[arg(long, value_name = "KEY")]
        slot: String,
        /// Human-readable label shown in listings.
        #[arg(long)]
        label: Option<String>,
        /// Site section the slot belongs to (e.g. `header`, `products`).
        #[arg(long)]
        section: Option<String>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config for store {}", cfg.store_url);
        let store = RestStore::from_config(&cfg)?;

        match cli.command {
            CliCommand::Resolve { slot_key, default } => {
                run_resolve(&store, &slot_key, &default).await?
            }
            CliCommand::List => run_list(&store).await?,
            CliCommand::Upload {
                path,
                slot,
                label,
                section,
            } => run_upload(&store, &slot, &path, label.as_deref(), section.as_deref()).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
