//! CLI parse tests.

use super::{Cli, CliCommand};
use clap::Parser;

fn parse(args: &[&str]) -> CliCommand {
    let cli = Cli::try_parse_from(args).unwrap();
    cli.command
}

#[test]
fn cli_parse_resolve_with_default() {
    match parse(&["siteimg", "resolve", "site_logo", "--default", "/images/logo.svg"]) {
        CliCommand::Resolve { slot_key, default } => {
            assert_eq!(slot_key, "site_logo");
            assert_eq!(default, "/images/logo.svg");
        }
        other => panic!("expected Resolve, got {:?}", other),
    }
}

#[test]
fn cli_parse_resolve_default_fallback() {
    match parse(&["siteimg", "resolve", "hero_banner"]) {
        CliCommand::Resolve { slot_key, default } => {
            assert_eq!(slot_key, "hero_banner");
            assert_eq!(default, "/images/placeholder.svg");
        }
        other => panic!("expected Resolve, got {:?}", other),
    }
}

#[test]
fn cli_parse_list() {
    match parse(&["siteimg", "list"]) {
        CliCommand::List => {}
        other => panic!("expected List, got {:?}", other),
    }
}

#[test]
fn cli_parse_upload_minimal() {
    match parse(&["siteimg", "upload", "logo.png", "--slot", "site_logo"]) {
        CliCommand::Upload {
            path,
            slot,
            label,
            section,
        } => {
            assert_eq!(path.to_str(), Some("logo.png"));
            assert_eq!(slot, "site_logo");
            assert!(label.is_none());
            assert!(section.is_none());
        }
        other => panic!("expected Upload, got {:?}", other),
    }
}

#[test]
fn cli_parse_upload_with_metadata() {
    match parse(&[
        "siteimg",
        "upload",
        "beds.jpg",
        "--slot",
        "featured_beds",
        "--label",
        "Featured beds",
        "--section",
        "products",
    ]) {
        CliCommand::Upload {
            slot,
            label,
            section,
            ..
        } => {
            assert_eq!(slot, "featured_beds");
            assert_eq!(label.as_deref(), Some("Featured beds"));
            assert_eq!(section.as_deref(), Some("products"));
        }
        other => panic!("expected Upload, got {:?}", other),
    }
}

#[test]
fn cli_parse_upload_requires_slot() {
    assert!(Cli::try_parse_from(["siteimg", "upload", "logo.png"]).is_err());
}
