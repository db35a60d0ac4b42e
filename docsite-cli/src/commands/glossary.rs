//! Glossary term listing.

use super::load_config;
use anyhow::{Context, Result};
use docsite_core::scan_glossary_terms;
use std::path::Path;

pub fn show_glossary(config_path: &Path, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let terms = scan_glossary_terms(&config.content_dir(), &config.glossary.dir)
        .context("Failed to scan glossary")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&terms)?);
        return Ok(());
    }

    for term in &terms {
        if term.definition.is_empty() {
            println!("{}  ({})", term.term, term.path);
        } else {
            println!("{}  ({}): {}", term.term, term.path, term.definition);
        }
    }
    Ok(())
}
