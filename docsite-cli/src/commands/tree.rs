//! Print the navigation tree.

use super::load_config;
use anyhow::{Context, Result};
use docsite_core::tree::{build_tree, render_outline};
use std::path::Path;

pub fn show_tree(config_path: &Path, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let tree = build_tree(&config)
        .with_context(|| format!("Failed to read content from {:?}", config.content_dir()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
    } else if tree.is_empty() {
        println!("No documents found in {:?}", config.content_dir());
    } else {
        println!("{}", render_outline(&tree));
    }

    Ok(())
}
