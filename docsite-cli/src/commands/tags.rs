//! Tag listing.

use super::load_config;
use anyhow::{Context, Result};
use docsite_core::TagIndex;
use std::path::Path;

pub fn show_tags(config_path: &Path, tag: Option<&str>, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let index = TagIndex::scan(&config.content_dir()).context("Failed to scan tags")?;

    match tag {
        Some(tag) => {
            let docs = index.docs_with_tag(tag);
            if json {
                println!("{}", serde_json::to_string_pretty(&docs)?);
            } else if docs.is_empty() {
                println!("No documents tagged '{}'", tag);
            } else {
                for doc in docs {
                    println!("{}  ({})", doc.title, doc.path);
                }
            }
        }
        None => {
            if json {
                println!("{}", serde_json::to_string_pretty(&index.tags)?);
            } else {
                for info in &index.tags {
                    println!("{:>4}  {}", info.count, info.name);
                }
            }
        }
    }

    Ok(())
}
