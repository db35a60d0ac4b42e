//! Resolve and print a single document.

use super::load_config;
use crate::RenderFormat;
use anyhow::{bail, Context, Result};
use docsite_core::{DocError, DocResolver};
use std::path::Path;

pub fn render_doc(config_path: &Path, route: &str, format: RenderFormat) -> Result<()> {
    let config = load_config(config_path)?;
    let resolver = DocResolver::from_config(&config);

    let doc = match resolver.resolve(route) {
        Ok(doc) => doc,
        Err(e @ (DocError::NotFound(_) | DocError::InvalidPath(_))) => {
            bail!("Document '{}' not found: {}", route, e)
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to render '{}'", route)),
    };

    match format {
        RenderFormat::Json => println!("{}", serde_json::to_string_pretty(&doc)?),
        RenderFormat::Html => println!("{}", doc.content),
        RenderFormat::Toc => {
            for item in &doc.toc {
                println!(
                    "{}- {} (#{})",
                    "  ".repeat(usize::from(item.level.saturating_sub(2))),
                    item.text,
                    item.id
                );
            }
        }
    }

    Ok(())
}
