//! CLI command implementations.

pub mod build;
pub mod glossary;
pub mod render;
pub mod serve;
pub mod tags;
pub mod tree;

pub use build::build_export;
pub use glossary::show_glossary;
pub use render::render_doc;
pub use serve::serve;
pub use tags::show_tags;
pub use tree::show_tree;

use anyhow::{Context, Result};
use docsite_core::Config;
use std::path::Path;

/// Load the config file; the default path may be absent
pub(crate) fn load_config(config_path: &Path) -> Result<Config> {
    tracing::debug!("Loading config from {:?}", config_path);
    Config::load_or_default(config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))
}
