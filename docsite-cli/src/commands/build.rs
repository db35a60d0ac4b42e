//! Static JSON export.

use super::load_config;
use anyhow::{Context, Result};
use chrono::Utc;
use docsite_core::{all_doc_paths, build_tree, Config, DocResolver, TagIndex};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Summary written to `manifest.json`
#[derive(Debug, Serialize)]
pub struct Manifest {
    pub site: String,
    pub generated_at: String,
    pub docs_prefix: String,
    pub documents: usize,
    pub tags: usize,
    pub glossary_terms: usize,
}

/// Export everything below the configured output directory
pub fn build_export(config_path: &Path) -> Result<Manifest> {
    let config = load_config(config_path)?;
    build_export_with_config(&config)
}

pub fn build_export_with_config(config: &Config) -> Result<Manifest> {
    let content_dir = config.content_dir();
    let output_dir = config.output_dir();
    tracing::info!("Exporting {:?} into {:?}", content_dir, output_dir);

    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;

    let tree = build_tree(config).context("Failed to build navigation tree")?;
    write_json(&output_dir.join("tree.json"), &tree)?;

    let paths = all_doc_paths(&content_dir).context("Failed to enumerate documents")?;
    write_json(&output_dir.join("paths.json"), &paths)?;

    let tags = TagIndex::scan(&content_dir).context("Failed to scan tags")?;
    write_json(&output_dir.join("tags.json"), &tags.tags)?;
    write_json(&output_dir.join("tag-docs.json"), &tags.docs)?;

    let resolver = DocResolver::from_config(config);
    let glossary = match resolver.glossary() {
        Some(cache) => cache.terms().context("Failed to scan glossary")?,
        None => Vec::new(),
    };
    write_json(&output_dir.join("glossary.json"), &glossary)?;

    let docs_dir = output_dir.join("docs");
    for route in &paths {
        let doc = resolver
            .resolve(route)
            .with_context(|| format!("Failed to render '{}'", route))?;
        write_json(&doc_output_path(&docs_dir, route), &doc)?;
    }

    let manifest = Manifest {
        site: config.site.title.clone(),
        generated_at: Utc::now().to_rfc3339(),
        docs_prefix: config.normalized_docs_prefix(),
        documents: paths.len(),
        tags: tags.tags.len(),
        glossary_terms: glossary.len(),
    };
    write_json(&output_dir.join("manifest.json"), &manifest)?;

    tracing::info!(
        "Exported {} documents, {} tags, {} glossary terms",
        manifest.documents,
        manifest.tags,
        manifest.glossary_terms
    );
    println!("Exported {} documents to {:?}", manifest.documents, output_dir);

    Ok(manifest)
}

fn doc_output_path(docs_dir: &Path, route: &str) -> PathBuf {
    let mut path = docs_dir.to_path_buf();
    let (dirs, file) = route.rsplit_once('/').unwrap_or(("", route));
    for segment in dirs.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path.push(format!("{}.json", file));
    path
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    let json = serde_json::to_vec_pretty(value)
        .with_context(|| format!("Failed to serialize {:?}", path))?;
    fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
    tracing::debug!("Wrote {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_output_path() {
        let root = Path::new("out/docs");
        assert_eq!(doc_output_path(root, "intro"), root.join("intro.json"));
        assert_eq!(
            doc_output_path(root, "guides/v1.2"),
            root.join("guides").join("v1.2.json")
        );
    }
}
