//! Tag aggregation across all documents.

use crate::docs::{locate_doc_file, read_source};
use crate::frontmatter::parse_frontmatter_lenient;
use crate::models::{DocWithTags, TagInfo};
use crate::slug::format_name;
use crate::tree::{all_doc_paths, TreeError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TagError {
    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lowercased, trimmed, deduplicated tags in first-seen order
pub fn normalize_tags(raw: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    raw.iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

/// Snapshot of every tagged document and the tag counts derived from it
///
/// Built once per content change, not per request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagIndex {
    /// Sorted by count (descending), then name
    pub tags: Vec<TagInfo>,
    /// Documents with at least one tag, in content order
    pub docs: Vec<DocWithTags>,
}

impl TagIndex {
    /// Read every document's frontmatter below `content_root`
    pub fn scan(content_root: &Path) -> Result<Self, TagError> {
        let mut docs = Vec::new();

        for route in all_doc_paths(content_root)? {
            let Some(file) = locate_doc_file(content_root, &route) else {
                continue;
            };
            let source = read_source(&file)?;
            let (frontmatter, _) = parse_frontmatter_lenient(&source, &route);

            let tags = normalize_tags(&frontmatter.tags());
            if tags.is_empty() {
                continue;
            }
            let title = frontmatter
                .title()
                .unwrap_or_else(|| format_name(route.rsplit('/').next().unwrap_or(&route)));

            docs.push(DocWithTags {
                title,
                path: route,
                tags,
                description: frontmatter.description(),
            });
        }

        let index = Self::from_docs(docs);
        tracing::debug!(
            "Indexed {} tags across {} documents",
            index.tags.len(),
            index.docs.len()
        );
        Ok(index)
    }

    pub fn from_docs(docs: Vec<DocWithTags>) -> Self {
        let tags = count_tags(docs.iter().map(|d| d.tags.as_slice()), None);
        Self { tags, docs }
    }

    /// Documents carrying `tag`, compared case-insensitively
    pub fn docs_with_tag(&self, tag: &str) -> Vec<&DocWithTags> {
        let tag = tag.trim().to_lowercase();
        self.docs.iter().filter(|d| d.tags.contains(&tag)).collect()
    }

    /// Tags that co-occur with `tag`, with co-occurrence counts
    pub fn related_tags(&self, tag: &str) -> Vec<TagInfo> {
        let tag = tag.trim().to_lowercase();
        count_tags(
            self.docs_with_tag(&tag).into_iter().map(|d| d.tags.as_slice()),
            Some(tag.as_str()),
        )
    }
}

fn count_tags<'a>(tag_lists: impl Iterator<Item = &'a [String]>, exclude: Option<&str>) -> Vec<TagInfo> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for tags in tag_lists {
        for tag in tags {
            if Some(tag.as_str()) != exclude {
                *counts.entry(tag.as_str()).or_insert(0) += 1;
            }
        }
    }

    let mut tags: Vec<TagInfo> = counts
        .into_iter()
        .map(|(name, count)| TagInfo {
            name: name.to_string(),
            count,
        })
        .collect();
    tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    tags
}

/// Every tag with its document count
pub fn get_all_tags(content_root: &Path) -> Result<Vec<TagInfo>, TagError> {
    Ok(TagIndex::scan(content_root)?.tags)
}

/// Every document that carries at least one tag
pub fn get_all_docs_with_tags(content_root: &Path) -> Result<Vec<DocWithTags>, TagError> {
    Ok(TagIndex::scan(content_root)?.docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn doc(path: &str, tags: &[&str]) -> DocWithTags {
        DocWithTags {
            title: path.to_string(),
            path: path.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            description: None,
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_counts_sorted_by_count_then_name() {
        let index = TagIndex::from_docs(vec![
            doc("one", &["a", "b"]),
            doc("two", &["b"]),
            doc("three", &["c"]),
        ]);
        assert_eq!(
            index.tags,
            vec![
                TagInfo { name: "b".into(), count: 2 },
                TagInfo { name: "a".into(), count: 1 },
                TagInfo { name: "c".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_normalize_tags() {
        let raw = vec![" Rust ".to_string(), "rust".into(), "".into(), "Web".into()];
        assert_eq!(normalize_tags(&raw), vec!["rust", "web"]);
    }

    #[test]
    fn test_docs_with_tag_and_related() {
        let index = TagIndex::from_docs(vec![
            doc("one", &["rust", "cli"]),
            doc("two", &["rust", "web"]),
            doc("three", &["web"]),
        ]);
        let paths: Vec<_> = index.docs_with_tag("RUST").iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["one", "two"]);

        let related = index.related_tags("rust");
        assert_eq!(
            related,
            vec![
                TagInfo { name: "cli".into(), count: 1 },
                TagInfo { name: "web".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_scan_content() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "guides/setup.md",
            "---\ntitle: Setup\ntags: [Rust, CLI]\ndescription: Getting going\n---\n",
        );
        write(dir.path(), "api/index.md", "---\ntags: rust\n---\n");
        write(dir.path(), "untagged.md", "# Nothing\n");
        write(dir.path(), "_drafts/secret.md", "---\ntags: [hidden]\n---\n");

        let index = TagIndex::scan(dir.path()).unwrap();
        assert_eq!(index.tags[0], TagInfo { name: "rust".into(), count: 2 });
        assert_eq!(index.tags.len(), 2);

        assert_eq!(index.docs.len(), 2);
        assert_eq!(index.docs[0].path, "api");
        assert_eq!(index.docs[0].title, "Api");
        assert_eq!(index.docs[1].tags, vec!["rust", "cli"]);
        assert_eq!(index.docs[1].description.as_deref(), Some("Getting going"));
    }

    #[test]
    fn test_scan_counts_shared_route_once() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "api.md", "---\ntags: [b]\n---\n");
        write(dir.path(), "api/index.md", "---\ntags: [z]\n---\n");

        let index = TagIndex::scan(dir.path()).unwrap();
        assert_eq!(index.tags, vec![TagInfo { name: "b".into(), count: 1 }]);
        assert_eq!(index.docs.len(), 1);
    }
}
