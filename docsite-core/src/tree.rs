//! Navigation tree building from the content directory.

use crate::config::Config;
use crate::docs::read_source;
use crate::frontmatter::parse_frontmatter_lenient;
use crate::models::TreeNode;
use crate::slug::format_name;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Hidden (`.`) and draft (`_`) entries never show up anywhere
pub fn is_skipped_name(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_')
}

/// Builds the sidebar hierarchy of folders and markdown files
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    hidden_folders: HashSet<String>,
}

struct DirEntryInfo {
    name: String,
    is_dir: bool,
}

impl TreeBuilder {
    pub fn new<I, S>(hidden_folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hidden_folders: hidden_folders.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.tree.hidden_folders.iter().cloned())
    }

    /// Build the tree below `root`; a missing root yields an empty tree
    pub fn build(&self, root: &Path) -> Result<Vec<TreeNode>, TreeError> {
        if !root.is_dir() {
            tracing::debug!("Content root {:?} missing, empty tree", root);
            return Ok(Vec::new());
        }
        self.build_dir(root, "")
    }

    fn build_dir(&self, dir: &Path, base_path: &str) -> Result<Vec<TreeNode>, TreeError> {
        let mut tree = Vec::new();

        for item in read_sorted(dir)? {
            if is_skipped_name(&item.name) {
                continue;
            }

            let item_path = dir.join(&item.name);
            let relative = if base_path.is_empty() {
                item.name.clone()
            } else {
                format!("{}/{}", base_path, item.name)
            };

            if item.is_dir {
                if self.hidden_folders.contains(&item.name) {
                    tracing::debug!("Leaving {} out of the tree", relative);
                    continue;
                }
                let children = self.build_dir(&item_path, &relative)?;
                // Only add folders that have content
                if !children.is_empty() {
                    tree.push(TreeNode::folder(format_name(&item.name), relative, children));
                }
            } else if let Some(stem) = item.name.strip_suffix(".md") {
                let title = read_title(&item_path)?;
                let route = match relative.strip_suffix(".md") {
                    Some(route) => route.to_string(),
                    None => relative.clone(),
                };
                tree.push(TreeNode::file(format_name(stem), title, route));
            }
        }

        Ok(tree)
    }
}

/// Build the navigation tree with the configured folder denylist
pub fn build_tree(config: &Config) -> Result<Vec<TreeNode>, TreeError> {
    TreeBuilder::from_config(config).build(&config.content_dir())
}

fn read_sorted(dir: &Path) -> Result<Vec<DirEntryInfo>, TreeError> {
    let mut items = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            tracing::debug!("Skipping non UTF-8 entry in {:?}", dir);
            continue;
        };
        // Symlinked folders are not followed, so link cycles can't recurse
        let is_dir = entry.file_type()?.is_dir();
        items.push(DirEntryInfo { name, is_dir });
    }

    // Folders first, then files, alphabetically
    items.sort_by(|a, b| match (a.is_dir, b.is_dir) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => locale_cmp(&a.name, &b.name),
    });
    Ok(items)
}

/// Case-insensitive primary order, lowercase before uppercase on ties
fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

fn read_title(path: &Path) -> Result<Option<String>, TreeError> {
    let content = read_source(path)?;
    let (frontmatter, _) = parse_frontmatter_lenient(&content, &path.to_string_lossy());
    Ok(frontmatter.title())
}

/// Every addressable document route below `root`
///
/// Files are listed without their extension; a folder holding an
/// `index.md` is listed under the folder's own route instead of `{folder}/index`.
/// Each route appears once, even when `{folder}.md` and `{folder}/index.md`
/// both exist; it resolves to `{folder}.md`.
pub fn all_doc_paths(root: &Path) -> Result<Vec<String>, TreeError> {
    let mut paths = Vec::new();
    let mut seen = HashSet::new();
    if !root.is_dir() {
        return Ok(paths);
    }

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || e
                    .file_name()
                    .to_str()
                    .map(|name| !is_skipped_name(name))
                    .unwrap_or(false)
        });

    for entry in walker {
        let entry = entry?;
        if entry.depth() == 0 {
            continue;
        }
        let route = route_for(root, entry.path());

        let route = if entry.file_type().is_dir() {
            if !entry.path().join("index.md").is_file() {
                continue;
            }
            route
        } else {
            let nested_index = entry.depth() > 1 && entry.file_name() == "index.md";
            match route.strip_suffix(".md") {
                Some(route) if !nested_index => route.to_string(),
                _ => continue,
            }
        };

        if seen.insert(route.clone()) {
            paths.push(route);
        }
    }

    Ok(paths)
}

/// Slash-separated route of `path` relative to `root`
pub(crate) fn route_for(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Indented text outline of a tree, one node per line
pub fn render_outline(nodes: &[TreeNode]) -> String {
    fn walk(nodes: &[TreeNode], depth: usize, lines: &mut Vec<String>) {
        for node in nodes {
            let marker = if node.is_folder() { "+" } else { "-" };
            lines.push(format!(
                "{}{} {} ({})",
                "  ".repeat(depth),
                marker,
                node.label(),
                node.path
            ));
            walk(node.children(), depth + 1, lines);
        }
    }

    let mut lines = Vec::new();
    walk(nodes, 0, &mut lines);
    lines.join("\n")
}
