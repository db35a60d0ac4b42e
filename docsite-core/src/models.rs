//! Content model structs for the navigation tree, documents and tags.

use crate::frontmatter::Frontmatter;
use serde::{Deserialize, Serialize};

/// Kind of navigation node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    File,
    Folder,
}

/// A folder or file in the navigation hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Display name derived from the filename ("getting-started" -> "Getting Started")
    pub name: String,

    /// Document title from frontmatter, files only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Slash-separated route key, unique per node
    pub path: String,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    /// Ordered children; folders only and never empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    pub fn file(name: String, title: Option<String>, path: String) -> Self {
        Self {
            name,
            title,
            path,
            node_type: NodeType::File,
            children: None,
        }
    }

    pub fn folder(name: String, path: String, children: Vec<TreeNode>) -> Self {
        Self {
            name,
            title: None,
            path,
            node_type: NodeType::Folder,
            children: Some(children),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.node_type == NodeType::Folder
    }

    /// Label shown in navigation: the title when known, else the formatted name
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }

    pub fn children(&self) -> &[TreeNode] {
        self.children.as_deref().unwrap_or(&[])
    }
}

/// One step of the root-to-document breadcrumb trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub name: String,
    pub path: String,
}

/// A heading entry in a document's table of contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocItem {
    /// Anchor slug, unique within the document
    pub id: String,
    pub text: String,
    /// Heading depth, 2 to 4
    pub level: u8,
}

/// A resolved, rendered document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocContent {
    /// Route path the document was resolved from
    pub path: String,
    pub title: String,
    /// Rendered HTML body
    pub content: String,
    pub frontmatter: Frontmatter,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub toc: Vec<TocItem>,
    /// Minutes, never below 1
    pub reading_time: usize,
    pub word_count: usize,
}

/// A term auto-linked across documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryTerm {
    /// Canonical display name
    pub term: String,
    /// Free text, used as the link tooltip
    pub definition: String,
    /// Term, its lowercase form and declared aliases, deduplicated
    pub aliases: Vec<String>,
    /// Route to the glossary entry ("glossary/docker")
    pub path: String,
}

/// A tag and how many documents carry it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    pub name: String,
    pub count: usize,
}

/// Per-document view used by the tag browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocWithTags {
    pub title: String,
    pub path: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
