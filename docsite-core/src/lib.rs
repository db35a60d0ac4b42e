//! # docsite-core
//!
//! Core library for the docsite documentation server.
//!
//! This crate turns a directory of markdown files into a navigation tree,
//! rendered documents with tables of contents, glossary term links, and a
//! tag index.

pub mod access;
pub mod config;
pub mod docs;
pub mod frontmatter;
pub mod glossary;
pub mod markdown;
pub mod models;
pub mod slug;
pub mod tags;
pub mod tree;

pub use access::{check_access, is_public_path, AccessDecision, AppRole, RequiredRole, Viewer};
pub use config::Config;
pub use docs::{DocError, DocResolver};
pub use frontmatter::Frontmatter;
pub use glossary::{link_terms, scan_glossary_terms, GlossaryCache, GlossaryLinker};
pub use markdown::{MarkdownProcessor, RenderedMarkdown};
pub use models::{
    Breadcrumb, DocContent, DocWithTags, GlossaryTerm, NodeType, TagInfo, TocItem, TreeNode,
};
pub use slug::slugify;
pub use tags::{get_all_docs_with_tags, get_all_tags, TagIndex};
pub use tree::{all_doc_paths, build_tree, TreeBuilder};
