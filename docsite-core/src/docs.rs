//! Document resolution: route path in, rendered [`DocContent`] out.

use crate::config::Config;
use crate::frontmatter::parse_frontmatter_lenient;
use crate::glossary::GlossaryCache;
use crate::markdown::{
    first_h1, reading_time, word_count, MarkdownProcessor, RewriteContext, RewritePipeline,
};
use crate::models::{Breadcrumb, DocContent};
use crate::slug::format_name;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid document path: {0:?}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocError {
    /// Whether the request should be answered as "not found"
    pub fn is_not_found(&self) -> bool {
        matches!(self, DocError::NotFound(_) | DocError::InvalidPath(_))
    }
}

/// Normalize a route: trim slashes, reject empty, `.`, `..` and backslash segments
pub fn normalize_route(route: &str) -> Result<String, DocError> {
    let trimmed = route.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Err(DocError::InvalidPath(route.to_string()));
    }
    for segment in trimmed.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
            return Err(DocError::InvalidPath(route.to_string()));
        }
    }
    Ok(trimmed.to_string())
}

/// File backing a normalized route: `{route}.md`, else `{route}/index.md`
pub fn locate_doc_file(content_root: &Path, route: &str) -> Option<PathBuf> {
    let direct = content_root.join(format!("{}.md", route));
    if direct.is_file() {
        return Some(direct);
    }
    let index = content_root.join(route).join("index.md");
    index.is_file().then_some(index)
}

/// Read a markdown file, decoding invalid UTF-8 lossily instead of failing
pub fn read_source(path: &Path) -> std::io::Result<String> {
    let bytes = fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            tracing::warn!("{:?} is not valid UTF-8, replacing invalid bytes", path);
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

/// Root-to-document trail, one entry per route segment
pub fn breadcrumbs(route: &str) -> Vec<Breadcrumb> {
    let segments: Vec<&str> = route.split('/').filter(|s| !s.is_empty()).collect();
    (0..segments.len())
        .map(|i| Breadcrumb {
            name: format_name(segments[i]),
            path: segments[..=i].join("/"),
        })
        .collect()
}

/// Resolves and renders documents below a content root
pub struct DocResolver {
    content_root: PathBuf,
    docs_prefix: String,
    words_per_minute: usize,
    processor: MarkdownProcessor,
    rewrites: RewritePipeline,
    glossary: Option<Arc<GlossaryCache>>,
}

impl DocResolver {
    /// Resolver sharing an existing glossary cache; `None` disables linking
    pub fn new(config: &Config, glossary: Option<Arc<GlossaryCache>>) -> Self {
        Self {
            content_root: config.content_dir(),
            docs_prefix: config.normalized_docs_prefix(),
            words_per_minute: config.reading.words_per_minute,
            processor: MarkdownProcessor::new(&config.highlight.theme),
            rewrites: RewritePipeline::standard(),
            glossary,
        }
    }

    /// Resolver with its own glossary cache when the glossary is enabled
    pub fn from_config(config: &Config) -> Self {
        let glossary = config
            .glossary
            .enabled
            .then(|| Arc::new(GlossaryCache::from_config(config)));
        Self::new(config, glossary)
    }

    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    pub fn glossary(&self) -> Option<&Arc<GlossaryCache>> {
        self.glossary.as_ref()
    }

    /// Resolve `route` to a rendered document
    ///
    /// Resolution only reads the file system, so repeated calls with an
    /// unchanged content directory produce identical results.
    pub fn resolve(&self, route: &str) -> Result<DocContent, DocError> {
        let route = normalize_route(route)?;
        let file = locate_doc_file(&self.content_root, &route)
            .ok_or_else(|| DocError::NotFound(route.clone()))?;

        tracing::debug!("Resolving {} from {:?}", route, file);
        let source = read_source(&file)?;
        let (frontmatter, body) = parse_frontmatter_lenient(&source, &route);

        let words = word_count(&body);
        let ctx = RewriteContext::new(&route, &self.docs_prefix);
        let rewritten = self.rewrites.apply(&body, &ctx);
        let rendered = self.processor.render(&rewritten);

        let content = match &self.glossary {
            Some(cache) => match cache.linker() {
                Ok(linker) => linker.link(&rendered.html, &route),
                Err(e) => {
                    tracing::warn!("Glossary unavailable, skipping term links: {}", e);
                    rendered.html
                }
            },
            None => rendered.html,
        };

        let title = frontmatter
            .title()
            .or_else(|| first_h1(&body))
            .unwrap_or_else(|| format_name(route.rsplit('/').next().unwrap_or(&route)));

        Ok(DocContent {
            breadcrumbs: breadcrumbs(&route),
            title,
            content,
            frontmatter,
            toc: rendered.toc,
            reading_time: reading_time(words, self.words_per_minute),
            word_count: words,
            path: route,
        })
    }
}
