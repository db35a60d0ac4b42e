//! Glossary term discovery and automatic term linking.
//!
//! Entries are markdown files below the glossary directory whose
//! frontmatter declares `glossary: true` and a `title`. Rendered documents
//! get the first mention of each term wrapped in a link to its entry.

use crate::config::Config;
use crate::docs::read_source;
use crate::frontmatter::parse_frontmatter_lenient;
use crate::markdown::html_escape;
use crate::models::GlossaryTerm;
use crate::tree::{is_skipped_name, route_for};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum GlossaryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Aliases this short or shorter never link
const MIN_ALIAS_CHARS: usize = 3;

/// Scan `{content_root}/{glossary_dir}` for glossary entries
///
/// Terms come back sorted by term length, longest first. A missing
/// directory yields no terms.
pub fn scan_glossary_terms(
    content_root: &Path,
    glossary_dir: &str,
) -> Result<Vec<GlossaryTerm>, GlossaryError> {
    let dir = content_root.join(glossary_dir);
    let mut terms = Vec::new();
    if !dir.is_dir() {
        tracing::debug!("No glossary directory at {:?}", dir);
        return Ok(terms);
    }

    let walker = WalkDir::new(&dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || e.file_name()
                    .to_str()
                    .map(|name| !is_skipped_name(name))
                    .unwrap_or(false)
        });

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(route) = route_for(content_root, path).strip_suffix(".md").map(str::to_string)
        else {
            continue;
        };
        // A folder's index.md is the entry for the folder itself
        let route = match route.strip_suffix("/index") {
            Some(folder) => folder.to_string(),
            None => route,
        };

        if let Some(term) = read_term(path, route)? {
            terms.push(term);
        }
    }

    terms.sort_by(|a, b| b.term.chars().count().cmp(&a.term.chars().count()));
    tracing::debug!("Loaded {} glossary terms", terms.len());
    Ok(terms)
}

fn read_term(path: &Path, route: String) -> Result<Option<GlossaryTerm>, GlossaryError> {
    let content = read_source(path)?;
    let (frontmatter, _) = parse_frontmatter_lenient(&content, &route);

    if !frontmatter.is_glossary() {
        return Ok(None);
    }
    let Some(term) = frontmatter.title() else {
        tracing::debug!("Glossary entry {} has no title, skipping", route);
        return Ok(None);
    };

    let mut aliases = Vec::new();
    let mut seen = HashSet::new();
    let declared = frontmatter.aliases();
    let candidates = [term.clone(), term.to_lowercase()]
        .into_iter()
        .chain(declared.iter().cloned())
        .chain(declared.iter().map(|a| a.to_lowercase()));
    for alias in candidates {
        if seen.insert(alias.clone()) {
            aliases.push(alias);
        }
    }

    Ok(Some(GlossaryTerm {
        definition: frontmatter.definition().unwrap_or_default(),
        term,
        aliases,
        path: route,
    }))
}

/// Protected regions whose text is never linked
static PROTECTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?is)<pre\b.*?</pre>",
        r"|<code\b[^>]*>.*?</code>",
        r"|<h[1-6]\b[^>]*>.*?</h[1-6]>",
        r"|<a\b[^>]*>.*?</a>",
        r#"|<div class="code-block-header"[^>]*>.*?</div>"#,
        r"|<script\b.*?</script>",
        r"|<style\b.*?</style>",
    ))
    .unwrap()
});

/// Tags and entities between text runs
static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>|&[#A-Za-z0-9]+;").unwrap());

/// Terms already linked by a previous pass
static EXISTING_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<a\b[^>]*class="glossary-term"[^>]*data-term="([^"]*)""#).unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Markup(String),
}

fn segment_html(html: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;
    for m in PROTECTED.find_iter(html) {
        split_markup(&html[last..m.start()], &mut segments);
        segments.push(Segment::Markup(m.as_str().to_string()));
        last = m.end();
    }
    split_markup(&html[last..], &mut segments);
    segments
}

fn split_markup(html: &str, out: &mut Vec<Segment>) {
    let mut last = 0;
    for m in MARKUP.find_iter(html) {
        if m.start() > last {
            out.push(Segment::Text(html[last..m.start()].to_string()));
        }
        out.push(Segment::Markup(m.as_str().to_string()));
        last = m.end();
    }
    if last < html.len() {
        out.push(Segment::Text(html[last..].to_string()));
    }
}

fn unescape_attr(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

struct LinkerEntry {
    term: GlossaryTerm,
    /// One pattern per linkable alias, longest alias first
    patterns: Vec<Regex>,
}

/// Links glossary terms in rendered HTML
///
/// Patterns are compiled once; a linker is cheap to share behind an `Arc`.
pub struct GlossaryLinker {
    docs_prefix: String,
    entries: Vec<LinkerEntry>,
}

impl GlossaryLinker {
    pub fn new(terms: Vec<GlossaryTerm>, docs_prefix: &str) -> Self {
        let entries = terms
            .into_iter()
            .map(|term| {
                let mut aliases: Vec<&String> = term
                    .aliases
                    .iter()
                    .filter(|a| a.chars().count() >= MIN_ALIAS_CHARS)
                    .collect();
                aliases.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

                let patterns = aliases
                    .into_iter()
                    .filter_map(|alias| {
                        let pattern = format!(r"(?i)\b{}\b", regex::escape(alias));
                        match Regex::new(&pattern) {
                            Ok(re) => Some(re),
                            Err(e) => {
                                tracing::warn!("Skipping glossary alias {:?}: {}", alias, e);
                                None
                            }
                        }
                    })
                    .collect();

                LinkerEntry { term, patterns }
            })
            .collect();

        Self {
            docs_prefix: docs_prefix.to_string(),
            entries,
        }
    }

    pub fn terms(&self) -> impl Iterator<Item = &GlossaryTerm> {
        self.entries.iter().map(|e| &e.term)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Link the first mention of each term in `html`
    ///
    /// Skips the entry for `current_path` itself, terms already linked in
    /// the input, and anything inside headings, links, code or `<pre>`.
    /// Running it twice gives the same output as running it once.
    pub fn link(&self, html: &str, current_path: &str) -> String {
        if self.entries.is_empty() {
            return html.to_string();
        }

        let current = current_path.trim_matches('/');
        let mut linked: HashSet<String> = EXISTING_LINK
            .captures_iter(html)
            .map(|caps| unescape_attr(&caps[1]).to_lowercase())
            .collect();
        let mut segments = segment_html(html);

        for entry in &self.entries {
            if entry.term.path.trim_matches('/') == current {
                continue;
            }
            let key = entry.term.term.to_lowercase();
            if linked.contains(&key) {
                continue;
            }

            if self.link_first(entry, &mut segments) {
                linked.insert(key);
            }
        }

        segments
            .into_iter()
            .map(|s| match s {
                Segment::Text(text) | Segment::Markup(text) => text,
            })
            .collect()
    }

    fn link_first(&self, entry: &LinkerEntry, segments: &mut Vec<Segment>) -> bool {
        for pattern in &entry.patterns {
            let hit = segments.iter().enumerate().find_map(|(idx, segment)| match segment {
                Segment::Text(text) => pattern.find(text).map(|m| (idx, m.start(), m.end())),
                Segment::Markup(_) => None,
            });

            if let Some((idx, start, end)) = hit {
                let Segment::Text(text) = &segments[idx] else {
                    continue;
                };
                let before = text[..start].to_string();
                let after = text[end..].to_string();
                let anchor = self.anchor(&entry.term, &text[start..end]);

                let replacement = [
                    Segment::Text(before),
                    Segment::Markup(anchor),
                    Segment::Text(after),
                ];
                segments.splice(idx..=idx, replacement);
                return true;
            }
        }
        false
    }

    fn anchor(&self, term: &GlossaryTerm, matched: &str) -> String {
        let title = if term.definition.is_empty() {
            format!("View definition of {}", term.term)
        } else {
            term.definition.clone()
        };
        format!(
            "<a href=\"{}/{}/\" class=\"glossary-term\" data-term=\"{}\" title=\"{}\">{}</a>",
            self.docs_prefix,
            term.path,
            html_escape(&term.term),
            html_escape(&title),
            matched
        )
    }
}

/// Link glossary terms in `html` under the default `/docs` prefix
pub fn link_terms(html: &str, terms: &[GlossaryTerm], current_path: &str) -> String {
    GlossaryLinker::new(terms.to_vec(), "/docs").link(html, current_path)
}

/// Process-wide glossary cache
///
/// The first request scans the glossary directory and compiles a
/// [`GlossaryLinker`]; later requests share it until [`invalidate`] is
/// called. Failed scans are not cached.
///
/// [`invalidate`]: GlossaryCache::invalidate
pub struct GlossaryCache {
    content_root: PathBuf,
    glossary_dir: String,
    docs_prefix: String,
    linker: RwLock<Option<Arc<GlossaryLinker>>>,
}

impl GlossaryCache {
    pub fn new(content_root: PathBuf, glossary_dir: &str, docs_prefix: &str) -> Self {
        Self {
            content_root,
            glossary_dir: glossary_dir.to_string(),
            docs_prefix: docs_prefix.to_string(),
            linker: RwLock::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.content_dir(),
            &config.glossary.dir,
            &config.normalized_docs_prefix(),
        )
    }

    /// Shared linker, scanning on first use
    pub fn linker(&self) -> Result<Arc<GlossaryLinker>, GlossaryError> {
        if let Some(linker) = self.linker.read().as_ref() {
            return Ok(Arc::clone(linker));
        }

        let mut slot = self.linker.write();
        if let Some(linker) = slot.as_ref() {
            return Ok(Arc::clone(linker));
        }
        let terms = scan_glossary_terms(&self.content_root, &self.glossary_dir)?;
        let linker = Arc::new(GlossaryLinker::new(terms, &self.docs_prefix));
        *slot = Some(Arc::clone(&linker));
        Ok(linker)
    }

    pub fn terms(&self) -> Result<Vec<GlossaryTerm>, GlossaryError> {
        Ok(self.linker()?.terms().cloned().collect())
    }

    pub fn is_loaded(&self) -> bool {
        self.linker.read().is_some()
    }

    /// Drop the cached terms; the next request rescans
    pub fn invalidate(&self) {
        *self.linker.write() = None;
        tracing::debug!("Glossary cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn term(name: &str, aliases: &[&str], path: &str) -> GlossaryTerm {
        GlossaryTerm {
            term: name.to_string(),
            definition: format!("About {}", name),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            path: path.to_string(),
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_scan_terms() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "glossary/docker.md",
            "---\ntitle: Docker\nglossary: true\ndefinition: Containers\naliases: [Docker Engine]\n---\n",
        );
        write(
            dir.path(),
            "glossary/kubernetes/index.md",
            "---\ntitle: Kubernetes\nglossary: true\n---\n",
        );
        write(dir.path(), "glossary/notes.md", "---\ntitle: Notes\n---\n");
        write(dir.path(), "glossary/untitled.md", "---\nglossary: true\n---\n");
        write(
            dir.path(),
            "glossary/_draft.md",
            "---\ntitle: Draft\nglossary: true\n---\n",
        );

        let terms = scan_glossary_terms(dir.path(), "glossary").unwrap();
        let names: Vec<_> = terms.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(names, vec!["Kubernetes", "Docker"]);

        assert_eq!(terms[0].path, "glossary/kubernetes");
        assert_eq!(terms[0].definition, "");
        assert_eq!(
            terms[1].aliases,
            vec!["Docker", "docker", "Docker Engine", "docker engine"]
        );
        assert_eq!(terms[1].path, "glossary/docker");
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        assert!(scan_glossary_terms(dir.path(), "glossary").unwrap().is_empty());
    }

    #[test]
    fn test_links_first_occurrence_only() {
        let terms = vec![term("Docker", &["Docker", "docker"], "glossary/docker")];
        let out = link_terms("<p>Docker runs docker images.</p>", &terms, "guides/intro");
        assert_eq!(
            out,
            "<p><a href=\"/docs/glossary/docker/\" class=\"glossary-term\" data-term=\"Docker\" \
             title=\"About Docker\">Docker</a> runs docker images.</p>"
        );
    }

    #[test]
    fn test_keeps_matched_casing_and_word_boundaries() {
        let terms = vec![term("API", &["API", "api"], "glossary/api")];
        let out = link_terms("<p>rapid apis, then the api</p>", &terms, "x");
        assert_eq!(out.matches("glossary-term").count(), 1);
        assert!(out.contains(">api</a></p>"));
    }

    #[test]
    fn test_skips_own_page() {
        let terms = vec![term("Docker", &["Docker"], "glossary/docker")];
        let html = "<p>Docker</p>";
        assert_eq!(link_terms(html, &terms, "glossary/docker"), html);
        assert_eq!(link_terms(html, &terms, "/glossary/docker/"), html);
    }

    #[test]
    fn test_short_aliases_never_link() {
        let terms = vec![term("Go", &["Go", "go"], "glossary/go")];
        let html = "<p>Go is fun, go try it</p>";
        assert_eq!(link_terms(html, &terms, "x"), html);
    }

    #[test]
    fn test_protected_regions() {
        let terms = vec![term("Docker", &["Docker"], "glossary/docker")];
        let html = concat!(
            "<h2 id=\"docker\">Docker</h2>",
            "<pre><code>docker run</code></pre>",
            "<p><code>Docker</code> and <a href=\"/x\">Docker</a></p>",
            "<div class=\"code-block-header\"><span>docker</span></div>",
        );
        assert_eq!(link_terms(html, &terms, "x"), html);
    }

    #[test]
    fn test_attributes_are_not_matched() {
        let terms = vec![term("Docker", &["Docker"], "glossary/docker")];
        let html = "<img alt=\"Docker\" src=\"docker.png\"><p>plain</p>";
        assert_eq!(link_terms(html, &terms, "x"), html);
    }

    #[test]
    fn test_longer_terms_win() {
        let terms = vec![
            term("Docker Compose", &["Docker Compose"], "glossary/docker-compose"),
            term("Docker", &["Docker"], "glossary/docker"),
        ];
        let out = link_terms("<p>Use Docker Compose</p>", &terms, "x");
        assert!(out.contains("data-term=\"Docker Compose\""));
        assert!(!out.contains("data-term=\"Docker\""));
    }

    #[test]
    fn test_linking_is_idempotent() {
        let terms = vec![
            term("Docker", &["Docker", "docker"], "glossary/docker"),
            term("Kubernetes", &["Kubernetes"], "glossary/kubernetes"),
        ];
        let once = link_terms("<p>Docker on Kubernetes, docker again</p>", &terms, "x");
        let twice = link_terms(&once, &terms, "x");
        assert_eq!(once, twice);
        assert_eq!(once.matches("glossary-term").count(), 2);
    }

    #[test]
    fn test_entities_are_not_matched() {
        let terms = vec![term("Ampere", &["amp"], "glossary/amp")];
        let html = "<p>this &amp; that</p>";
        assert_eq!(link_terms(html, &terms, "x"), html);
    }

    #[test]
    fn test_cache_invalidation() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "glossary/docker.md",
            "---\ntitle: Docker\nglossary: true\n---\n",
        );

        let cache = GlossaryCache::new(dir.path().to_path_buf(), "glossary", "/docs");
        assert!(!cache.is_loaded());
        assert_eq!(cache.terms().unwrap().len(), 1);
        assert!(cache.is_loaded());

        write(
            dir.path(),
            "glossary/podman.md",
            "---\ntitle: Podman\nglossary: true\n---\n",
        );
        assert_eq!(cache.terms().unwrap().len(), 1);

        cache.invalidate();
        assert!(!cache.is_loaded());
        assert_eq!(cache.terms().unwrap().len(), 2);
    }
}
