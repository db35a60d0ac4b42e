//! Slug generation and display-name formatting.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Convert heading text to an anchor slug
///
/// Rules:
/// - Lowercase
/// - Remove characters other than word characters, hyphens and whitespace
/// - Replace each whitespace run with a single hyphen
///
/// # Examples
///
/// ```
/// use docsite_core::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("Rust & Safety"), "rust-safety");
/// assert_eq!(slugify("snake_case stays"), "snake_case-stays");
/// ```
pub fn slugify(input: &str) -> String {
    let lowercased = input.trim().to_lowercase();

    let cleaned = lowercased
        .graphemes(true)
        .filter(|g| {
            g.chars()
                .next()
                .map(|c| c.is_alphanumeric() || c == '_' || c == '-' || c.is_whitespace())
                .unwrap_or(false)
        })
        .collect::<String>();

    WHITESPACE_RUN
        .replace_all(cleaned.trim(), "-")
        .into_owned()
}

/// Slug for a bare wiki link target: lowercase, whitespace runs become hyphens
///
/// ```
/// use docsite_core::slug::wiki_slug;
///
/// assert_eq!(wiki_slug("Getting Started"), "getting-started");
/// ```
pub fn wiki_slug(input: &str) -> String {
    WHITESPACE_RUN
        .replace_all(input.trim(), "-")
        .to_lowercase()
}

/// Turn a kebab/snake-case filename into a Title Case display name
///
/// A trailing `.md` extension is dropped.
///
/// ```
/// use docsite_core::slug::format_name;
///
/// assert_eq!(format_name("getting-started.md"), "Getting Started");
/// assert_eq!(format_name("api_reference"), "Api Reference");
/// ```
pub fn format_name(name: &str) -> String {
    let base = name.strip_suffix(".md").unwrap_or(name);
    let spaced = base.replace(['-', '_'], " ");

    let mut out = String::with_capacity(spaced.len());
    let mut prev_is_word = false;
    for c in spaced.chars() {
        let is_word = c.is_alphanumeric();
        if is_word && !prev_is_word {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        prev_is_word = is_word;
    }
    out
}

/// Hands out unique slugs within one document
///
/// The first occurrence keeps its slug; later duplicates get `-1`, `-2`, ...
#[derive(Debug, Default)]
pub struct SlugAllocator {
    used: HashSet<String>,
    counters: HashMap<String, usize>,
}

impl SlugAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, base: &str) -> String {
        if self.used.insert(base.to_string()) {
            return base.to_string();
        }

        let counter = self.counters.entry(base.to_string()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{}-{}", base, counter);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Rust Programming"), "rust-programming");
    }

    #[test]
    fn test_special_characters() {
        assert_eq!(slugify("Rust & Safety"), "rust-safety");
        assert_eq!(slugify("C++ Programming"), "c-programming");
        assert_eq!(slugify("Node.js Tips"), "nodejs-tips");
        assert_eq!(slugify("What's new?"), "whats-new");
    }

    #[test]
    fn test_hyphens_are_kept() {
        assert_eq!(slugify("Step-by-step Guide"), "step-by-step-guide");
        assert_eq!(slugify("A - B"), "a---b");
    }

    #[test]
    fn test_unicode() {
        assert_eq!(slugify("Café Menu"), "café-menu");
        assert_eq!(slugify("Налаштування"), "налаштування");
    }

    #[test]
    fn test_multiple_spaces() {
        assert_eq!(slugify("Hello    World"), "hello-world");
        assert_eq!(slugify("  Padded Title  "), "padded-title");
    }

    #[test]
    fn test_empty_and_special_only() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_wiki_slug() {
        assert_eq!(wiki_slug("Docker Compose"), "docker-compose");
        assert_eq!(wiki_slug("Kubernetes"), "kubernetes");
        assert_eq!(wiki_slug("  Spaced   Out "), "spaced-out");
    }

    #[test]
    fn test_format_name() {
        assert_eq!(format_name("getting-started.md"), "Getting Started");
        assert_eq!(format_name("snake_case_name"), "Snake Case Name");
        assert_eq!(format_name("already Title"), "Already Title");
        assert_eq!(format_name("v2-release"), "V2 Release");
    }

    #[test]
    fn test_slug_allocator() {
        let mut slugs = SlugAllocator::new();
        assert_eq!(slugs.allocate("setup"), "setup");
        assert_eq!(slugs.allocate("setup"), "setup-1");
        assert_eq!(slugs.allocate("setup"), "setup-2");
        assert_eq!(slugs.allocate("usage"), "usage");
    }

    #[test]
    fn test_slug_allocator_skips_taken_suffix() {
        let mut slugs = SlugAllocator::new();
        assert_eq!(slugs.allocate("faq-1"), "faq-1");
        assert_eq!(slugs.allocate("faq"), "faq");
        assert_eq!(slugs.allocate("faq"), "faq-2");
    }
}
