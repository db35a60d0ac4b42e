//! Markdown rendering pipeline.
//!
//! Source first goes through the [`rewrite`] rules, then pulldown-cmark
//! parses it and a chain of event transformers runs: heading ids and
//! anchors, bare URL autolinking, code highlighting.

pub mod autolink;
pub mod highlight;
pub mod metrics;
pub mod rewrite;

use crate::models::TocItem;
use crate::slug::{slugify, SlugAllocator};
use pulldown_cmark::{
    html, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, TextMergeStream,
};

pub use autolink::AutolinkTransformer;
pub use highlight::HighlightTransformer;
pub use metrics::{reading_time, word_count};
pub use rewrite::{RewriteContext, RewritePipeline, RewriteRule};

/// Output of one markdown render
#[derive(Debug, Clone, Default)]
pub struct RenderedMarkdown {
    pub html: String,
    /// H2 to H4 headings in document order
    pub toc: Vec<TocItem>,
}

/// Markdown processor with the site's extensions
pub struct MarkdownProcessor {
    options: Options,
    highlighter: HighlightTransformer,
}

impl MarkdownProcessor {
    pub fn new(theme: &str) -> Self {
        Self {
            options: parser_options(),
            highlighter: HighlightTransformer::new(theme),
        }
    }

    /// Render already-rewritten markdown to HTML
    pub fn render(&self, markdown: &str) -> RenderedMarkdown {
        let parser = TextMergeStream::new(Parser::new_ext(markdown, self.options));
        let events: Vec<Event> = parser.collect();

        let headings = collect_headings(&events);
        let events = attach_heading_anchors(events, &headings);
        let events = AutolinkTransformer::new().transform(events);
        let events = self.highlighter.transform(events);

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        let toc = headings
            .into_iter()
            .filter_map(|h| {
                h.id.map(|id| TocItem {
                    id,
                    text: h.text,
                    level: h.level as u8,
                })
            })
            .collect();

        RenderedMarkdown {
            html: html_output,
            toc,
        }
    }
}

impl Default for MarkdownProcessor {
    fn default() -> Self {
        Self::new(highlight::DEFAULT_THEME)
    }
}

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Text of the first top-level H1 in markdown source
///
/// Headings nested in block quotes, list items or footnotes don't count,
/// so a `# Heading` inside a callout never becomes the page title.
pub fn first_h1(markdown: &str) -> Option<String> {
    let mut nesting = 0usize;
    let mut current: Option<String> = None;

    for event in TextMergeStream::new(Parser::new_ext(markdown, parser_options())) {
        match event {
            Event::Start(Tag::BlockQuote(_) | Tag::Item | Tag::FootnoteDefinition(_)) => {
                nesting += 1;
            }
            Event::End(TagEnd::BlockQuote(_) | TagEnd::Item | TagEnd::FootnoteDefinition) => {
                nesting = nesting.saturating_sub(1);
            }
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) if nesting == 0 => current = Some(String::new()),
            Event::Text(text) | Event::Code(text) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&text);
                }
            }
            Event::End(TagEnd::Heading(HeadingLevel::H1)) => {
                if let Some(text) = current.take() {
                    let text = text.trim();
                    if !text.is_empty() {
                        return Some(text.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    None
}

struct Heading {
    level: HeadingLevel,
    text: String,
    /// Anchor id, only for TOC levels
    id: Option<String>,
}

fn is_toc_level(level: HeadingLevel) -> bool {
    matches!(level, HeadingLevel::H2 | HeadingLevel::H3 | HeadingLevel::H4)
}

fn collect_headings(events: &[Event]) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut slugs = SlugAllocator::new();
    let mut current: Option<(HeadingLevel, String)> = None;

    for event in events {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current = Some((*level, String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, ref mut buf)) = current {
                    buf.push_str(text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, text)) = current.take() {
                    let text = text.trim().to_string();
                    let id = is_toc_level(level).then(|| {
                        let base = slugify(&text);
                        slugs.allocate(if base.is_empty() { "section" } else { &base })
                    });
                    headings.push(Heading { level, text, id });
                }
            }
            _ => {}
        }
    }

    headings
}

/// Set heading ids and prepend a `#` anchor to TOC-level headings
fn attach_heading_anchors<'a>(events: Vec<Event<'a>>, headings: &[Heading]) -> Vec<Event<'a>> {
    let mut heading_iter = headings.iter();
    let mut result = Vec::with_capacity(events.len() + headings.len());

    for event in events {
        match event {
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => {
                let assigned = heading_iter.next().and_then(|h| h.id.clone());
                match assigned {
                    Some(slug) => {
                        let anchor = format!(
                            "<a class=\"heading-anchor\" href=\"#{}\" aria-hidden=\"true\">#</a>",
                            html_escape(&slug)
                        );
                        result.push(Event::Start(Tag::Heading {
                            level,
                            id: Some(CowStr::from(slug)),
                            classes,
                            attrs,
                        }));
                        result.push(Event::InlineHtml(CowStr::from(anchor)));
                    }
                    None => result.push(Event::Start(Tag::Heading {
                        level,
                        id,
                        classes,
                        attrs,
                    })),
                }
            }
            other => result.push(other),
        }
    }

    result
}

/// A slice of markdown source, either a code block or prose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SourceSegment<'a> {
    pub is_code: bool,
    pub text: &'a str,
}

/// Split markdown source into code-block and prose segments
///
/// Fenced and indented code blocks both count as code. Code nested in a
/// block quote stays in the surrounding prose so callouts are seen whole;
/// once the callout rule unwraps them it is split out on the next pass.
/// An unterminated fence runs to the end of the input.
pub(crate) fn split_code_blocks(source: &str) -> Vec<SourceSegment<'_>> {
    let mut segments = Vec::new();
    let mut cursor = 0;
    let mut quote_depth = 0usize;

    for (event, range) in Parser::new_ext(source, parser_options()).into_offset_iter() {
        match event {
            Event::Start(Tag::BlockQuote(_)) => quote_depth += 1,
            Event::End(TagEnd::BlockQuote(_)) => quote_depth = quote_depth.saturating_sub(1),
            Event::Start(Tag::CodeBlock(_)) if quote_depth == 0 && range.start >= cursor => {
                if range.start > cursor {
                    segments.push(SourceSegment {
                        is_code: false,
                        text: &source[cursor..range.start],
                    });
                }
                segments.push(SourceSegment {
                    is_code: true,
                    text: &source[range.clone()],
                });
                cursor = range.end;
            }
            _ => {}
        }
    }

    if cursor < source.len() {
        segments.push(SourceSegment {
            is_code: false,
            text: &source[cursor..],
        });
    }

    segments
}

pub(crate) fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(md: &str) -> RenderedMarkdown {
        MarkdownProcessor::default().render(md)
    }

    #[test]
    fn test_basic_markdown() {
        let out = render("# Hello World\n\nThis is a **test**.");
        assert!(out.html.contains("<h1>Hello World</h1>"));
        assert!(out.html.contains("<strong>test</strong>"));
    }

    #[test]
    fn test_tables() {
        let md = "| Header 1 | Header 2 |\n|----------|----------|\n| Cell 1   | Cell 2   |\n";
        let out = render(md);
        assert!(out.html.contains("<table>"));
        assert!(out.html.contains("<th>Header 1</th>"));
    }

    #[test]
    fn test_toc_levels_and_ids() {
        let out = render("# Title\n\n## Install\n\n### From `cargo`\n\n#### Deep\n\n##### Too deep\n");
        let toc: Vec<_> = out
            .toc
            .iter()
            .map(|t| (t.level, t.id.as_str(), t.text.as_str()))
            .collect();
        assert_eq!(
            toc,
            vec![
                (2, "install", "Install"),
                (3, "from-cargo", "From cargo"),
                (4, "deep", "Deep"),
            ]
        );
        assert!(out.html.contains("<h5>Too deep</h5>"));
    }

    #[test]
    fn test_duplicate_headings_get_unique_ids() {
        let out = render("## Usage\n\n## Usage\n\n## Usage\n");
        let ids: Vec<_> = out.toc.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["usage", "usage-1", "usage-2"]);
        for id in ids {
            assert!(out.html.contains(&format!("<h2 id=\"{}\">", id)));
        }
    }

    #[test]
    fn test_heading_anchor_is_prepended() {
        let out = render("## Setup\n");
        assert_eq!(
            out.html,
            "<h2 id=\"setup\"><a class=\"heading-anchor\" href=\"#setup\" aria-hidden=\"true\">#</a>Setup</h2>\n"
        );
    }

    #[test]
    fn test_first_h1_setext() {
        assert_eq!(first_h1("Intro\n=====\n\nBody\n\n# Second\n").as_deref(), Some("Intro"));
        assert!(render("Intro\n=====\n").toc.is_empty());
    }

    #[test]
    fn test_first_h1_skips_nested_headings() {
        let md = "> [!note]\n> # Inner\n\n- # In a list\n\n# Real `Title`\n";
        assert_eq!(first_h1(md).as_deref(), Some("Real Title"));
        assert_eq!(first_h1("```\n# not a heading\n```\n"), None);
    }

    #[test]
    fn test_code_block_is_wrapped() {
        let out = render("```rust\nfn main() {}\n```");
        assert!(out.html.contains("code-block-wrapper"));
        assert!(out.html.contains("main"));
    }

    fn code_texts(source: &str) -> Vec<&str> {
        split_code_blocks(source)
            .into_iter()
            .filter(|s| s.is_code)
            .map(|s| s.text.trim_end())
            .collect()
    }

    #[test]
    fn test_split_code_blocks() {
        let src = "before\n```rust\ncode\n```\nafter\n~~~~\nopen";
        let segments = split_code_blocks(src);
        let joined: String = segments.iter().map(|s| s.text).collect();
        assert_eq!(joined, src);
        assert_eq!(segments[0], SourceSegment { is_code: false, text: "before\n" });
        assert_eq!(code_texts(src), vec!["```rust\ncode\n```", "~~~~\nopen"]);
        assert!(segments.iter().any(|s| !s.is_code && s.text.contains("after")));
    }

    #[test]
    fn test_fence_needs_matching_close() {
        let segments = split_code_blocks("````\n```\nstill code\n````\ntext");
        assert_eq!(segments.len(), 2);
        assert!(segments[0].is_code);
        assert!(segments[0].text.contains("still code"));
        assert_eq!(segments[1].text.trim(), "text");
    }

    #[test]
    fn test_inline_backticks_are_not_fences() {
        let segments = split_code_blocks("```not a fence``` here\n");
        assert_eq!(segments.len(), 1);
        assert!(!segments[0].is_code);
    }

    #[test]
    fn test_indented_code_is_code() {
        let src = "Example:\n\n    #include <stdio.h>\n    x = [[Page]]\n\nAfter";
        let code = code_texts(src);
        assert_eq!(code.len(), 1);
        assert!(code[0].contains("#include <stdio.h>"));
        assert!(code[0].contains("x = [[Page]]"));
    }

    #[test]
    fn test_list_continuation_is_not_code() {
        assert!(code_texts("- item\n\n    more of the item\n").is_empty());
    }

    #[test]
    fn test_code_in_block_quote_stays_with_quote() {
        assert!(code_texts("> [!tip]\n> ```\n> #x\n> ```\n").is_empty());
    }
}
