//! Bare URL autolinking.
//!
//! CommonMark only links `<https://...>`; documents routinely contain bare
//! URLs, so plain text runs are scanned and URLs wrapped in link events.

use once_cell::sync::Lazy;
use pulldown_cmark::{CowStr, Event, LinkType, Tag, TagEnd};
use regex::Regex;

static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"https?://[^\s<>\[\]()"'`]+"#).unwrap());

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?'];

/// Wraps bare `http(s)://` URLs in text events with links
///
/// Text inside links, images and code blocks is left alone, as is text
/// between a raw `<a>` tag and its `</a>`. Expects merged text events.
pub struct AutolinkTransformer;

impl AutolinkTransformer {
    pub fn new() -> Self {
        Self
    }

    pub fn transform<'a>(&self, events: Vec<Event<'a>>) -> Vec<Event<'a>> {
        let mut result = Vec::with_capacity(events.len());
        let mut link_depth = 0usize;
        let mut in_code_block = false;
        let mut in_raw_anchor = false;

        for event in events {
            match event {
                Event::Start(Tag::Link { .. } | Tag::Image { .. }) => {
                    link_depth += 1;
                    result.push(event);
                }
                Event::End(TagEnd::Link | TagEnd::Image) => {
                    link_depth = link_depth.saturating_sub(1);
                    result.push(event);
                }
                Event::Start(Tag::CodeBlock(_)) => {
                    in_code_block = true;
                    result.push(event);
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code_block = false;
                    result.push(event);
                }
                Event::InlineHtml(ref html) => {
                    let tag = html.trim_start().to_ascii_lowercase();
                    if tag.starts_with("<a ") || tag.starts_with("<a>") {
                        in_raw_anchor = true;
                    } else if tag.starts_with("</a") {
                        in_raw_anchor = false;
                    }
                    result.push(event);
                }
                Event::Text(text)
                    if link_depth == 0
                        && !in_code_block
                        && !in_raw_anchor
                        && text.contains("://") =>
                {
                    link_text(text, &mut result);
                }
                other => result.push(other),
            }
        }

        result
    }
}

impl Default for AutolinkTransformer {
    fn default() -> Self {
        Self::new()
    }
}

fn link_text<'a>(text: CowStr<'a>, out: &mut Vec<Event<'a>>) {
    let mut last = 0;
    for m in URL.find_iter(&text) {
        let url = m.as_str().trim_end_matches(TRAILING_PUNCTUATION);
        if url.len() <= "https://".len() {
            continue;
        }
        let start = m.start();
        let end = start + url.len();

        if start > last {
            out.push(Event::Text(CowStr::from(text[last..start].to_string())));
        }
        out.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: CowStr::from(url.to_string()),
            title: CowStr::Borrowed(""),
            id: CowStr::Borrowed(""),
        }));
        out.push(Event::Text(CowStr::from(url.to_string())));
        out.push(Event::End(TagEnd::Link));
        last = end;
    }

    if last == 0 {
        out.push(Event::Text(text));
    } else if last < text.len() {
        out.push(Event::Text(CowStr::from(text[last..].to_string())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulldown_cmark::{html, Parser, TextMergeStream};

    fn render(markdown: &str) -> String {
        let events: Vec<Event> = TextMergeStream::new(Parser::new(markdown)).collect();
        let events = AutolinkTransformer::new().transform(events);
        let mut out = String::new();
        html::push_html(&mut out, events.into_iter());
        out
    }

    #[test]
    fn test_bare_url_is_linked() {
        assert_eq!(
            render("See https://example.com/docs for more."),
            "<p>See <a href=\"https://example.com/docs\">https://example.com/docs</a> for more.</p>\n"
        );
    }

    #[test]
    fn test_trailing_punctuation_excluded() {
        let html = render("Visit http://example.org.");
        assert!(html.contains("<a href=\"http://example.org\">http://example.org</a>."));
    }

    #[test]
    fn test_existing_links_untouched() {
        let html = render("[site](https://example.com) and <https://example.com>");
        assert_eq!(html.matches("<a ").count(), 2);
    }

    #[test]
    fn test_code_untouched() {
        let html = render("`https://example.com`\n\n```\nhttps://example.com\n```\n");
        assert!(!html.contains("<a "));
    }

    #[test]
    fn test_raw_anchor_untouched() {
        let html = render("<a href=\"https://x.dev\">https://x.dev</a>");
        assert_eq!(html.matches("<a ").count(), 1);
    }
}
