//! Code block highlighting using syntect.
//!
//! Every code block is replaced with a `div.code-block-wrapper` holding a
//! header (language label plus copy button) and the `<pre><code>` body.

use super::html_escape;
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Tag, TagEnd};
use std::sync::OnceLock;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Color, Theme, ThemeSet};
use syntect::html::{styled_line_to_highlighted_html, IncludeBackground};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

/// Theme used when the configured one is not bundled
pub const DEFAULT_THEME: &str = "InspiredGitHub";

static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
static THEME_SET: OnceLock<ThemeSet> = OnceLock::new();

fn syntax_set() -> &'static SyntaxSet {
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn theme_set() -> &'static ThemeSet {
    THEME_SET.get_or_init(ThemeSet::load_defaults)
}

/// Whether `lang` names a bundled syntax
pub fn is_supported_language(lang: &str) -> bool {
    find_syntax(lang).is_some()
}

fn find_syntax(lang: &str) -> Option<&'static SyntaxReference> {
    let ss = syntax_set();
    ss.find_syntax_by_token(lang)
        .or_else(|| ss.find_syntax_by_extension(lang))
}

/// Replaces code block events with highlighted HTML
pub struct HighlightTransformer {
    theme: &'static Theme,
}

impl HighlightTransformer {
    pub fn new(theme_name: &str) -> Self {
        let themes = &theme_set().themes;
        let theme = match themes.get(theme_name) {
            Some(theme) => theme,
            None => {
                tracing::warn!(
                    "Unknown highlight theme {:?}, using {}",
                    theme_name,
                    DEFAULT_THEME
                );
                themes
                    .get(DEFAULT_THEME)
                    .or_else(|| themes.values().next())
                    .expect("syntect ships default themes")
            }
        };
        Self { theme }
    }

    pub fn transform<'a>(&self, events: Vec<Event<'a>>) -> Vec<Event<'a>> {
        let mut result = Vec::with_capacity(events.len());
        let mut block: Option<(Option<String>, String)> = None;

        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => fence_language(&info),
                        CodeBlockKind::Indented => None,
                    };
                    block = Some((lang, String::new()));
                }
                Event::Text(text) if block.is_some() => {
                    if let Some((_, code)) = block.as_mut() {
                        code.push_str(&text);
                    }
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some((lang, code)) = block.take() {
                        let html = self.render_block(&code, lang.as_deref());
                        result.push(Event::Html(CowStr::from(html)));
                    }
                }
                other => result.push(other),
            }
        }

        result
    }

    /// Render one code block, falling back to plain text on any failure
    pub fn render_block(&self, code: &str, lang: Option<&str>) -> String {
        let code = code.trim_end_matches('\n');
        let Some(lang) = lang else {
            return render_plain(code, None);
        };

        let syntax = match find_syntax(lang) {
            Some(syntax) => syntax,
            None => {
                tracing::debug!("No syntax for {:?}, highlighting as plain text", lang);
                syntax_set().find_syntax_plain_text()
            }
        };

        match self.highlight(code, syntax) {
            Ok(body) => {
                let background = self
                    .theme
                    .settings
                    .background
                    .map(css_color)
                    .unwrap_or_else(|| "#ffffff".to_string());
                format!(
                    "<div class=\"code-block-wrapper\" data-language=\"{lang}\">\
                     {header}\
                     <pre class=\"highlight\" style=\"background-color:{background};\">\
                     <code class=\"language-{lang}\">{body}</code></pre></div>\n",
                    lang = html_escape(lang),
                    header = header(lang),
                )
            }
            Err(e) => {
                tracing::warn!("Highlighting {} block failed: {}", lang, e);
                render_plain(code, Some(lang))
            }
        }
    }

    fn highlight(&self, code: &str, syntax: &SyntaxReference) -> Result<String, syntect::Error> {
        let ss = syntax_set();
        let mut highlighter = HighlightLines::new(syntax, self.theme);
        let mut html = String::with_capacity(code.len() * 2);
        for line in LinesWithEndings::from(code) {
            let regions = highlighter.highlight_line(line, ss)?;
            html.push_str(&styled_line_to_highlighted_html(
                &regions[..],
                IncludeBackground::No,
            )?);
        }
        Ok(html)
    }
}

impl Default for HighlightTransformer {
    fn default() -> Self {
        Self::new(DEFAULT_THEME)
    }
}

/// First word of a fence info string ("rust,ignore" -> "rust")
fn fence_language(info: &str) -> Option<String> {
    info.split(|c: char| c.is_whitespace() || c == ',' || c == '{')
        .next()
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
}

fn header(label: &str) -> String {
    format!(
        "<div class=\"code-block-header\"><span class=\"code-block-lang\">{}</span>\
         <button type=\"button\" class=\"code-copy-button\" aria-label=\"Copy code\">Copy</button></div>",
        html_escape(label)
    )
}

/// Unhighlighted block; `lang` is `None` for untagged blocks
fn render_plain(code: &str, lang: Option<&str>) -> String {
    let (attr, label) = match lang {
        Some(lang) => (format!(" data-language=\"{}\"", html_escape(lang)), lang),
        None => (String::new(), "code"),
    };
    format!(
        "<div class=\"code-block-wrapper code-block-plain\"{attr}>{header}<pre><code>{body}</code></pre></div>\n",
        header = header(label),
        body = html_escape(code),
    )
}

fn css_color(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}
