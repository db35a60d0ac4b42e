//! Obsidian-flavoured source rewriting applied before markdown parsing.
//!
//! Each rule is an independent string-to-string rewrite. The rules run in a
//! fixed order (see [`RewritePipeline::standard`]) and never see the inside
//! of fenced or indented code blocks; the pipeline re-splits code between
//! rules so a block revealed by one rule is protected from the next.
//!
//! Link, embed and hashtag rules also leave inline code spans and raw HTML
//! tags alone.

use super::split_code_blocks;
use crate::slug::wiki_slug;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Where the document being rewritten lives
#[derive(Debug, Clone, Copy)]
pub struct RewriteContext<'a> {
    /// Route path of the document ("guides/setup")
    pub route_path: &'a str,
    /// URL prefix links are generated under ("/docs")
    pub docs_prefix: &'a str,
}

impl<'a> RewriteContext<'a> {
    pub fn new(route_path: &'a str, docs_prefix: &'a str) -> Self {
        Self {
            route_path,
            docs_prefix,
        }
    }

    /// Directory of the current document ("guides" for "guides/setup")
    pub fn current_dir(&self) -> &'a str {
        match self.route_path.trim_matches('/').rsplit_once('/') {
            Some((dir, _)) => dir,
            None => "",
        }
    }

    fn href(&self, route: &str) -> String {
        format!("{}/{}", self.docs_prefix, route)
    }
}

/// One source-to-source rewrite
pub trait RewriteRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, source: &str, ctx: &RewriteContext<'_>) -> String;
}

/// Ordered list of rewrite rules
pub struct RewritePipeline {
    rules: Vec<Box<dyn RewriteRule>>,
}

impl RewritePipeline {
    pub fn new(rules: Vec<Box<dyn RewriteRule>>) -> Self {
        Self { rules }
    }

    /// The standard rule order
    ///
    /// 1. callouts: turns `>` blocks into containers whose body is plain
    ///    markdown again, so every later rule also reaches callout bodies
    /// 2. embeds: `![[x]]` must go before the link rules, which would
    ///    otherwise consume its `[[x]]` part
    /// 3. relative wiki links (`./`, `../`)
    /// 4. bare wiki links, which exclude `/` and `.` and so never touch 3
    /// 5. hashtags, last, once no `[[...]]` syntax remains
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(CalloutRule),
            Box::new(EmbedRule),
            Box::new(RelativeWikiLinkRule),
            Box::new(BareWikiLinkRule),
            Box::new(HashtagRule),
        ])
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn apply(&self, source: &str, ctx: &RewriteContext<'_>) -> String {
        let mut current = source.to_string();
        for rule in &self.rules {
            let mut next = String::with_capacity(current.len());
            for segment in split_code_blocks(&current) {
                if segment.is_code {
                    next.push_str(segment.text);
                } else {
                    next.push_str(&rule.apply(segment.text, ctx));
                }
            }
            current = next;
        }
        current
    }
}

impl Default for RewritePipeline {
    fn default() -> Self {
        Self::standard()
    }
}

/// Inline code spans and raw HTML tags, matched first and kept verbatim
const GUARD: &str = r"(?P<guard>``[^`]*``|`[^`\n]*`|<[A-Za-z/!][^>\n]*>)";

fn guarded(flags: &str, pattern: &str) -> Regex {
    Regex::new(&format!("{}{}|{}", flags, GUARD, pattern)).unwrap()
}

fn replace_guarded<F>(re: &Regex, source: &str, mut rewrite: F) -> String
where
    F: FnMut(&Captures<'_>) -> String,
{
    re.replace_all(source, |caps: &Captures<'_>| match caps.name("guard") {
        Some(guard) => guard.as_str().to_string(),
        None => rewrite(caps),
    })
    .into_owned()
}

/// Markdown link, using an angle-bracket destination when it holds spaces
fn markdown_link(text: &str, href: &str) -> String {
    if href.chars().any(char::is_whitespace) {
        format!("[{}](<{}>)", text, href)
    } else {
        format!("[{}]({})", text, href)
    }
}

// ---- embeds ----

static EMBED: Lazy<Regex> = Lazy::new(|| guarded("", r"!\[\[(?P<target>[^\]]+)\]\]"));

/// `![[file]]` becomes the placeholder `*[Embedded: file]*`
///
/// No content is pulled in. After this rule no `![[` sequence remains
/// outside code.
pub struct EmbedRule;

impl RewriteRule for EmbedRule {
    fn name(&self) -> &'static str {
        "embed"
    }

    fn apply(&self, source: &str, _ctx: &RewriteContext<'_>) -> String {
        replace_guarded(&EMBED, source, |caps| {
            format!("*[Embedded: {}]*", &caps["target"])
        })
    }
}

// ---- wiki links ----

static RELATIVE_LINK: Lazy<Regex> = Lazy::new(|| {
    guarded(
        "",
        r"\[\[(?P<target>\.\.?/[^\]|]+)(?:\|(?P<text>[^\]]+))?\]\]",
    )
});

static BARE_LINK: Lazy<Regex> = Lazy::new(|| {
    guarded("", r"\[\[(?P<target>[^\]|/.]+)(?:\|(?P<text>[^\]]+))?\]\]")
});

/// `[[./path]]`, `[[../path|Text]]` and friends become root-relative links
///
/// The target resolves against the document's own directory; `.md` and a
/// trailing `/index` are dropped. Without display text the last path
/// segment is used.
pub struct RelativeWikiLinkRule;

impl RewriteRule for RelativeWikiLinkRule {
    fn name(&self) -> &'static str {
        "relative-wiki-link"
    }

    fn apply(&self, source: &str, ctx: &RewriteContext<'_>) -> String {
        replace_guarded(&RELATIVE_LINK, source, |caps| {
            let target = clean_link_path(caps["target"].trim());
            let resolved = resolve_relative(ctx.current_dir(), &target);
            let text = match caps.name("text") {
                Some(text) => text.as_str().trim().to_string(),
                None => last_segment(&target).to_string(),
            };
            markdown_link(&text, &ctx.href(&resolved))
        })
    }
}

/// `[[Term]]` and `[[Term|Text]]` become `/docs/{slug}` links
///
/// Targets holding `/` or `.` are left for other rules (or left alone).
pub struct BareWikiLinkRule;

impl RewriteRule for BareWikiLinkRule {
    fn name(&self) -> &'static str {
        "bare-wiki-link"
    }

    fn apply(&self, source: &str, ctx: &RewriteContext<'_>) -> String {
        replace_guarded(&BARE_LINK, source, |caps| {
            let target = &caps["target"];
            let text = caps
                .name("text")
                .map(|t| t.as_str().trim())
                .unwrap_or_else(|| target.trim());
            markdown_link(text, &ctx.href(&wiki_slug(target)))
        })
    }
}

fn clean_link_path(path: &str) -> String {
    let path = path.strip_suffix(".md").unwrap_or(path);
    let path = path.strip_suffix("/index").unwrap_or(path);
    path.to_string()
}

fn last_segment(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .find(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or(path)
}

/// Join `relative` onto `base_dir`, folding `.` and `..` segments
///
/// `..` above the content root stays at the root.
pub fn resolve_relative(base_dir: &str, relative: &str) -> String {
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for part in relative.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

// ---- callouts ----

static CALLOUT_HEAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^>\s*\[!(?P<kind>\w+)\][+-]?[ \t]*(?P<title>.*?)\s*$").unwrap());

static CALLOUT_BODY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^> ?").unwrap());

/// Callout types with dedicated styling
const CALLOUT_KINDS: &[(&str, &str)] = &[
    ("note", "📝"),
    ("tip", "💡"),
    ("warning", "⚠️"),
    ("danger", "🚨"),
    ("info", "📌"),
    ("example", "📋"),
    ("question", "❓"),
    ("quote", "💬"),
    ("success", "✅"),
    ("failure", "❌"),
    ("bug", "🐛"),
];

/// `> [!type] title` plus its `>` continuation lines becomes a container
///
/// The output is a `div.callout.callout-{type}` with `data-callout="{type}"`;
/// the title and body stay markdown, separated from the wrapping tags by
/// blank lines so the parser treats them as nested content. Unknown types
/// get the `note` styling but keep their own name as default title.
pub struct CalloutRule;

impl RewriteRule for CalloutRule {
    fn name(&self) -> &'static str {
        "callout"
    }

    fn apply(&self, source: &str, _ctx: &RewriteContext<'_>) -> String {
        if !source.contains("[!") {
            return source.to_string();
        }

        let lines: Vec<&str> = source.split_inclusive('\n').collect();
        let mut out = String::with_capacity(source.len());
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i].trim_end_matches(['\n', '\r']);
            let Some(head) = CALLOUT_HEAD.captures(line) else {
                out.push_str(lines[i]);
                i += 1;
                continue;
            };

            let declared = head["kind"].to_lowercase();
            let title = head["title"].to_string();
            i += 1;

            let mut body = Vec::new();
            while i < lines.len() && lines[i].starts_with('>') {
                let line = lines[i].trim_end_matches(['\n', '\r']);
                body.push(CALLOUT_BODY.replace(line, "").into_owned());
                i += 1;
            }

            out.push_str(&render_callout(&declared, &title, &body.join("\n")));
        }

        out
    }
}

fn render_callout(declared: &str, title: &str, body: &str) -> String {
    let (kind, icon) = CALLOUT_KINDS
        .iter()
        .find(|(kind, _)| *kind == declared)
        .copied()
        .unwrap_or(CALLOUT_KINDS[0]);

    let title = if title.is_empty() {
        capitalize(declared)
    } else {
        title.to_string()
    };

    format!(
        "<div class=\"callout callout-{kind}\" data-callout=\"{kind}\">\n\
         <div class=\"callout-title\">\n\n\
         <span class=\"callout-icon\">{icon}</span> {title}\n\n\
         </div>\n\
         <div class=\"callout-content\">\n\n\
         {body}\n\n\
         </div>\n\
         </div>\n\n"
    )
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ---- hashtags ----

static HASHTAG: Lazy<Regex> =
    Lazy::new(|| guarded("(?m)", r"(?P<lead>^|\s)#(?P<tag>[A-Za-z][A-Za-z0-9_-]*)"));

/// `#word` at a word start becomes the inline code span `` `#word` ``
///
/// Only matches when the `#` starts the line or follows whitespace, so
/// headings (`## x`), anchors (`(#x)`) and URLs are untouched.
pub struct HashtagRule;

impl RewriteRule for HashtagRule {
    fn name(&self) -> &'static str {
        "hashtag"
    }

    fn apply(&self, source: &str, _ctx: &RewriteContext<'_>) -> String {
        replace_guarded(&HASHTAG, source, |caps| {
            format!("{}`#{}`", &caps["lead"], &caps["tag"])
        })
    }
}
