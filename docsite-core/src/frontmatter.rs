//! Frontmatter parsing from markdown files.
//!
//! Frontmatter is an open key/value mapping; only a handful of keys
//! (`title`, `description`, `tags`, `glossary`, `definition`, `aliases`)
//! have typed accessors, everything else passes through untouched.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("Invalid YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Frontmatter must be a mapping, found {0}")]
    NotAMapping(&'static str),
}

static FRONTMATTER_REGEX: OnceLock<Regex> = OnceLock::new();
static LOOSE_BLOCK_REGEX: OnceLock<Regex> = OnceLock::new();

fn frontmatter_regex() -> &'static Regex {
    FRONTMATTER_REGEX.get_or_init(|| {
        Regex::new(r"(?s)^\x{feff}?---[ \t]*\r?\n(?:(.*?)\r?\n)?---[ \t]*(?:\r?\n|$)(.*)$")
            .unwrap()
    })
}

fn loose_block_regex() -> &'static Regex {
    LOOSE_BLOCK_REGEX.get_or_init(|| Regex::new(r"(?s)^\x{feff}?---.*?---\r?\n?").unwrap())
}

/// Document metadata parsed from the leading `---` block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frontmatter(Map<String, Value>);

impl Frontmatter {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn title(&self) -> Option<String> {
        self.get("title").and_then(scalar_string)
    }

    pub fn description(&self) -> Option<String> {
        self.get("description").and_then(scalar_string)
    }

    /// Declared tags; accepts a sequence or a comma-separated string
    pub fn tags(&self) -> Vec<String> {
        string_list(self.get("tags"), true)
    }

    /// Whether the file declares itself a glossary entry
    pub fn is_glossary(&self) -> bool {
        match self.get("glossary") {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    pub fn definition(&self) -> Option<String> {
        self.get("definition").and_then(scalar_string)
    }

    pub fn aliases(&self) -> Vec<String> {
        string_list(self.get("aliases"), false)
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn string_list(value: Option<&Value>, split_commas: bool) -> Vec<String> {
    let raw: Vec<String> = match value {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_string).collect(),
        Some(Value::String(s)) if split_commas => s.split(',').map(str::to_string).collect(),
        Some(other) => scalar_string(other).into_iter().collect(),
        None => Vec::new(),
    };
    raw.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse frontmatter from markdown content
///
/// Returns a tuple of (frontmatter, markdown_body). Tab characters inside
/// the frontmatter block are rewritten to two-space indents before YAML
/// parsing. If no frontmatter is present, returns empty frontmatter with
/// the full content as body.
///
/// # Example
///
/// ```
/// use docsite_core::frontmatter::parse_frontmatter;
///
/// let content = "---\ntitle: My Page\ntags: [a, b]\n---\n# Hello World\n";
///
/// let (fm, body) = parse_frontmatter(content).unwrap();
/// assert_eq!(fm.title().as_deref(), Some("My Page"));
/// assert_eq!(fm.tags(), vec!["a", "b"]);
/// assert!(body.trim().starts_with("# Hello World"));
/// ```
pub fn parse_frontmatter(content: &str) -> Result<(Frontmatter, String), FrontmatterError> {
    let Some(captures) = frontmatter_regex().captures(content) else {
        return Ok((Frontmatter::default(), content.to_string()));
    };

    let yaml = captures.get(1).map(|m| m.as_str()).unwrap_or("");
    let body = captures.get(2).map(|m| m.as_str()).unwrap_or("");

    let yaml = yaml.replace('\t', "  ");
    if yaml.trim().is_empty() {
        return Ok((Frontmatter::default(), body.to_string()));
    }

    let frontmatter = match serde_yaml::from_str::<serde_yaml::Value>(&yaml)? {
        serde_yaml::Value::Null => Frontmatter::default(),
        value @ serde_yaml::Value::Mapping(_) => {
            Frontmatter(serde_yaml::from_value::<Map<String, Value>>(value)?)
        }
        serde_yaml::Value::Sequence(_) => return Err(FrontmatterError::NotAMapping("sequence")),
        serde_yaml::Value::Tagged(_) => return Err(FrontmatterError::NotAMapping("tagged value")),
        _ => return Err(FrontmatterError::NotAMapping("scalar")),
    };

    Ok((frontmatter, body.to_string()))
}

/// Parse frontmatter, degrading instead of failing
///
/// Malformed frontmatter is logged, treated as empty, and the leading
/// `---...---` block is stripped from the body so the document still renders.
pub fn parse_frontmatter_lenient(content: &str, source: &str) -> (Frontmatter, String) {
    match parse_frontmatter(content) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Failed to parse frontmatter in {}: {}", source, e);
            (Frontmatter::default(), strip_frontmatter_block(content))
        }
    }
}

/// Remove a leading `---...---` block without interpreting it
pub fn strip_frontmatter_block(content: &str) -> String {
    loose_block_regex().replace(content, "").into_owned()
}
