//! Configuration parsing and management.

use crate::access::RequiredRole;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// Main configuration struct matching the docsite.yml schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    /// URL prefix under which documents are served ("/docs")
    #[serde(default = "default_docs_prefix")]
    pub docs_prefix: String,

    #[serde(default)]
    pub glossary: GlossaryConfig,

    #[serde(default)]
    pub tree: TreeConfig,

    #[serde(default)]
    pub reading: ReadingConfig,

    #[serde(default)]
    pub highlight: HighlightConfig,

    #[serde(default)]
    pub access: AccessConfig,

    #[serde(default)]
    pub server: ServerConfig,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            paths: PathsConfig::default(),
            docs_prefix: default_docs_prefix(),
            glossary: GlossaryConfig::default(),
            tree: TreeConfig::default(),
            reading: ReadingConfig::default(),
            highlight: HighlightConfig::default(),
            access: AccessConfig::default(),
            server: ServerConfig::default(),
            config_path: None,
        }
    }
}

fn default_docs_prefix() -> String {
    String::from("/docs")
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_title")]
    pub title: String,
}

fn default_site_title() -> String {
    String::from("Docs")
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: default_site_title(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_content_dir")]
    pub content: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output: PathBuf,
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("content")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            content: default_content_dir(),
            output: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlossaryConfig {
    /// Folder (relative to the content root) holding glossary entries
    #[serde(default = "default_glossary_dir")]
    pub dir: String,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_glossary_dir() -> String {
    String::from("glossary")
}

impl Default for GlossaryConfig {
    fn default() -> Self {
        Self {
            dir: default_glossary_dir(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Folder names left out of the navigation tree (still routable)
    #[serde(default = "default_hidden_folders")]
    pub hidden_folders: Vec<String>,
}

fn default_hidden_folders() -> Vec<String> {
    vec![default_glossary_dir()]
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            hidden_folders: default_hidden_folders(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingConfig {
    #[serde(default = "default_words_per_minute")]
    pub words_per_minute: usize,
}

fn default_words_per_minute() -> usize {
    200
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            words_per_minute: default_words_per_minute(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightConfig {
    /// Name of a syntect bundled theme
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_theme() -> String {
    String::from("base16-ocean.dark")
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Role required to read documents, the tree and the glossary
    #[serde(default = "default_docs_role")]
    pub docs: RequiredRole,

    /// Request paths reachable without a signed-in viewer
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
}

fn default_docs_role() -> RequiredRole {
    RequiredRole::Member
}

fn default_public_paths() -> Vec<String> {
    ["/", "/api/auth", "/auth/error", "/debug/auth", "/tags"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            docs: default_docs_role(),
            public_paths: default_public_paths(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = if contents.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&contents)?
        };

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::info!("No config at {:?}, using defaults", path);
            Ok(Config {
                config_path: Some(path.to_path_buf()),
                ..Config::default()
            })
        }
    }

    /// Build a config rooted at an explicit content directory
    pub fn for_content_dir<P: AsRef<Path>>(content: P) -> Self {
        Config {
            paths: PathsConfig {
                content: content.as_ref().to_path_buf(),
                ..PathsConfig::default()
            },
            ..Config::default()
        }
    }

    /// Get the content directory, resolved relative to config file
    pub fn content_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.content)
    }

    /// Get the output directory, resolved relative to config file
    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.output)
    }

    /// Get the glossary subtree on disk
    pub fn glossary_dir(&self) -> PathBuf {
        self.content_dir().join(&self.glossary.dir)
    }

    /// Docs URL prefix with a leading slash and no trailing slash ("/docs")
    pub fn normalized_docs_prefix(&self) -> String {
        normalize_prefix(&self.docs_prefix)
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(config_path) = &self.config_path {
            match config_path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.join(path),
                _ => path.to_path_buf(),
            }
        } else {
            path.to_path_buf()
        }
    }
}

/// Ensure a URL prefix has a leading slash and no trailing slash ("" stays root)
pub fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
