//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::content::loader::DEFAULT_MOUNT_PREFIX;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Directory the content filesystem is rooted at
    pub content_dir: String,
    /// Virtual prefix relative image paths resolve under
    pub mount_prefix: String,
    /// Collections loaded by the CLI
    pub collections: Vec<CollectionConfig>,

    #[serde(default)]
    pub markdown: MarkdownConfig,
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub front_matter: FrontMatterConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content_dir: "content".to_string(),
            mount_prefix: DEFAULT_MOUNT_PREFIX.to_string(),
            collections: vec![CollectionConfig {
                name: "posts".to_string(),
                dir: "posts".to_string(),
            }],
            markdown: MarkdownConfig::default(),
            highlight: HighlightConfig::default(),
            front_matter: FrontMatterConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config {:?}", path))?;
        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Look up a collection by name
    pub fn collection(&self, name: &str) -> Option<&CollectionConfig> {
        self.collections.iter().find(|c| c.name == name)
    }
}

/// A named content collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub name: String,
    /// Directory relative to `content_dir`
    pub dir: String,
}

/// Markdown rendering options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    /// Emit `<img ... />`
    pub xhtml: bool,
    /// Keep dangerous image URLs such as `javascript:`
    pub unsafe_urls: bool,
    pub smart_punctuation: bool,
    pub tables: bool,
    pub footnotes: bool,
    pub strikethrough: bool,
    pub tasklists: bool,
    pub wikilinks: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            xhtml: false,
            unsafe_urls: false,
            smart_punctuation: false,
            tables: true,
            footnotes: true,
            strikethrough: true,
            tasklists: true,
            wikilinks: true,
        }
    }
}

/// Code highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub enable: bool,
    pub theme: String,
    /// Guess the language of unlabelled code blocks from their first line
    pub guess_language: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            enable: true,
            theme: "base16-ocean.dark".to_string(),
            guess_language: true,
        }
    }
}

/// Front-matter handling
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatterConfig {
    /// Reject content files without a front-matter block
    pub required: bool,
}
