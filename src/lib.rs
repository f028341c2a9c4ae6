//! astro-rs: typed Markdown content collections for file-routed sites
//!
//! The core is the content pipeline in [`content`]: a directory walker that
//! splits front matter from Markdown, renders the body with image and
//! wikilink resolution, and stores the resulting items per metadata type.

pub mod commands;
pub mod config;
pub mod content;

use anyhow::Result;
use std::path::{Path, PathBuf};

use content::{DiskFs, LoadOptions};

/// Name of the site configuration file
pub const CONFIG_FILE: &str = "_config.yml";

/// A site on disk
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Content directory
    pub content_dir: PathBuf,
}

impl Site {
    /// Create a site from a directory, reading `_config.yml` when present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        let content_dir = base_dir.join(&config.content_dir);

        Ok(Self {
            config,
            base_dir,
            content_dir,
        })
    }

    /// Filesystem rooted at the content directory
    pub fn fs(&self) -> DiskFs {
        DiskFs::new(&self.content_dir)
    }

    /// Load options built from the site configuration
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions::from_config(&self.config)
    }
}
