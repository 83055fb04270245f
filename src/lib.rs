//! spacetraveling: a blog rendered from a headless CMS
//!
//! Posts are fetched from a Prismic repository (or a local fixture file),
//! rendered with embedded Tera templates, and either written out as static
//! files or served with background regeneration.

pub mod cache;
pub mod cms;
pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod i18n;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// The main blog application
#[derive(Debug, Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Static assets copied into the output
    pub static_dir: PathBuf,
    /// Language files
    pub i18n_dir: PathBuf,
}

impl Blog {
    /// Create a new Blog instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };
        config.apply_env();

        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);
        let i18n_dir = base_dir.join(&config.i18n_dir);

        Ok(Self {
            config,
            base_dir,
            public_dir,
            static_dir,
            i18n_dir,
        })
    }

    /// Build the content source from the configuration
    pub fn content_source(&self) -> Result<cms::DynContentSource> {
        Ok(cms::create_source(&self.config.cms, &self.base_dir)?)
    }

    /// Clean the public directory and cache
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
