//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable overriding `cms.endpoint`
pub const ENDPOINT_ENV: &str = "PRISMIC_API_ENDPOINT";
/// Environment variable overriding `cms.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,
    pub static_dir: String,
    pub i18n_dir: String,

    // Date format (Moment.js tokens)
    pub date_format: String,

    // Content source
    pub cms: CmsConfig,

    // Reading time estimate
    pub reading_time: ReadingTimeConfig,

    // Regeneration
    /// Seconds after which a generated page is regenerated in the background
    pub revalidate: u64,
    pub fallback: FallbackMode,

    /// Upper bound for `?pages=N` on the post list
    pub max_loaded_pages: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            language: "en".to_string(),
            timezone: "UTC".to_string(),

            url: "http://localhost:3000".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),
            static_dir: "static".to_string(),
            i18n_dir: "languages".to_string(),

            date_format: "DD MMM YYYY".to_string(),

            cms: CmsConfig::default(),
            reading_time: ReadingTimeConfig::default(),

            revalidate: 60 * 60 * 24,
            fallback: FallbackMode::default(),

            max_loaded_pages: 50,
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(config)
    }

    /// Apply `PRISMIC_API_ENDPOINT` / `PRISMIC_ACCESS_TOKEN` overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(ACCESS_TOKEN_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, endpoint: Option<String>, token: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.is_empty()) {
            tracing::debug!("CMS endpoint overridden from {}", ENDPOINT_ENV);
            self.cms.endpoint = endpoint;
        }
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.cms.access_token = Some(token);
        }
    }

    /// Parse the configured timezone, falling back to UTC
    pub fn tz(&self) -> chrono_tz::Tz {
        match self.timezone.parse::<chrono_tz::Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                if !self.timezone.is_empty() {
                    tracing::warn!("Unknown timezone {:?}, using UTC", self.timezone);
                }
                chrono_tz::UTC
            }
        }
    }

    /// Staleness window for generated pages
    pub fn revalidate_after(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.revalidate.min(i64::MAX as u64 / 1000) as i64)
    }
}

/// Headless CMS connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    /// API endpoint, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    /// Custom type of the post documents
    pub document_type: String,
    /// Page size of the post list
    pub page_size: u32,
    /// Serve documents from a local JSON file instead of the API
    pub fixtures: Option<String>,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: None,
            document_type: "posts".to_string(),
            page_size: 1,
            fixtures: None,
        }
    }
}

/// Reading time settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadingTimeConfig {
    pub words_per_minute: u32,
    pub empty_post: EmptyPostMinutes,
}

impl Default for ReadingTimeConfig {
    fn default() -> Self {
        Self {
            words_per_minute: 200,
            empty_post: EmptyPostMinutes::Zero,
        }
    }
}

/// Minutes shown for a post without any words
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyPostMinutes {
    #[default]
    Zero,
    One,
}

/// How the server answers for post paths that were not generated up front
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackMode {
    /// Answer with a loading placeholder and generate in the background
    #[default]
    Placeholder,
    /// Generate before answering
    Blocking,
    /// Only enumerated paths exist
    Disabled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "spacetraveling");
        assert_eq!(config.cms.document_type, "posts");
        assert_eq!(config.revalidate, 86400);
        assert_eq!(config.reading_time.words_per_minute, 200);
        assert_eq!(config.reading_time.empty_post, EmptyPostMinutes::Zero);
        assert_eq!(config.fallback, FallbackMode::Placeholder);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
language: pt-BR
timezone: America/Sao_Paulo
fallback: blocking
cms:
  endpoint: https://blog.cdn.prismic.io/api/v2
  page_size: 5
reading_time:
  empty_post: one
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.language, "pt-BR");
        assert_eq!(config.tz(), chrono_tz::America::Sao_Paulo);
        assert_eq!(config.fallback, FallbackMode::Blocking);
        assert_eq!(config.cms.endpoint, "https://blog.cdn.prismic.io/api/v2");
        assert_eq!(config.cms.page_size, 5);
        assert_eq!(config.cms.document_type, "posts");
        assert_eq!(config.reading_time.empty_post, EmptyPostMinutes::One);
        assert_eq!(config.reading_time.words_per_minute, 200);
    }

    #[test]
    fn test_unknown_timezone_falls_back_to_utc() {
        let config = SiteConfig {
            timezone: "Mars/Olympus".to_string(),
            ..Default::default()
        };
        assert_eq!(config.tz(), chrono_tz::UTC);
    }

    #[test]
    fn test_overrides_ignore_empty_values() {
        let mut config = SiteConfig::default();
        config.cms.endpoint = "https://a.example/api/v2".to_string();
        config.apply_overrides(Some(String::new()), Some("secret".to_string()));
        assert_eq!(config.cms.endpoint, "https://a.example/api/v2");
        assert_eq!(config.cms.access_token.as_deref(), Some("secret"));
    }
}
