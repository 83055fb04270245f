//! Headless CMS access
//!
//! Everything that talks to the content backend goes through the
//! [`ContentSource`] trait. The handle is built once per process and passed
//! to the generator and the server explicitly.

mod client;
mod error;
mod memory;
mod types;

pub use client::PrismicClient;
pub use error::CmsError;
pub use memory::MemorySource;
pub use types::{query_string, Document, Paginated, Predicate, QueryOptions};

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::config::CmsConfig;

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Query documents matching all predicates, one page at a time
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<Paginated<Document>, CmsError>;

    /// Fetch one document by type and uid
    async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
        options: &QueryOptions,
    ) -> Result<Option<Document>, CmsError>;

    /// Follow a `next_page` cursor verbatim
    async fn fetch_page(&self, url: &str) -> Result<Paginated<Document>, CmsError>;

    fn name(&self) -> &str;
}

pub type DynContentSource = Arc<dyn ContentSource>;

/// Build the content source described by the configuration.
///
/// `fixtures` wins over `endpoint`; a relative fixture path resolves against
/// `base_dir`.
pub fn create_source(config: &CmsConfig, base_dir: &Path) -> Result<DynContentSource, CmsError> {
    if let Some(fixtures) = &config.fixtures {
        let path = base_dir.join(fixtures);
        let source = MemorySource::from_file(&path)?;
        tracing::info!("Using {} fixture documents from {:?}", source.len(), path);
        return Ok(Arc::new(source));
    }

    if config.endpoint.is_empty() {
        return Err(CmsError::InvalidUrl(
            "no CMS endpoint configured (set cms.endpoint or PRISMIC_API_ENDPOINT)".to_string(),
        ));
    }

    let client = PrismicClient::new(&config.endpoint, config.access_token.clone())?;
    tracing::info!("Using CMS endpoint {}", client.endpoint());
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_source_requires_endpoint() {
        match create_source(&CmsConfig::default(), Path::new(".")) {
            Err(CmsError::InvalidUrl(_)) => {}
            Err(e) => panic!("unexpected error: {}", e),
            Ok(source) => panic!("unexpected source: {}", source.name()),
        }
    }

    #[test]
    fn test_create_source_prefers_fixtures() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("posts.json"), "[]").unwrap();
        let config = CmsConfig {
            endpoint: "https://ignored.example/api/v2".to_string(),
            fixtures: Some("posts.json".to_string()),
            ..Default::default()
        };
        let source = create_source(&config, dir.path()).unwrap();
        assert_eq!(source.name(), "memory");
    }
}
