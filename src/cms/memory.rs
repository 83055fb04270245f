//! In-memory content source, used for fixtures and offline builds

use async_trait::async_trait;
use reqwest::Url;
use std::fs;
use std::path::Path;

use super::{
    error::CmsError,
    types::{Document, Paginated, Predicate, QueryOptions},
    ContentSource,
};

const CURSOR_BASE: &str = "memory://documents/search";
const DEFAULT_PAGE_SIZE: u32 = 20;

/// Serves a fixed set of documents with the same paging behaviour as the API.
///
/// Cursors are `memory://` URLs carrying the predicates and page number, so
/// they round-trip through [`ContentSource::fetch_page`].
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: Vec<Document>,
}

impl MemorySource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Load documents from a JSON file: either an array of documents or a
    /// search response with a `results` array.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CmsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        let documents = match value {
            serde_json::Value::Array(_) => serde_json::from_value(value)?,
            serde_json::Value::Object(mut obj) => match obj.remove("results") {
                Some(results) => serde_json::from_value(results)?,
                None => {
                    return Err(CmsError::Fixture(format!(
                        "{:?} has no results array",
                        path
                    )))
                }
            },
            _ => {
                return Err(CmsError::Fixture(format!(
                    "{:?} must hold a JSON array or object",
                    path
                )))
            }
        };
        tracing::debug!("Loaded fixtures from {:?}", path);
        Ok(Self::new(documents))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn matches(doc: &Document, predicate: &Predicate) -> bool {
        let path = predicate.path();
        let value = predicate.value();
        match path {
            "document.type" => doc.doc_type == value,
            "document.id" => doc.id == value,
            _ => match path.strip_prefix("my.").and_then(|p| p.split_once('.')) {
                Some((doc_type, "uid")) => {
                    doc.doc_type == doc_type && doc.uid.as_deref() == Some(value)
                }
                Some((doc_type, field)) => {
                    doc.doc_type == doc_type
                        && doc.data.get(field).and_then(|v| v.as_str()) == Some(value)
                }
                None => false,
            },
        }
    }

    fn search(
        &self,
        predicates: &[Predicate],
        page: u32,
        page_size: u32,
    ) -> Result<Paginated<Document>, CmsError> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let matching: Vec<&Document> = self
            .documents
            .iter()
            .filter(|doc| predicates.iter().all(|p| Self::matches(doc, p)))
            .collect();

        let total_pages = (matching.len() as u32).div_ceil(page_size).max(1);
        let start = (page - 1).saturating_mul(page_size) as usize;
        let results = matching
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .collect();

        let next_page = if page < total_pages {
            Some(cursor(predicates, page + 1, page_size)?)
        } else {
            None
        };

        Ok(Paginated {
            results,
            next_page,
            page: Some(page),
            total_pages: Some(total_pages),
        })
    }
}

fn cursor(predicates: &[Predicate], page: u32, page_size: u32) -> Result<String, CmsError> {
    let mut url =
        Url::parse(CURSOR_BASE).map_err(|e| CmsError::InvalidUrl(format!("{}: {}", CURSOR_BASE, e)))?;
    {
        let mut query = url.query_pairs_mut();
        for predicate in predicates {
            query.append_pair(
                "at",
                &format!("{}={}", predicate.path(), predicate.value()),
            );
        }
        query.append_pair("page", &page.to_string());
        query.append_pair("pageSize", &page_size.to_string());
    }
    Ok(url.to_string())
}

fn parse_cursor(raw: &str) -> Result<(Vec<Predicate>, u32, u32), CmsError> {
    let url = Url::parse(raw).map_err(|e| CmsError::InvalidUrl(format!("{}: {}", raw, e)))?;
    if url.scheme() != "memory" {
        return Err(CmsError::InvalidUrl(raw.to_string()));
    }

    let mut predicates = Vec::new();
    let mut page = 1;
    let mut page_size = DEFAULT_PAGE_SIZE;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "at" => {
                let (path, value) = value
                    .split_once('=')
                    .ok_or_else(|| CmsError::InvalidUrl(raw.to_string()))?;
                predicates.push(Predicate::at(path, value));
            }
            "page" => page = value.parse().map_err(|_| CmsError::InvalidUrl(raw.to_string()))?,
            "pageSize" => {
                page_size = value
                    .parse()
                    .map_err(|_| CmsError::InvalidUrl(raw.to_string()))?
            }
            _ => {}
        }
    }
    Ok((predicates, page, page_size))
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<Paginated<Document>, CmsError> {
        self.search(
            predicates,
            options.page.unwrap_or(1),
            options.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }

    async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
        _options: &QueryOptions,
    ) -> Result<Option<Document>, CmsError> {
        let predicate = Predicate::uid(doc_type, uid);
        Ok(self
            .documents
            .iter()
            .find(|doc| Self::matches(doc, &predicate))
            .cloned())
    }

    async fn fetch_page(&self, url: &str) -> Result<Paginated<Document>, CmsError> {
        let (predicates, page, page_size) = parse_cursor(url)?;
        self.search(&predicates, page, page_size)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
