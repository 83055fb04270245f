use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, error};

use super::{
    error::CmsError,
    types::{query_string, Document, Paginated, Predicate, QueryOptions},
    ContentSource,
};

/// Repository description returned by the API root
#[derive(Debug, Deserialize)]
struct ApiInfo {
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

/// A client for a Prismic-compatible REST API.
///
/// Every search must name a content ref; the master ref is looked up on the
/// first query and reused for the lifetime of the client.
#[derive(Debug)]
pub struct PrismicClient {
    http: reqwest::Client,
    endpoint: Url,
    access_token: Option<String>,
    master_ref: OnceCell<String>,
}

impl PrismicClient {
    pub fn new(endpoint: &str, access_token: Option<String>) -> Result<Self, CmsError> {
        let endpoint = Url::parse(endpoint.trim_end_matches('/'))
            .map_err(|e| CmsError::InvalidUrl(format!("{}: {}", endpoint, e)))?;
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
            access_token,
            master_ref: OnceCell::new(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn master_ref(&self) -> Result<&str, CmsError> {
        self.master_ref
            .get_or_try_init(|| async {
                let mut url = self.endpoint.clone();
                if let Some(token) = &self.access_token {
                    url.query_pairs_mut().append_pair("access_token", token);
                }
                let info: ApiInfo = self.get_json(url).await?;
                let master = info
                    .refs
                    .into_iter()
                    .find(|r| r.is_master_ref)
                    .map(|r| r.reference)
                    .ok_or(CmsError::NoMasterRef)?;
                debug!("Resolved master ref {}", master);
                Ok::<_, CmsError>(master)
            })
            .await
            .map(String::as_str)
    }

    fn search_url(
        &self,
        reference: &str,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<Url, CmsError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| CmsError::InvalidUrl(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(["documents", "search"]);

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("ref", reference);
            query.append_pair("q", &query_string(predicates));
            if let Some(page_size) = options.page_size {
                query.append_pair("pageSize", &page_size.to_string());
            }
            if let Some(page) = options.page {
                query.append_pair("page", &page.to_string());
            }
            if !options.fetch.is_empty() {
                query.append_pair("fetch", &options.fetch.join(","));
            }
            if let Some(token) = &self.access_token {
                query.append_pair("access_token", token);
            }
        }

        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, CmsError> {
        debug!("Sending request to {}", url);
        let resp = self.http.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            error!("request {} status: {}", url, status);
            return Err(CmsError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl ContentSource for PrismicClient {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<Paginated<Document>, CmsError> {
        let reference = self.master_ref().await?;
        let url = self.search_url(reference, predicates, options)?;
        self.get_json(url).await
    }

    async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
        options: &QueryOptions,
    ) -> Result<Option<Document>, CmsError> {
        let options = QueryOptions {
            page_size: Some(1),
            page: None,
            ..options.clone()
        };
        let page = self
            .query(&[Predicate::uid(doc_type, uid)], &options)
            .await?;
        Ok(page.results.into_iter().next())
    }

    async fn fetch_page(&self, url: &str) -> Result<Paginated<Document>, CmsError> {
        // Cursors are normally absolute; relative ones resolve against the endpoint.
        let url = self
            .endpoint
            .join(url)
            .map_err(|e| CmsError::InvalidUrl(format!("{}: {}", url, e)))?;
        self.get_json(url).await
    }

    fn name(&self) -> &str {
        "prismic"
    }
}
