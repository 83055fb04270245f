//! Wire types shared by every content source

use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw CMS document. `data` is left untyped; callers project it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default)]
    pub first_publication_date: Option<String>,
    #[serde(default)]
    pub last_publication_date: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// One page of results plus the cursor to the next page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
}

impl<T> Paginated<T> {
    pub fn new(results: Vec<T>, next_page: Option<String>) -> Self {
        Self {
            results,
            next_page,
            page: None,
            total_pages: None,
        }
    }

    /// Convert every result, keeping the cursor
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Paginated<U>, E> {
        Ok(Paginated {
            results: self.results.into_iter().map(f).collect::<Result<_, _>>()?,
            next_page: self.next_page,
            page: self.page,
            total_pages: self.total_pages,
        })
    }
}

/// A query predicate, rendered in the Prismic predicate syntax
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    At { path: String, value: String },
}

impl Predicate {
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::At {
            path: path.into(),
            value: value.into(),
        }
    }

    /// `document.type == doc_type`
    pub fn document_type(doc_type: &str) -> Self {
        Self::at("document.type", doc_type)
    }

    /// `my.<doc_type>.uid == uid`
    pub fn uid(doc_type: &str, uid: &str) -> Self {
        Self::at(format!("my.{}.uid", doc_type), uid)
    }

    pub fn path(&self) -> &str {
        match self {
            Predicate::At { path, .. } => path,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Predicate::At { value, .. } => value,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::At { path, value } => {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "[at({}, \"{}\")]", path, escaped)
            }
        }
    }
}

/// Build the `q` parameter from a list of predicates
pub fn query_string(predicates: &[Predicate]) -> String {
    let inner: String = predicates.iter().map(|p| p.to_string()).collect();
    format!("[{}]", inner)
}

/// Options of a document query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Restrict `data` to these fields (`<type>.<field>`)
    pub fetch: Vec<String>,
    pub page_size: Option<u32>,
    pub page: Option<u32>,
}

impl QueryOptions {
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_fetch<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch = fields.into_iter().map(Into::into).collect();
        self
    }
}
