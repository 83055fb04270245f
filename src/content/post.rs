//! Post models projected from CMS documents

use serde::{Deserialize, Deserializer, Serialize};

use super::richtext::RichText;
use crate::cms::Document;

/// A post as shown on the list page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub uid: Option<String>,

    /// Raw CMS timestamp
    pub first_publication_date: Option<String>,

    pub data: SummaryData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryData {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub subtitle: String,
    #[serde(deserialize_with = "null_as_default")]
    pub author: String,
}

impl PostSummary {
    pub fn from_document(doc: Document) -> Result<Self, serde_json::Error> {
        let data = project(doc.data)?;
        Ok(Self {
            uid: doc.uid,
            first_publication_date: doc.first_publication_date,
            data,
        })
    }
}

/// A full post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    pub uid: Option<String>,

    pub first_publication_date: Option<String>,

    pub data: PostBody,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostBody {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub banner: Banner,
    #[serde(deserialize_with = "null_as_default")]
    pub author: String,
    #[serde(deserialize_with = "null_as_default")]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Banner {
    pub url: Option<String>,
    pub alt: Option<String>,
}

/// A heading followed by a rich-text body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentBlock {
    #[serde(deserialize_with = "null_as_default")]
    pub heading: String,
    #[serde(deserialize_with = "null_as_default")]
    pub body: RichText,
}

impl PostDetail {
    pub fn from_document(doc: Document) -> Result<Self, serde_json::Error> {
        let data = project(doc.data)?;
        Ok(Self {
            uid: doc.uid,
            first_publication_date: doc.first_publication_date,
            data,
        })
    }
}

/// Empty CMS fields arrive as `null`
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `null` data (e.g. a document fetched with no matching fields) projects to
/// the default value.
fn project<T: Default + serde::de::DeserializeOwned>(
    data: serde_json::Value,
) -> Result<T, serde_json::Error> {
    if data.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(data: serde_json::Value) -> Document {
        Document {
            id: "X".to_string(),
            uid: Some("hello".to_string()),
            doc_type: "posts".to_string(),
            first_publication_date: Some("2021-03-15T19:25:28+0000".to_string()),
            last_publication_date: None,
            data,
        }
    }

    #[test]
    fn test_summary_from_document() {
        let summary = PostSummary::from_document(document(json!({
            "title": "Como utilizar Hooks",
            "subtitle": "Pensando em sincronização em vez de ciclos de vida",
            "author": "Joseph Oliveira",
            "extra": 42
        })))
        .unwrap();
        assert_eq!(summary.uid.as_deref(), Some("hello"));
        assert_eq!(summary.data.title, "Como utilizar Hooks");
        assert_eq!(summary.data.author, "Joseph Oliveira");
    }

    #[test]
    fn test_summary_tolerates_missing_fields() {
        let summary = PostSummary::from_document(document(json!({"title": "Only"}))).unwrap();
        assert_eq!(summary.data.subtitle, "");

        let summary = PostSummary::from_document(document(serde_json::Value::Null)).unwrap();
        assert_eq!(summary.data, SummaryData::default());
    }

    #[test]
    fn test_detail_from_document() {
        let detail = PostDetail::from_document(document(json!({
            "title": "Hello",
            "banner": {"url": "https://images.example/banner.png", "alt": null},
            "author": "Ana",
            "content": [{
                "heading": "Intro",
                "body": [{"type": "paragraph", "text": "one two", "spans": []}]
            }]
        })))
        .unwrap();
        assert_eq!(detail.data.banner.url.as_deref(), Some("https://images.example/banner.png"));
        assert_eq!(detail.data.content.len(), 1);
        assert_eq!(detail.data.content[0].heading, "Intro");
        assert_eq!(detail.data.content[0].body.as_text(), "one two");
    }

    #[test]
    fn test_summary_with_null_fields() {
        let summary = PostSummary::from_document(document(json!({
            "title": "Untitled draft",
            "subtitle": null,
            "author": null
        })))
        .unwrap();
        assert_eq!(summary.data.title, "Untitled draft");
        assert_eq!(summary.data.subtitle, "");
        assert_eq!(summary.data.author, "");
    }

    #[test]
    fn test_detail_with_null_fields() {
        let detail = PostDetail::from_document(document(json!({
            "title": "Hello",
            "banner": null,
            "author": null,
            "content": [
                {"heading": null, "body": [{"type": "paragraph", "text": "one two", "spans": []}]},
                {"heading": "Empty", "body": null}
            ]
        })))
        .unwrap();
        assert_eq!(detail.data.author, "");
        assert_eq!(detail.data.banner, Banner::default());
        assert_eq!(detail.data.content[0].heading, "");
        assert_eq!(detail.data.content[0].body.as_text(), "one two");
        assert!(detail.data.content[1].body.is_empty());
    }

    #[test]
    fn test_detail_rejects_wrong_shape() {
        assert!(PostDetail::from_document(document(json!({"content": "nope"}))).is_err());
    }
}
