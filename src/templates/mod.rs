//! Built-in site templates using Tera template engine
//!
//! Templates are embedded in the binary. Autoescaping stays on for every
//! `.html` template; only pre-rendered article HTML is marked `safe`.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::helpers::DisplayDate;

/// Template renderer with the embedded site templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("index.html", include_str!("site/index.html")),
            ("post.html", include_str!("site/post.html")),
            ("article.html", include_str!("site/article.html")),
            ("loading.html", include_str!("site/loading.html")),
            ("not_found.html", include_str!("site/not_found.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("site/partials/header.html"),
            ),
        ])?;

        tera.register_filter("truncate_chars", truncate_chars_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "...".to_string(),
    };

    if s.chars().count() <= length {
        Ok(tera::Value::String(s))
    } else {
        let truncated: String = s.chars().take(length).collect();
        Ok(tera::Value::String(format!(
            "{}{}",
            truncated.trim_end(),
            omission
        )))
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct ConfigData {
    pub title: String,
    pub language: String,
    pub url: String,
    pub root: String,
}

impl From<&SiteConfig> for ConfigData {
    fn from(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            language: config.language.clone(),
            url: config.url.clone(),
            root: config.root.clone(),
        }
    }
}

/// One entry of the post list
#[derive(Debug, Clone, Serialize)]
pub struct PostCard {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    /// Absent for documents without a uid
    pub url: Option<String>,
    pub date: Option<DisplayDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleData {
    pub title: String,
    pub banner_url: Option<String>,
    pub banner_alt: String,
    pub author: String,
    pub date: Option<DisplayDate>,
    pub minutes: usize,
    pub sections: Vec<SectionData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionData {
    pub heading: String,
    /// Rendered rich text, already escaped
    pub html: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::I18n;

    fn base_context() -> Context {
        let mut context = Context::new();
        context.insert("config", &ConfigData::from(&SiteConfig::default()));
        context.insert("t", &I18n::default().get_all_translations());
        context.insert("home_url", "/");
        context.insert("description", "");
        context
    }

    #[test]
    fn test_all_templates_parse() {
        assert!(TemplateRenderer::new().is_ok());
    }

    #[test]
    fn test_index_escapes_post_fields() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = base_context();
        context.insert(
            "posts",
            &vec![PostCard {
                title: "<script>alert(1)</script>".to_string(),
                subtitle: "Sub".to_string(),
                author: "Ana".to_string(),
                url: Some("/post/a".to_string()),
                date: None,
            }],
        );
        context.insert("notice", &false);
        context.insert("load_more", &Some("?pages=2"));

        let html = renderer.render("index.html", &context).unwrap();
        assert!(html.contains("&lt;script&gt;alert(1)&lt;"));
        assert!(!html.contains("<script>alert(1)"));
        assert!(html.contains("Load more posts"));
        assert!(!html.contains("<time"));
    }

    #[test]
    fn test_article_keeps_section_html() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = base_context();
        context.insert(
            "article",
            &ArticleData {
                title: "Hello".to_string(),
                banner_url: None,
                banner_alt: String::new(),
                author: "Ana".to_string(),
                date: None,
                minutes: 3,
                sections: vec![SectionData {
                    heading: "Intro".to_string(),
                    html: "<p><strong>bold</strong></p>".to_string(),
                }],
            },
        );

        let html = renderer.render("article.html", &context).unwrap();
        assert!(html.contains("<p><strong>bold</strong></p>"));
        assert!(html.contains("3 min"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_truncate_chars_filter() {
        let mut args = HashMap::new();
        args.insert("length".to_string(), tera::Value::from(5));
        let value = truncate_chars_filter(&tera::Value::from("hello world"), &args).unwrap();
        assert_eq!(value, tera::Value::from("hello..."));

        let value = truncate_chars_filter(&tera::Value::from("hi"), &args).unwrap();
        assert_eq!(value, tera::Value::from("hi"));
    }
}
