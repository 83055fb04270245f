//! Generator module - fetches posts from the CMS and renders pages with the
//! built-in Tera templates

use anyhow::{Context as _, Result};
use chrono_tz::Tz;
use serde::Serialize;
use tera::Context;

use crate::cms::{CmsError, DynContentSource, Paginated, Predicate, QueryOptions};
use crate::config::SiteConfig;
use crate::content::{PostDetail, PostList, PostSummary, ReadingTime};
use crate::helpers::{
    display_date, home_page_route, is_safe_slug, is_safe_url, post_data_route, post_route, url_for,
};
use crate::i18n::I18n;
use crate::templates::{ArticleData, ConfigData, PostCard, SectionData, TemplateRenderer};
use crate::Blog;

/// An enumerated post path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostPath {
    pub slug: String,
    pub route: String,
}

/// A rendered post detail page
#[derive(Debug, Clone)]
pub struct RenderedPost {
    /// Full page
    pub html: String,
    /// Article fragment, swapped into the loading placeholder
    pub article: String,
    pub title: String,
}

/// A page produced by a full site build
#[derive(Debug, Clone)]
pub struct GeneratedPage {
    pub route: String,
    pub html: String,
}

/// Where the load-more control of the post list points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMoreLinks {
    /// `/?pages=N`, replayed by the server
    Query,
    /// `/page/N/`, files written by `generate`
    Static,
}

#[derive(Serialize)]
struct PageData<'a> {
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
}

/// Site generator using Tera templates
pub struct Generator {
    config: SiteConfig,
    source: DynContentSource,
    renderer: TemplateRenderer,
    i18n: I18n,
    reading_time: ReadingTime,
    tz: Tz,
}

impl Generator {
    /// Create a generator for a blog, loading its language files
    pub fn new(blog: &Blog, source: DynContentSource) -> Result<Self> {
        let mut i18n = I18n::new(&blog.config.language);
        i18n.load_languages(&blog.i18n_dir)?;
        Self::from_parts(blog.config.clone(), i18n, source)
    }

    pub fn from_parts(config: SiteConfig, i18n: I18n, source: DynContentSource) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;
        let reading_time = ReadingTime::new(&config.reading_time);
        let tz = config.tz();

        tracing::debug!(
            "Generator ready: source={}, language={}, timezone={}",
            source.name(),
            i18n.language(),
            tz
        );

        Ok(Self {
            config,
            source,
            renderer,
            i18n,
            reading_time,
            tz,
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn i18n(&self) -> &I18n {
        &self.i18n
    }

    fn doc_type(&self) -> &str {
        &self.config.cms.document_type
    }

    /// Fields needed by the post list
    fn summary_options(&self) -> QueryOptions {
        let doc_type = self.doc_type();
        QueryOptions::default()
            .with_page_size(self.config.cms.page_size.max(1))
            .with_fetch(
                ["title", "subtitle", "author"]
                    .iter()
                    .map(|field| format!("{}.{}", doc_type, field)),
            )
    }

    /// Fetch the first page of post summaries
    pub async fn fetch_home(&self) -> Result<Paginated<PostSummary>> {
        let page = self
            .source
            .query(&[Predicate::document_type(self.doc_type())], &self.summary_options())
            .await
            .with_context(|| format!("Failed to query {} documents", self.doc_type()))?;
        page.try_map(PostSummary::from_document)
            .context("Unexpected post summary shape")
    }

    /// Enumerate every post path, following `next_page` until exhausted
    pub async fn enumerate_paths(&self) -> Result<Vec<PostPath>> {
        let options = QueryOptions::default().with_page_size(100);
        let mut page = self
            .source
            .query(&[Predicate::document_type(self.doc_type())], &options)
            .await
            .context("Failed to enumerate posts")?;

        let mut paths = Vec::new();
        loop {
            for doc in page.results {
                match doc.uid {
                    Some(uid) if is_safe_slug(&uid) => paths.push(PostPath {
                        route: post_route(&uid),
                        slug: uid,
                    }),
                    Some(uid) => tracing::warn!("Skipping post with unusable uid {:?}", uid),
                    None => tracing::warn!("Skipping post {} without a uid", doc.id),
                }
            }

            let Some(next) = page.next_page else { break };
            page = self
                .source
                .fetch_page(&next)
                .await
                .with_context(|| format!("Failed to fetch {}", next))?;
        }

        tracing::debug!("Enumerated {} post paths", paths.len());
        Ok(paths)
    }

    /// Fetch one post. `None` when the CMS has no such document.
    pub async fn fetch_post(&self, slug: &str) -> Result<Option<PostDetail>> {
        let doc = self
            .source
            .get_by_uid(self.doc_type(), slug, &QueryOptions::default())
            .await
            .with_context(|| format!("Failed to fetch post {:?}", slug))?;
        doc.map(PostDetail::from_document)
            .transpose()
            .with_context(|| format!("Unexpected shape of post {:?}", slug))
    }

    /// Fetch the page of post summaries behind a load-more cursor
    pub async fn fetch_next(&self, cursor: &str) -> Result<Paginated<PostSummary>, CmsError> {
        self.source
            .fetch_page(cursor)
            .await?
            .try_map(PostSummary::from_document)
            .map_err(CmsError::from)
    }

    /// Create a base context with common variables
    fn create_base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("config", &ConfigData::from(&self.config));
        context.insert("t", &self.i18n.get_all_translations());
        context.insert("home_url", &url_for(&self.config, "/"));
        context.insert("description", "");
        context
    }

    fn post_card(&self, post: &PostSummary) -> PostCard {
        PostCard {
            title: post.data.title.clone(),
            subtitle: post.data.subtitle.clone(),
            author: post.data.author.clone(),
            url: post
                .uid
                .as_deref()
                .map(|uid| url_for(&self.config, &post_route(uid))),
            date: display_date(
                post.first_publication_date.as_deref(),
                &self.config.date_format,
                &self.tz,
                &self.i18n,
            ),
        }
    }

    /// Render the post list. `pages` is the number of loaded pages; the
    /// load-more control is hidden once `max_loaded_pages` is reached.
    pub fn render_home(
        &self,
        list: &PostList,
        pages: usize,
        notice: bool,
        links: LoadMoreLinks,
    ) -> Result<String> {
        let posts: Vec<PostCard> = list.posts().iter().map(|p| self.post_card(p)).collect();
        let next = pages + 1;
        let load_more = (list.can_load_more() && pages < self.config.max_loaded_pages.max(1))
            .then(|| match links {
                LoadMoreLinks::Query => format!("{}?pages={}", url_for(&self.config, "/"), next),
                LoadMoreLinks::Static => url_for(&self.config, &home_page_route(next)),
            });

        let mut context = self.create_base_context();
        context.insert("posts", &posts);
        context.insert("notice", &notice);
        context.insert("load_more", &load_more);
        self.renderer.render("index.html", &context)
    }

    /// Render a post detail page and its article fragment
    pub fn render_post(&self, post: &PostDetail) -> Result<RenderedPost> {
        let data = &post.data;
        let sections = data
            .content
            .iter()
            .map(|block| SectionData {
                heading: block.heading.clone(),
                html: block.body.as_html(),
            })
            .collect();
        let article = ArticleData {
            title: data.title.clone(),
            banner_url: data.banner.url.clone().filter(|u| is_safe_url(u)),
            banner_alt: data.banner.alt.clone().unwrap_or_default(),
            author: data.author.clone(),
            date: display_date(
                post.first_publication_date.as_deref(),
                &self.config.date_format,
                &self.tz,
                &self.i18n,
            ),
            minutes: self.reading_time.estimate(&data.content),
            sections,
        };
        let description = data
            .content
            .iter()
            .find(|block| !block.body.is_empty())
            .map(|block| block.body.as_text())
            .unwrap_or_default();

        let mut context = self.create_base_context();
        context.insert("article", &article);
        let article_html = self.renderer.render("article.html", &context)?;

        context.insert("article_html", &article_html);
        context.insert("description", &description);
        let html = self.renderer.render("post.html", &context)?;

        Ok(RenderedPost {
            html,
            article: article_html,
            title: format!("{} | {}", data.title, self.config.title),
        })
    }

    /// Loading placeholder for a post that is being generated
    pub fn render_loading(&self, slug: &str) -> Result<String> {
        let mut context = self.create_base_context();
        context.insert("data_url", &url_for(&self.config, &post_data_route(slug)));
        self.renderer.render("loading.html", &context)
    }

    pub fn render_not_found(&self) -> Result<String> {
        self.renderer
            .render("not_found.html", &self.create_base_context())
    }

    /// JSON body of the page-data endpoint
    pub fn render_page_data(
        &self,
        status: &str,
        html: Option<&str>,
        title: Option<&str>,
    ) -> Result<String> {
        Ok(serde_json::to_string(&PageData {
            status,
            html,
            title,
        })?)
    }

    /// Fetch and render the post list, returning the initial page with it
    pub async fn build_home(&self) -> Result<(Paginated<PostSummary>, String)> {
        let initial = self.fetch_home().await?;
        let html = self.render_home(
            &PostList::new(initial.clone()),
            1,
            false,
            LoadMoreLinks::Query,
        )?;
        Ok((initial, html))
    }

    /// Render the post list as static pages: `/` with the first page, then
    /// `/page/N/` with the first N pages, each linking to the next
    pub async fn build_home_pages(&self) -> Result<Vec<GeneratedPage>> {
        let mut list = PostList::new(self.fetch_home().await?);
        let max = self.config.max_loaded_pages.max(1);
        let mut pages = Vec::new();

        for n in 1..=max {
            pages.push(GeneratedPage {
                route: home_page_route(n),
                html: self.render_home(&list, n, false, LoadMoreLinks::Static)?,
            });
            if n == max || !list.can_load_more() {
                break;
            }
            list.load_more(self.source.as_ref())
                .await
                .with_context(|| format!("Failed to load page {} of the post list", n + 1))?;
        }

        Ok(pages)
    }

    /// Fetch and render one post
    pub async fn build_post(&self, slug: &str) -> Result<Option<RenderedPost>> {
        match self.fetch_post(slug).await? {
            Some(post) => Ok(Some(self.render_post(&post)?)),
            None => Ok(None),
        }
    }

    /// Generate the entire site: the post list pages plus every enumerated post
    pub async fn build_site(&self) -> Result<Vec<GeneratedPage>> {
        let mut pages = self.build_home_pages().await?;

        for path in self.enumerate_paths().await? {
            match self.build_post(&path.slug).await? {
                Some(post) => pages.push(GeneratedPage {
                    route: path.route,
                    html: post.html,
                }),
                None => tracing::warn!("Post {:?} disappeared during the build", path.slug),
            }
        }

        Ok(pages)
    }
}
