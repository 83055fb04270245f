//! Blog server with background regeneration
//!
//! Pages are rendered from the CMS on demand and cached. Pages older than
//! `revalidate` are served stale while they regenerate; post paths that were
//! not generated at startup follow the configured fallback mode.

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::Instant;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cache::{CachedPage, Lookup, Outcome, PageCache, RouteState};
use crate::cms::Paginated;
use crate::config::FallbackMode;
use crate::content::{PostList, PostSummary};
use crate::generator::{Generator, LoadMoreLinks};
use crate::helpers::{is_safe_slug, post_route};
use crate::Blog;

const HOME_ROUTE: &str = "/";

/// The post list after replaying `?pages=N`
#[derive(Debug)]
struct LoadedList {
    list: PostList,
    /// Pages actually loaded, the initial one included
    pages: usize,
    /// A load failed; render the notice
    notice: bool,
}

/// Server state
pub struct ServerState {
    generator: Generator,
    cache: PageCache,
}

impl ServerState {
    pub fn new(generator: Generator) -> Self {
        let cache = PageCache::new(generator.config().revalidate_after());
        Self { generator, cache }
    }

    fn fallback(&self) -> FallbackMode {
        self.generator.config().fallback
    }

    /// Generate the post list and every enumerated post. Any failure is fatal.
    pub async fn prebuild(&self) -> Result<usize> {
        self.refresh_home().await?;
        let mut count = 1;

        for path in self.generator.enumerate_paths().await? {
            if let Some(post) = self.generator.build_post(&path.slug).await? {
                self.cache
                    .insert(
                        &path.route,
                        CachedPage {
                            article: Some(post.article),
                            title: Some(post.title),
                            ..CachedPage::new(post.html, Utc::now())
                        },
                    )
                    .await;
                count += 1;
            }
        }

        Ok(count)
    }

    /// Rebuild the post list page
    async fn refresh_home(&self) -> Result<Arc<CachedPage>> {
        let (initial, html) = self.generator.build_home().await?;
        let page = CachedPage {
            home: Some(initial),
            ..CachedPage::new(html, Utc::now())
        };
        self.cache.insert(HOME_ROUTE, page).await;
        match self.cache.lookup(HOME_ROUTE, Utc::now()).await {
            Lookup::Fresh(page) | Lookup::Stale(page) => Ok(page),
            Lookup::Missing => anyhow::bail!("Post list vanished from the cache"),
        }
    }

    /// Background refresh of the post list, once at a time
    async fn revalidate_home(&self) {
        if !self.cache.try_claim(HOME_ROUTE).await {
            return;
        }
        if let Err(e) = self.refresh_home().await {
            tracing::error!("Failed to regenerate the post list: {:#}", e);
            self.cache
                .finish(HOME_ROUTE, Outcome::Failed(e.to_string()), Utc::now())
                .await;
        }
    }

    /// Generate one post and record the outcome. No-op when a generation
    /// for the route is already running.
    async fn regenerate_post(&self, slug: &str) {
        let route = post_route(slug);
        if !self.cache.try_claim(&route).await {
            return;
        }

        let start = Instant::now();
        match self.generator.build_post(slug).await {
            Ok(Some(post)) => {
                let page = CachedPage {
                    article: Some(post.article),
                    title: Some(post.title),
                    ..CachedPage::new(post.html, Utc::now())
                };
                self.cache.insert(&route, page).await;
                tracing::info!("Generated {} in {:?}", route, start.elapsed());
            }
            Ok(None) => {
                tracing::info!("No post for {}", route);
                self.cache.finish(&route, Outcome::NotFound, Utc::now()).await;
            }
            Err(e) => {
                tracing::error!("Failed to generate {}: {:#}", route, e);
                self.cache
                    .finish(&route, Outcome::Failed(e.to_string()), Utc::now())
                    .await;
            }
        }
    }

    /// Replay load-more from the initial page until `pages` pages are
    /// loaded. Pages behind a cursor are fetched once per revalidation
    /// window. The first failure stops the replay.
    async fn load_home(&self, initial: Paginated<PostSummary>, pages: usize) -> LoadedList {
        let mut list = PostList::new(initial);
        let mut loaded = 1;
        let mut notice = false;

        while loaded < pages {
            let Ok(pending) = list.begin_load() else {
                break;
            };
            let now = Utc::now();
            let outcome = match self.cache.cursor_page(pending.cursor(), now).await {
                Some(page) => Ok(page),
                None => {
                    let outcome = self.generator.fetch_next(pending.cursor()).await;
                    if let Ok(page) = &outcome {
                        self.cache
                            .insert_cursor_page(pending.cursor(), page.clone(), now)
                            .await;
                    }
                    outcome
                }
            };

            match list.complete_load(pending, outcome) {
                Ok(_) => loaded += 1,
                Err(e) => {
                    tracing::warn!("{}", e);
                    notice = true;
                    break;
                }
            }
        }

        LoadedList {
            list,
            pages: loaded,
            notice,
        }
    }

    fn spawn_regenerate_post(self: &Arc<Self>, slug: &str) {
        let state = self.clone();
        let slug = slug.to_string();
        tokio::spawn(async move { state.regenerate_post(&slug).await });
    }

    fn not_found(&self) -> Response {
        html_response(StatusCode::NOT_FOUND, self.generator.render_not_found())
    }

    fn post_failed(&self) -> Response {
        (StatusCode::BAD_GATEWAY, self.generator.i18n().get("post_error")).into_response()
    }
}

type SharedState = Arc<ServerState>;

/// Build the router. Unmatched paths are served from `static_dir`.
pub fn router(state: SharedState, static_dir: &FsPath) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/post/:slug", get(post_handler))
        .route("/_data/post/:slug", get(post_data_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(blog: &Blog, ip: &str, port: u16, open: bool) -> Result<()> {
    let generator = Generator::new(blog, blog.content_source()?)?;
    let state = Arc::new(ServerState::new(generator));

    let start = Instant::now();
    let count = state.prebuild().await?;
    tracing::info!("Generated {} pages in {:?}", count, start.elapsed());

    let app = router(state, &blog.static_dir);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Debug, Deserialize)]
struct HomeParams {
    pages: Option<String>,
}

/// Requested page count, clamped to `1..=max`
fn requested_pages(raw: Option<&str>, max: usize) -> usize {
    raw.and_then(|p| p.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, max.max(1))
}

async fn home_handler(
    State(state): State<SharedState>,
    Query(params): Query<HomeParams>,
) -> Response {
    let page = match state.cache.lookup(HOME_ROUTE, Utc::now()).await {
        Lookup::Fresh(page) => page,
        Lookup::Stale(page) => {
            let bg = state.clone();
            tokio::spawn(async move { bg.revalidate_home().await });
            page
        }
        Lookup::Missing => match state.refresh_home().await {
            Ok(page) => page,
            Err(e) => {
                tracing::error!("Failed to generate the post list: {:#}", e);
                return (StatusCode::BAD_GATEWAY, "Failed to load posts").into_response();
            }
        },
    };

    let pages = requested_pages(
        params.pages.as_deref(),
        state.generator.config().max_loaded_pages,
    );
    let initial = match (&page.home, pages) {
        (Some(initial), n) if n > 1 => initial.clone(),
        _ => return Html(page.html.clone()).into_response(),
    };

    let loaded = state.load_home(initial, pages).await;
    html_response(
        StatusCode::OK,
        state.generator.render_home(
            &loaded.list,
            loaded.pages,
            loaded.notice,
            LoadMoreLinks::Query,
        ),
    )
}

async fn post_handler(State(state): State<SharedState>, Path(slug): Path<String>) -> Response {
    if !is_safe_slug(&slug) {
        return state.not_found();
    }
    let route = post_route(&slug);
    let now = Utc::now();

    match state.cache.lookup(&route, now).await {
        Lookup::Fresh(page) => return Html(page.html.clone()).into_response(),
        Lookup::Stale(page) => {
            state.spawn_regenerate_post(&slug);
            return Html(page.html.clone()).into_response();
        }
        Lookup::Missing => {}
    }

    if state.cache.outcome(&route, now).await == Some(Outcome::NotFound) {
        return state.not_found();
    }

    match state.fallback() {
        FallbackMode::Disabled => state.not_found(),
        FallbackMode::Blocking => {
            state.regenerate_post(&slug).await;
            match state.cache.state(&route, Utc::now()).await {
                RouteState::Ready(page) => Html(page.html.clone()).into_response(),
                RouteState::NotFound => state.not_found(),
                RouteState::Failed(_) => state.post_failed(),
                // Another request is generating it
                RouteState::Pending | RouteState::Unknown => html_response(
                    StatusCode::OK,
                    state.generator.render_loading(&slug),
                ),
            }
        }
        FallbackMode::Placeholder => {
            state.spawn_regenerate_post(&slug);
            html_response(StatusCode::OK, state.generator.render_loading(&slug))
        }
    }
}

async fn post_data_handler(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
) -> Response {
    if !is_safe_slug(&slug) {
        return json_response(
            StatusCode::NOT_FOUND,
            state.generator.render_page_data("not_found", None, None),
        );
    }
    let route = post_route(&slug);

    let mut route_state = state.cache.state(&route, Utc::now()).await;
    if matches!(route_state, RouteState::Unknown) {
        if state.fallback() == FallbackMode::Disabled {
            route_state = RouteState::NotFound;
        } else {
            state.spawn_regenerate_post(&slug);
        }
    }

    let status = route_state.status();
    let (code, body) = match &route_state {
        RouteState::Ready(page) => (
            StatusCode::OK,
            state.generator.render_page_data(
                status,
                page.article.as_deref(),
                page.title.as_deref(),
            ),
        ),
        RouteState::NotFound => (
            StatusCode::NOT_FOUND,
            state.generator.render_page_data(status, None, None),
        ),
        _ => (
            StatusCode::OK,
            state.generator.render_page_data(status, None, None),
        ),
    };
    json_response(code, body)
}

fn html_response(status: StatusCode, html: Result<String>) -> Response {
    match html {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render page: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

fn json_response(status: StatusCode, body: Result<String>) -> Response {
    match body {
        Ok(body) => (status, [(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            tracing::error!("Failed to encode page data: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}
