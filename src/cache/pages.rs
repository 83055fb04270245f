//! In-memory cache of rendered pages used by the server
//!
//! Pages older than the revalidation window are still served while one
//! regeneration runs. At most one generation per route is in flight; a
//! route is claimed with [`PageCache::try_claim`] and released with
//! [`PageCache::finish`] or [`PageCache::insert`].
//!
//! Outcomes and load-more pages are kept for one revalidation window and at
//! most [`MAX_RECORDS`] of each.

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::cms::Paginated;
use crate::content::PostSummary;

pub const MAX_RECORDS: usize = 10_000;

#[derive(Debug, Clone)]
pub struct CachedPage {
    pub html: String,
    /// Article fragment of a post page
    pub article: Option<String>,
    pub title: Option<String>,
    /// Initial page of the post list, kept to replay `?pages=N`
    pub home: Option<Paginated<PostSummary>>,
    pub generated_at: DateTime<Utc>,
}

impl CachedPage {
    pub fn new(html: String, generated_at: DateTime<Utc>) -> Self {
        Self {
            html,
            article: None,
            title: None,
            home: None,
            generated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Lookup {
    Fresh(Arc<CachedPage>),
    Stale(Arc<CachedPage>),
    Missing,
}

/// Result of a generation that produced no page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NotFound,
    Failed(String),
}

/// What the page-data endpoint reports for a route
#[derive(Debug, Clone)]
pub enum RouteState {
    Ready(Arc<CachedPage>),
    Pending,
    NotFound,
    Failed(String),
    Unknown,
}

impl RouteState {
    pub fn status(&self) -> &'static str {
        match self {
            RouteState::Ready(_) => "ready",
            RouteState::Pending | RouteState::Unknown => "pending",
            RouteState::NotFound => "not_found",
            RouteState::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    pages: HashMap<String, Arc<CachedPage>>,
    in_flight: HashSet<String>,
    outcomes: HashMap<String, (Outcome, DateTime<Utc>)>,
    /// Post list pages by load-more cursor
    cursors: HashMap<String, (Paginated<PostSummary>, DateTime<Utc>)>,
}

/// Drop expired records, then the oldest ones, to make room for one more
fn prune<V>(
    records: &mut HashMap<String, (V, DateTime<Utc>)>,
    revalidate: Duration,
    now: DateTime<Utc>,
) {
    records.retain(|_, (_, at)| now.signed_duration_since(*at) < revalidate);
    while records.len() >= MAX_RECORDS {
        let oldest = records
            .iter()
            .min_by_key(|(_, (_, at))| *at)
            .map(|(key, _)| key.clone());
        match oldest {
            Some(key) => records.remove(&key),
            None => break,
        };
    }
}

#[derive(Debug)]
pub struct PageCache {
    inner: RwLock<Inner>,
    revalidate: Duration,
}

impl PageCache {
    pub fn new(revalidate: Duration) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            revalidate,
        }
    }

    fn is_fresh(&self, since: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(since) < self.revalidate
    }

    pub async fn lookup(&self, route: &str, now: DateTime<Utc>) -> Lookup {
        let inner = self.inner.read().await;
        match inner.pages.get(route) {
            Some(page) if self.is_fresh(page.generated_at, now) => Lookup::Fresh(page.clone()),
            Some(page) => Lookup::Stale(page.clone()),
            None => Lookup::Missing,
        }
    }

    /// Store a page and release the route
    pub async fn insert(&self, route: &str, page: CachedPage) {
        let mut inner = self.inner.write().await;
        inner.in_flight.remove(route);
        inner.outcomes.remove(route);
        inner.pages.insert(route.to_string(), Arc::new(page));
    }

    /// Claim a route for generation. `false` when a generation is running.
    pub async fn try_claim(&self, route: &str) -> bool {
        self.inner.write().await.in_flight.insert(route.to_string())
    }

    /// Release a route after a generation that produced no page
    pub async fn finish(&self, route: &str, outcome: Outcome, now: DateTime<Utc>) {
        let mut inner = self.inner.write().await;
        inner.in_flight.remove(route);
        if outcome == Outcome::NotFound {
            inner.pages.remove(route);
        }
        inner.outcomes.remove(route);
        prune(&mut inner.outcomes, self.revalidate, now);
        inner.outcomes.insert(route.to_string(), (outcome, now));
    }

    /// A recorded outcome, as long as it is within the revalidation window
    pub async fn outcome(&self, route: &str, now: DateTime<Utc>) -> Option<Outcome> {
        let inner = self.inner.read().await;
        inner
            .outcomes
            .get(route)
            .filter(|(_, at)| self.is_fresh(*at, now))
            .map(|(outcome, _)| outcome.clone())
    }

    pub async fn state(&self, route: &str, now: DateTime<Utc>) -> RouteState {
        let inner = self.inner.read().await;
        if let Some(page) = inner.pages.get(route) {
            return RouteState::Ready(page.clone());
        }
        if inner.in_flight.contains(route) {
            return RouteState::Pending;
        }
        match inner.outcomes.get(route) {
            Some((outcome, at)) if self.is_fresh(*at, now) => match outcome {
                Outcome::NotFound => RouteState::NotFound,
                Outcome::Failed(msg) => RouteState::Failed(msg.clone()),
            },
            _ => RouteState::Unknown,
        }
    }

    /// A post list page fetched through `cursor` within the window
    pub async fn cursor_page(
        &self,
        cursor: &str,
        now: DateTime<Utc>,
    ) -> Option<Paginated<PostSummary>> {
        let inner = self.inner.read().await;
        inner
            .cursors
            .get(cursor)
            .filter(|(_, at)| self.is_fresh(*at, now))
            .map(|(page, _)| page.clone())
    }

    pub async fn insert_cursor_page(
        &self,
        cursor: &str,
        page: Paginated<PostSummary>,
        now: DateTime<Utc>,
    ) {
        let mut inner = self.inner.write().await;
        inner.cursors.remove(cursor);
        prune(&mut inner.cursors, self.revalidate, now);
        inner.cursors.insert(cursor.to_string(), (page, now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> PageCache {
        PageCache::new(Duration::seconds(60))
    }

    #[tokio::test]
    async fn test_fresh_then_stale() {
        let cache = cache();
        let t0 = Utc::now();
        cache.insert("/", CachedPage::new("home".into(), t0)).await;

        assert!(matches!(cache.lookup("/", t0).await, Lookup::Fresh(_)));
        assert!(matches!(
            cache.lookup("/", t0 + Duration::seconds(59)).await,
            Lookup::Fresh(_)
        ));
        match cache.lookup("/", t0 + Duration::seconds(60)).await {
            Lookup::Stale(page) => assert_eq!(page.html, "home"),
            other => panic!("expected stale page, got {:?}", other),
        }
        assert!(matches!(cache.lookup("/other", t0).await, Lookup::Missing));
    }

    #[tokio::test]
    async fn test_single_claim_per_route() {
        let cache = cache();
        assert!(cache.try_claim("/post/a").await);
        assert!(!cache.try_claim("/post/a").await);
        assert!(cache.try_claim("/post/b").await);

        cache
            .insert("/post/a", CachedPage::new("a".into(), Utc::now()))
            .await;
        assert!(cache.try_claim("/post/a").await);
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let cache = cache();
        let now = Utc::now();
        assert!(matches!(cache.state("/post/a", now).await, RouteState::Unknown));

        cache.try_claim("/post/a").await;
        assert_eq!(cache.state("/post/a", now).await.status(), "pending");

        cache.insert("/post/a", CachedPage::new("a".into(), now)).await;
        assert_eq!(cache.state("/post/a", now).await.status(), "ready");
    }

    #[tokio::test]
    async fn test_not_found_drops_page_and_expires() {
        let cache = cache();
        let now = Utc::now();
        cache.insert("/post/a", CachedPage::new("a".into(), now)).await;
        cache.try_claim("/post/a").await;
        cache.finish("/post/a", Outcome::NotFound, now).await;

        assert!(matches!(cache.lookup("/post/a", now).await, Lookup::Missing));
        assert_eq!(cache.state("/post/a", now).await.status(), "not_found");
        assert_eq!(cache.outcome("/post/a", now).await, Some(Outcome::NotFound));

        let later = now + Duration::seconds(61);
        assert_eq!(cache.outcome("/post/a", later).await, None);
        assert!(matches!(cache.state("/post/a", later).await, RouteState::Unknown));
    }

    #[tokio::test]
    async fn test_failure_keeps_stale_page() {
        let cache = cache();
        let now = Utc::now();
        cache.insert("/post/a", CachedPage::new("old".into(), now)).await;
        cache.try_claim("/post/a").await;
        cache
            .finish("/post/a", Outcome::Failed("boom".into()), now)
            .await;

        match cache.state("/post/a", now).await {
            RouteState::Ready(page) => assert_eq!(page.html, "old"),
            other => panic!("expected ready, got {:?}", other),
        }
        assert_eq!(cache.inner.read().await.pages.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_outcomes_are_dropped() {
        let cache = cache();
        let now = Utc::now();
        for i in 0..1000 {
            cache
                .finish(&format!("/post/ghost-{}", i), Outcome::NotFound, now)
                .await;
        }
        assert_eq!(cache.inner.read().await.outcomes.len(), 1000);

        let later = now + Duration::days(30);
        cache.finish("/post/late", Outcome::NotFound, later).await;
        assert_eq!(cache.inner.read().await.outcomes.len(), 1);
        assert_eq!(cache.outcome("/post/late", later).await, Some(Outcome::NotFound));
    }

    #[tokio::test]
    async fn test_outcomes_are_bounded() {
        let cache = cache();
        let t0 = Utc::now();
        for i in 0..MAX_RECORDS + 5 {
            let at = t0 + Duration::milliseconds(i as i64);
            cache
                .finish(&format!("/post/ghost-{}", i), Outcome::NotFound, at)
                .await;
        }
        let inner = cache.inner.read().await;
        assert_eq!(inner.outcomes.len(), MAX_RECORDS);
        assert!(!inner.outcomes.contains_key("/post/ghost-0"));
        assert!(inner
            .outcomes
            .contains_key(&format!("/post/ghost-{}", MAX_RECORDS + 4)));
    }

    #[tokio::test]
    async fn test_cursor_pages_expire() {
        let cache = cache();
        let now = Utc::now();
        let page: Paginated<PostSummary> = Paginated::new(Vec::new(), Some("c3".into()));
        cache.insert_cursor_page("c2", page, now).await;

        let hit = cache.cursor_page("c2", now).await.unwrap();
        assert_eq!(hit.next_page.as_deref(), Some("c3"));
        assert!(cache.cursor_page("c9", now).await.is_none());
        assert!(cache
            .cursor_page("c2", now + Duration::seconds(60))
            .await
            .is_none());
    }
}
