//! The paginated post list with its load-more cursor

use super::post::PostSummary;
use crate::cms::{CmsError, ContentSource, Paginated};

#[derive(Debug, thiserror::Error)]
pub enum LoadMoreError {
    #[error("No more posts to load")]
    Exhausted,

    #[error("A load is already in progress")]
    InFlight,

    #[error("Failed to load more posts: {0}")]
    Failed(#[from] CmsError),
}

/// A started load. Hand it back to [`PostList::complete_load`].
#[derive(Debug)]
#[must_use]
pub struct PendingLoad {
    cursor: String,
}

impl PendingLoad {
    pub fn cursor(&self) -> &str {
        &self.cursor
    }
}

/// Posts loaded so far, in CMS order, plus the cursor to the next page.
///
/// The list only grows. A failed load leaves both the posts and the cursor
/// as they were.
#[derive(Debug, Clone, Default)]
pub struct PostList {
    posts: Vec<PostSummary>,
    next_page: Option<String>,
    in_flight: bool,
}

impl PostList {
    pub fn new(initial: Paginated<PostSummary>) -> Self {
        Self {
            posts: initial.results,
            next_page: initial.next_page,
            in_flight: false,
        }
    }

    pub fn posts(&self) -> &[PostSummary] {
        &self.posts
    }

    pub fn next_page(&self) -> Option<&str> {
        self.next_page.as_deref()
    }

    /// Whether the load-more control is enabled
    pub fn can_load_more(&self) -> bool {
        self.next_page.is_some() && !self.in_flight
    }

    pub fn begin_load(&mut self) -> Result<PendingLoad, LoadMoreError> {
        if self.in_flight {
            return Err(LoadMoreError::InFlight);
        }
        let cursor = self.next_page.clone().ok_or(LoadMoreError::Exhausted)?;
        self.in_flight = true;
        Ok(PendingLoad { cursor })
    }

    /// Apply the outcome of a load. Returns the number of appended posts.
    pub fn complete_load(
        &mut self,
        _pending: PendingLoad,
        outcome: Result<Paginated<PostSummary>, CmsError>,
    ) -> Result<usize, LoadMoreError> {
        self.in_flight = false;
        let page = outcome?;
        let added = page.results.len();
        self.posts.extend(page.results);
        self.next_page = page.next_page;
        Ok(added)
    }

    /// Fetch the next page through `source` and append it
    pub async fn load_more(&mut self, source: &dyn ContentSource) -> Result<usize, LoadMoreError> {
        let pending = self.begin_load()?;
        tracing::debug!("Loading more posts from {}", pending.cursor());
        let outcome = match source.fetch_page(pending.cursor()).await {
            Ok(page) => page
                .try_map(PostSummary::from_document)
                .map_err(CmsError::from),
            Err(e) => Err(e),
        };
        self.complete_load(pending, outcome)
    }
}
