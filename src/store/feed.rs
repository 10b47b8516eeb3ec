//! Paginated "My feed" collection.
//!
//! Pages are requested forward only. Appended pages are de-duplicated by post
//! id because the backend's pages are not disjoint when new posts arrive
//! between requests. A failed request never commits partial state.

use crate::api::{ApiClient, ApiError, FeedPage, ItemId, Post};
use std::collections::HashSet;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Infinite-scroll trigger: remaining scroll distance as a multiple of the viewport.
const LOAD_MORE_THRESHOLD: f64 = 1.5;

/// Position in the paginated feed.
///
/// `has_more == false` is terminal until the next refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub has_more: bool,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            has_more: true,
        }
    }
}

/// Ticket for one outstanding feed request, handed back to [`FeedStore::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedRequest {
    pub page: u32,
    pub append: bool,
}

#[derive(Debug)]
pub struct FeedStore {
    items: Vec<Post>,
    seen: HashSet<ItemId>,
    in_flight: usize,
    error: Option<String>,
    pagination: Pagination,
    page_size: u32,
}

impl Default for FeedStore {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl FeedStore {
    pub fn new(page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
            in_flight: 0,
            error: None,
            pagination: Pagination::default(),
            page_size: page_size.max(1),
        }
    }

    pub fn items(&self) -> &[Post] {
        &self.items
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn has_more(&self) -> bool {
        self.pagination.has_more
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Start a refresh of page 1. Overlapping refreshes are not coalesced.
    pub fn begin_refresh(&mut self) -> FeedRequest {
        self.in_flight += 1;
        self.error = None;
        FeedRequest {
            page: 1,
            append: false,
        }
    }

    /// Start loading the next page, or `None` if a request is pending or the
    /// feed is exhausted.
    pub fn begin_load_more(&mut self) -> Option<FeedRequest> {
        if self.is_loading() || !self.pagination.has_more {
            return None;
        }
        self.in_flight += 1;
        self.error = None;
        Some(FeedRequest {
            page: self.pagination.page.saturating_add(1),
            append: true,
        })
    }

    /// Commit the outcome of `request`. Returns the number of posts added.
    pub fn apply(&mut self, request: FeedRequest, result: Result<FeedPage, ApiError>) -> usize {
        self.in_flight = self.in_flight.saturating_sub(1);

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(page = request.page, error = %e, "Feed request failed");
                self.error = Some(e.to_string());
                return 0;
            }
        };

        if !request.append {
            self.items.clear();
            self.seen.clear();
        }

        let before = self.items.len();
        for post in page.posts {
            if self.seen.insert(post.id.clone()) {
                self.items.push(post);
            }
        }
        let added = self.items.len() - before;

        self.pagination = Pagination {
            page: request.page,
            has_more: page.has_more,
        };

        tracing::debug!(
            page = request.page,
            added,
            total = self.items.len(),
            has_more = page.has_more,
            "Feed page applied"
        );
        added
    }

    pub async fn refresh(&mut self, api: &ApiClient) {
        let request = self.begin_refresh();
        let result = api.feed_page(request.page, self.page_size).await;
        self.apply(request, result);
    }

    /// Returns false when no request was issued.
    pub async fn load_more(&mut self, api: &ApiClient) -> bool {
        let Some(request) = self.begin_load_more() else {
            return false;
        };
        let result = api.feed_page(request.page, self.page_size).await;
        self.apply(request, result);
        true
    }

    /// Whether a scroll position is close enough to the bottom to fetch the next page.
    pub fn should_load_more(&self, scroll_top: f64, scroll_height: f64, client_height: f64) -> bool {
        self.pagination.has_more
            && !self.is_loading()
            && scroll_height - scroll_top <= client_height * LOAD_MORE_THRESHOLD
    }
}
