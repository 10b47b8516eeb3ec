use crate::api::{ApiClient, ApiError, Post};

pub const DEFAULT_RECOMMENDATION_LIMIT: u32 = 10;

/// Personal recommendations ("Discover"). One page, replaced on every refresh.
#[derive(Debug)]
pub struct RecommendationStore {
    items: Vec<Post>,
    in_flight: usize,
    error: Option<String>,
    limit: u32,
}

impl Default for RecommendationStore {
    fn default() -> Self {
        Self::new(DEFAULT_RECOMMENDATION_LIMIT)
    }
}

impl RecommendationStore {
    pub fn new(limit: u32) -> Self {
        Self {
            items: Vec::new(),
            in_flight: 0,
            error: None,
            limit: limit.max(1),
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

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn begin_refresh(&mut self) {
        self.in_flight += 1;
        self.error = None;
    }

    pub fn apply(&mut self, result: Result<Vec<Post>, ApiError>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match result {
            Ok(posts) => {
                tracing::debug!(count = posts.len(), "Recommendations loaded");
                self.items = posts;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Recommendations request failed");
                self.error = Some(e.to_string());
            }
        }
    }

    pub async fn refresh(&mut self, api: &ApiClient) {
        self.begin_refresh();
        let result = api.recommendations(self.limit).await;
        self.apply(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ChannelRef, ItemId};

    fn post(id: i64) -> Post {
        Post {
            id: ItemId::Int(id),
            channel: ChannelRef::default(),
            title: String::new(),
            content: String::new(),
            image: None,
            date: String::new(),
            post_url: String::new(),
        }
    }

    #[test]
    fn test_refresh_replaces_wholesale() {
        let mut store = RecommendationStore::default();
        store.begin_refresh();
        store.apply(Ok(vec![post(1), post(2)]));
        store.begin_refresh();
        store.apply(Ok(vec![post(1), post(2)]));
        assert_eq!(store.items().len(), 2);

        store.begin_refresh();
        store.apply(Ok(vec![post(9)]));
        assert_eq!(store.items()[0].id, ItemId::Int(9));
    }

    #[test]
    fn test_failure_keeps_previous_items() {
        let mut store = RecommendationStore::default();
        store.begin_refresh();
        store.apply(Ok(vec![post(1)]));
        store.begin_refresh();
        assert!(store.is_loading());
        store.apply(Err(ApiError::HttpStatus(500)));

        assert!(!store.is_loading());
        assert_eq!(store.items().len(), 1);
        assert!(store.error().is_some());
    }
}
