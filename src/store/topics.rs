//! Topic catalogue and the user's selection.
//!
//! The catalogue is fixed client-side; only the selected ids live on the
//! server. Edits are local until [`TopicStore::save`] succeeds.

use crate::api::{ApiClient, ApiError};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topic {
    pub id: &'static str,
    pub name: &'static str,
    pub emoji: &'static str,
}

pub const TOPICS: &[Topic] = &[
    Topic { id: "news", name: "News", emoji: "📰" },
    Topic { id: "tech", name: "Technology", emoji: "💻" },
    Topic { id: "sports", name: "Sports", emoji: "⚽" },
    Topic { id: "crypto", name: "Crypto", emoji: "₿" },
    Topic { id: "business", name: "Business", emoji: "💼" },
    Topic { id: "entertainment", name: "Entertainment", emoji: "🎭" },
    Topic { id: "science", name: "Science", emoji: "🔬" },
    Topic { id: "travel", name: "Travel", emoji: "✈️" },
    Topic { id: "health", name: "Health", emoji: "🏥" },
    Topic { id: "education", name: "Education", emoji: "📚" },
    Topic { id: "music", name: "Music", emoji: "🎵" },
    Topic { id: "games", name: "Games", emoji: "🎮" },
];

pub fn find_topic(id: &str) -> Option<&'static Topic> {
    TOPICS.iter().find(|t| t.id == id)
}

#[derive(Debug, Default)]
pub struct TopicStore {
    selected: Vec<String>,
    saved: Vec<String>,
    loading: bool,
    saving: bool,
    error: Option<String>,
}

fn as_set(ids: &[String]) -> BTreeSet<&str> {
    ids.iter().map(String::as_str).collect()
}

impl TopicStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected ids in selection order.
    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.iter().any(|s| s == id)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn begin_load(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Commit a fetched selection as both the working copy and the baseline.
    pub fn apply_load(&mut self, result: Result<Vec<String>, ApiError>) {
        self.loading = false;
        match result {
            Ok(topics) => {
                tracing::debug!(count = topics.len(), "Topics loaded");
                self.saved = topics.clone();
                self.selected = topics;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Topic selection request failed");
                self.error = Some(e.to_string());
            }
        }
    }

    pub async fn load(&mut self, api: &ApiClient) {
        self.begin_load();
        let result = api.topics().await;
        self.apply_load(result);
    }

    /// Flip one topic. Unknown ids are ignored.
    pub fn toggle(&mut self, id: &str) {
        if find_topic(id).is_none() {
            tracing::debug!(topic = id, "Ignoring unknown topic");
            return;
        }
        if let Some(pos) = self.selected.iter().position(|s| s == id) {
            self.selected.remove(pos);
        } else {
            self.selected.push(id.to_string());
        }
    }

    pub fn select_all(&mut self) {
        self.selected = TOPICS.iter().map(|t| t.id.to_string()).collect();
    }

    pub fn clear_all(&mut self) {
        self.selected.clear();
    }

    /// Replace the working selection, keeping only known ids (first occurrence).
    pub fn set_selection<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.selected.clear();
        for id in ids {
            let id = id.as_ref();
            if find_topic(id).is_some() && !self.is_selected(id) {
                self.selected.push(id.to_string());
            }
        }
    }

    /// Whether the working selection differs from the last loaded or saved one.
    /// Order does not matter.
    pub fn has_changes(&self) -> bool {
        as_set(&self.selected) != as_set(&self.saved)
    }

    /// Revert to the baseline.
    pub fn cancel(&mut self) {
        self.selected = self.saved.clone();
    }

    /// Persist the selection. On success it becomes the new baseline;
    /// on failure the edits stay in place and the error is returned.
    pub async fn save(&mut self, api: &ApiClient) -> Result<(), ApiError> {
        let Some(selection) = self.begin_save() else {
            return Ok(());
        };
        let result = api.save_topics(&selection).await;
        self.finish_save(result)
    }

    /// Mark a save as pending and return the selection to send, or `None`
    /// while another save is still running.
    pub fn begin_save(&mut self) -> Option<Vec<String>> {
        if self.saving {
            return None;
        }
        self.saving = true;
        Some(self.selected.clone())
    }

    pub fn finish_save(&mut self, result: Result<(), ApiError>) -> Result<(), ApiError> {
        self.saving = false;
        match result {
            Ok(()) => {
                tracing::info!(count = self.selected.len(), "Topics saved");
                self.saved = self.selected.clone();
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Saving topics failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(ids: &[&str]) -> TopicStore {
        let mut store = TopicStore::new();
        store.begin_load();
        store.apply_load(Ok(ids.iter().map(|s| s.to_string()).collect()));
        store
    }

    #[test]
    fn test_catalogue_has_twelve_unique_ids() {
        assert_eq!(TOPICS.len(), 12);
        let ids: BTreeSet<_> = TOPICS.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 12);
    }

    #[test]
    fn test_has_changes_is_order_insensitive() {
        let mut store = loaded(&["tech", "news"]);
        assert!(!store.has_changes());

        store.toggle("tech");
        store.toggle("tech");
        assert_eq!(store.selected(), &["news".to_string(), "tech".to_string()]);
        assert!(!store.has_changes());

        store.toggle("music");
        assert!(store.has_changes());
    }

    #[test]
    fn test_cancel_reverts() {
        let mut store = loaded(&["news"]);
        store.select_all();
        assert_eq!(store.selected().len(), 12);
        store.cancel();
        assert_eq!(store.selected(), &["news".to_string()]);

        store.clear_all();
        assert!(store.has_changes());
    }

    #[test]
    fn test_failed_save_keeps_edits_and_baseline() {
        let mut store = loaded(&["news"]);
        store.toggle("games");
        let err = store
            .finish_save(Err(ApiError::Rejected(Some("nope".into()))))
            .unwrap_err();
        assert_eq!(err.to_string(), "nope");
        assert!(store.is_selected("games"));
        assert!(store.has_changes());

        store.finish_save(Ok(())).unwrap();
        assert!(!store.has_changes());
    }

    #[test]
    fn test_one_save_at_a_time() {
        let mut store = loaded(&[]);
        store.toggle("science");
        assert_eq!(store.begin_save(), Some(vec!["science".to_string()]));
        assert!(store.is_saving());
        assert_eq!(store.begin_save(), None);

        store.finish_save(Ok(())).unwrap();
        assert!(!store.is_saving());
    }

    #[test]
    fn test_unknown_topics_are_ignored() {
        let mut store = loaded(&[]);
        store.toggle("cooking");
        assert!(store.selected().is_empty());

        store.set_selection(["tech", "cooking", "tech", "music"]);
        assert_eq!(store.selected(), &["tech".to_string(), "music".to_string()]);
    }

    #[test]
    fn test_failed_load_keeps_selection() {
        let mut store = loaded(&["news"]);
        store.begin_load();
        store.apply_load(Err(ApiError::HttpStatus(500)));
        assert_eq!(store.selected(), &["news".to_string()]);
        assert!(store.error().is_some());
    }
}
