use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque record identifier as issued by the backend.
///
/// The backend is not consistent about id types (numeric ids for posts from the
/// database, string ids for some channel records), so both shapes are accepted
/// and compared structurally. `1` and `"1"` are different ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Int(i64),
    Str(String),
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Int(n) => write!(f, "{}", n),
            ItemId::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ItemId {
    fn from(n: i64) -> Self {
        ItemId::Int(n)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId::Str(s.to_string())
    }
}

impl ItemId {
    /// Parse user input: all-digit strings become numeric ids.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed.parse::<i64>() {
            Ok(n) => ItemId::Int(n),
            Err(_) => ItemId::Str(trimmed.to_string()),
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// Channel summary embedded in a post. Not linked to the channel store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelRef {
    pub name: String,
    pub avatar: String,
    pub username: Option<String>,
}

/// A single post as returned by the feed, recommendation and search endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: ItemId,
    #[serde(default)]
    pub channel: ChannelRef,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
    /// Pre-formatted by the backend ("2 hours ago"), not parsed.
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub post_url: String,
}

/// A subscribed channel as returned by `channels`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ItemId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub post_count: Option<u64>,
    #[serde(default)]
    pub subscribers: Option<u64>,
}

/// Readiness of the backend's AI model.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AiStatus {
    #[serde(default)]
    pub is_loaded: bool,
    #[serde(default)]
    pub loading: bool,
    /// Percent, 0..=100.
    #[serde(default)]
    pub load_progress: f64,
}

// ============================================================================
// Response payloads
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct FeedPage {
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(rename = "hasMore", default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostList {
    #[serde(default)]
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelList {
    #[serde(default)]
    pub channels: Vec<Channel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicList {
    #[serde(default)]
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiStatusResponse {
    pub status: AiStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionList {
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_id_accepts_numbers_and_strings() {
        let a: ItemId = serde_json::from_value(json!(42)).unwrap();
        let b: ItemId = serde_json::from_value(json!("abc")).unwrap();
        assert_eq!(a, ItemId::Int(42));
        assert_eq!(b, ItemId::Str("abc".to_string()));
        assert_ne!(ItemId::Int(1), ItemId::Str("1".to_string()));
    }

    #[test]
    fn test_item_id_parse_user_input() {
        assert_eq!(ItemId::parse(" 17 "), ItemId::Int(17));
        assert_eq!(ItemId::parse("chan-9"), ItemId::from("chan-9"));
    }

    #[test]
    fn test_post_missing_fields_default() {
        let post: Post = serde_json::from_value(json!({"id": 7})).unwrap();
        assert_eq!(post.id, ItemId::Int(7));
        assert!(post.title.is_empty());
        assert!(post.image.is_none());
        assert!(post.channel.username.is_none());
    }

    #[test]
    fn test_feed_page_reads_camel_case_has_more() {
        let page: FeedPage = serde_json::from_value(json!({
            "success": true,
            "posts": [{"id": 1, "title": "t"}],
            "hasMore": true
        }))
        .unwrap();
        assert_eq!(page.posts.len(), 1);
        assert!(page.has_more);
    }

    #[test]
    fn test_channel_optional_counters() {
        let channel: Channel = serde_json::from_value(json!({
            "id": "c1",
            "name": "Tech",
            "username": "tech",
            "avatar": "T",
            "post_count": 12
        }))
        .unwrap();
        assert_eq!(channel.post_count, Some(12));
        assert_eq!(channel.subscribers, None);
    }
}
