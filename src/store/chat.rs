//! AI assistant conversation and model readiness.

use crate::api::{AiStatus, ApiClient, ApiError};
use chrono::{DateTime, Local};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const GREETING: &str = "👋 Hi! I'm TelePulse AI, your guide to interesting Telegram content. \
Ask me about posts, channels or trends!";

/// Appended in place of a reply whenever `ai/chat` fails for any reason.
pub const ERROR_NOTICE: &str = "⚠️ Something went wrong while sending your message. Please try again.";

pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(2);

/// Suggestions are only offered at the start of a conversation.
const SUGGESTION_TRANSCRIPT_LIMIT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: u64,
    pub author: Author,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    suggestions: Vec<String>,
    sending: bool,
    status: AiStatus,
    next_id: u64,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    /// Open a conversation seeded with the assistant greeting.
    pub fn new() -> Self {
        let mut session = Self {
            messages: Vec::new(),
            suggestions: Vec::new(),
            sending: false,
            status: AiStatus::default(),
            next_id: 1,
        };
        session.push(Author::Assistant, GREETING.to_string());
        session
    }

    fn push(&mut self, author: Author, content: String) {
        self.messages.push(ChatMessage {
            id: self.next_id,
            author,
            content,
            timestamp: Local::now(),
        });
        self.next_id += 1;
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Suggestions to display; empty once the conversation has moved on.
    pub fn visible_suggestions(&self) -> &[String] {
        if self.messages.len() <= SUGGESTION_TRANSCRIPT_LIMIT {
            &self.suggestions
        } else {
            &[]
        }
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn status(&self) -> AiStatus {
        self.status
    }

    pub fn set_status(&mut self, status: AiStatus) {
        self.status = status;
    }

    pub fn can_send(&self) -> bool {
        self.status.is_loaded && !self.sending
    }

    /// Append the user's message and mark a send in flight.
    ///
    /// Returns the text to send, or `None` for blank input or while a send
    /// is already pending.
    pub fn begin_send(&mut self, text: &str) -> Option<String> {
        if text.trim().is_empty() || self.sending {
            return None;
        }
        self.push(Author::User, text.to_string());
        self.sending = true;
        Some(text.to_string())
    }

    /// Commit the reply to the pending send. Returns false (and changes
    /// nothing) when no send is pending.
    pub fn finish_send(&mut self, result: Result<String, ApiError>) -> bool {
        if !self.sending {
            tracing::debug!("Ignoring AI reply with no message pending");
            return false;
        }
        self.sending = false;
        match result {
            Ok(reply) => self.push(Author::Assistant, reply),
            Err(e) => {
                tracing::warn!(error = %e, "AI chat request failed");
                self.push(Author::Assistant, ERROR_NOTICE.to_string());
            }
        }
        true
    }

    /// Returns false when nothing was sent.
    pub async fn send(&mut self, api: &ApiClient, text: &str) -> bool {
        let Some(message) = self.begin_send(text) else {
            return false;
        };
        let result = api.ai_chat(&message).await;
        self.finish_send(result);
        true
    }

    /// Failures keep the previous suggestions.
    pub fn apply_suggestions(&mut self, result: Result<Vec<String>, ApiError>) {
        match result {
            Ok(suggestions) => self.suggestions = suggestions,
            Err(e) => tracing::warn!(error = %e, "Loading AI suggestions failed"),
        }
    }

    pub async fn load_suggestions(&mut self, api: &ApiClient) {
        let result = api.ai_suggestions().await;
        self.apply_suggestions(result);
    }
}

// ============================================================================
// Status poller
// ============================================================================

/// Background task polling `ai/status` on a fixed interval.
///
/// The latest successful status is published on a watch channel. Dropping
/// the poller aborts the task, so no request is issued afterwards.
#[derive(Debug)]
pub struct AiStatusPoller {
    handle: JoinHandle<()>,
    status: watch::Receiver<Option<AiStatus>>,
}

impl AiStatusPoller {
    pub fn spawn(api: ApiClient, interval: Duration) -> Self {
        let (tx, status) = watch::channel(None);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match api.ai_status().await {
                    Ok(s) => {
                        if tx.send(Some(s)).is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::debug!(error = %e, "AI status poll failed"),
                }
            }
        });
        Self { handle, status }
    }

    /// Most recent status, `None` before the first successful poll.
    pub fn latest(&self) -> Option<AiStatus> {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<AiStatus>> {
        self.status.clone()
    }
}

impl Drop for AiStatusPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
