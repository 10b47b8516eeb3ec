//! Interactive client session.
//!
//! A [`Session`] owns the API client, every store and the navigation
//! controller. Network work runs on spawned tasks that report back through
//! an mpsc channel as [`SessionEvent`]s; the owner feeds those into
//! [`Session::handle_event`], so state is only ever mutated on one task.

use crate::api::{ApiClient, ApiError, Channel, FeedPage, ItemId, Post};
use crate::config::Config;
use crate::nav::{BackOutcome, NavController, Overlay, OverlayKind, PostSource, Section, SettingsTab};
use crate::store::channels::{PendingRemoval, RemovalTicket};
use crate::store::{
    AiStatusPoller, ChannelStore, ChatSession, Debouncer, FeedRequest, FeedStore,
    RecommendationStore, SearchRequest, SearchStore, TopicStore,
};
use futures::FutureExt;
use serde_json::Value;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Capacity of the event channel between tasks and the session owner.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// Events
// ============================================================================

/// Completion of a background task.
#[derive(Debug)]
pub enum SessionEvent {
    FeedLoaded {
        request: FeedRequest,
        result: Result<FeedPage, ApiError>,
    },
    RecommendationsLoaded(Result<Vec<Post>, ApiError>),
    /// Fields:
    /// - `request`: the ticket issued when the search was spawned, for stale detection
    SearchCompleted {
        request: SearchRequest,
        result: Result<Vec<Post>, ApiError>,
    },
    ChannelsLoaded(Result<Vec<Channel>, ApiError>),
    ChannelAdded {
        identifier: String,
        from_post: bool,
        result: Result<Value, ApiError>,
    },
    ChannelRemoved {
        ticket: RemovalTicket,
        result: Result<(), ApiError>,
    },
    TopicsLoaded(Result<Vec<String>, ApiError>),
    TopicsSaved(Result<(), ApiError>),
    /// `generation` identifies the chat that asked; replies to a closed chat are dropped.
    ChatReplied {
        generation: u64,
        result: Result<String, ApiError>,
    },
    SuggestionsLoaded {
        generation: u64,
        result: Result<Vec<String>, ApiError>,
    },
    Liked {
        post_url: String,
        result: Result<(), ApiError>,
    },
    /// A background task panicked.
    TaskPanicked {
        task: &'static str,
        error: String,
    },
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub feed_page_size: u32,
    pub recommendation_limit: u32,
    pub search_debounce: Duration,
    pub ai_status_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            feed_page_size: config.feed_page_size,
            recommendation_limit: config.recommendation_limit,
            search_debounce: config.search_debounce(),
            ai_status_interval: config.ai_status_interval(),
        }
    }
}

/// Wrap a future so a panic becomes `Err(message)` instead of a silently dead task.
async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: Future<Output = T>,
{
    AssertUnwindSafe(future).catch_unwind().await.map_err(|panic| {
        if let Some(s) = panic.downcast_ref::<&'static str>() {
            s.to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        }
    })
}

// ============================================================================
// Session
// ============================================================================

pub struct Session {
    api: ApiClient,
    options: SessionOptions,
    events: mpsc::Sender<SessionEvent>,
    tasks: Vec<JoinHandle<()>>,

    pub feed: FeedStore,
    pub recommendations: RecommendationStore,
    pub search: SearchStore,
    pub channels: ChannelStore,
    pub topics: TopicStore,
    pub chat: Option<ChatSession>,
    nav: NavController,

    search_debounce: Debouncer<String>,
    ai_poller: Option<AiStatusPoller>,
    /// Bumped each time a chat is opened.
    chat_generation: u64,
    /// Channels whose add is confirmed but not yet visible in the list.
    announce_added: Vec<String>,
    status: Option<String>,
}

impl Session {
    /// Create a session and the receiver its tasks report to.
    pub fn new(api: ApiClient, options: SessionOptions) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (events, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let session = Self {
            feed: FeedStore::new(options.feed_page_size),
            recommendations: RecommendationStore::new(options.recommendation_limit),
            search: SearchStore::new(),
            channels: ChannelStore::new(),
            topics: TopicStore::new(),
            chat: None,
            nav: NavController::new(),
            search_debounce: Debouncer::new(options.search_debounce),
            ai_poller: None,
            chat_generation: 0,
            announce_added: Vec::new(),
            status: None,
            api,
            options,
            events,
            tasks: Vec::new(),
        };
        (session, rx)
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Navigation state. Changes go through the session so overlay side
    /// effects (AI poller, list refreshes) stay in step.
    pub fn nav(&self) -> &NavController {
        &self.nav
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    /// Take the pending status line, if any.
    pub fn take_status(&mut self) -> Option<String> {
        self.status.take()
    }

    /// Number of background tasks that have not finished yet.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.iter().filter(|h| !h.is_finished()).count()
    }

    fn spawn<F>(&mut self, task: &'static str, work: F)
    where
        F: Future<Output = SessionEvent> + Send + 'static,
    {
        self.tasks.retain(|h| !h.is_finished());
        let tx = self.events.clone();
        self.tasks.push(tokio::spawn(async move {
            let event = match catch_task_panic(work).await {
                Ok(event) => event,
                Err(error) => {
                    tracing::error!(task, error = %error, "Background task panicked");
                    SessionEvent::TaskPanicked { task, error }
                }
            };
            if let Err(e) = tx.send(event).await {
                tracing::warn!(task, error = %e, "Channel send failed (receiver dropped)");
            }
        }));
    }

    // ========================================================================
    // Spawners
    // ========================================================================

    pub fn spawn_feed_refresh(&mut self) {
        let request = self.feed.begin_refresh();
        let api = self.api.clone();
        let limit = self.feed.page_size();
        self.spawn("feed_refresh", async move {
            let result = api.feed_page(request.page, limit).await;
            SessionEvent::FeedLoaded { request, result }
        });
    }

    /// Returns false when the store refused (already loading or exhausted).
    pub fn spawn_feed_load_more(&mut self) -> bool {
        let Some(request) = self.feed.begin_load_more() else {
            return false;
        };
        let api = self.api.clone();
        let limit = self.feed.page_size();
        self.spawn("feed_load_more", async move {
            let result = api.feed_page(request.page, limit).await;
            SessionEvent::FeedLoaded { request, result }
        });
        true
    }

    pub fn spawn_recommendations_refresh(&mut self) {
        self.recommendations.begin_refresh();
        let api = self.api.clone();
        let limit = self.recommendations.limit();
        self.spawn("recommendations", async move {
            SessionEvent::RecommendationsLoaded(api.recommendations(limit).await)
        });
    }

    /// Issue a search now, bypassing the debouncer.
    pub fn spawn_search(&mut self, query: &str) {
        let Some(request) = self.search.begin_search(query) else {
            return;
        };
        let api = self.api.clone();
        self.spawn("search", async move {
            let result = api.search(&request.query).await;
            SessionEvent::SearchCompleted { request, result }
        });
    }

    pub fn spawn_channels_refresh(&mut self) {
        self.channels.begin_refresh();
        let api = self.api.clone();
        self.spawn("channels", async move {
            SessionEvent::ChannelsLoaded(api.channels().await)
        });
    }

    /// Add a channel typed by the user. Blank input fails immediately.
    pub fn spawn_add_channel(&mut self, input: &str) -> Result<(), ApiError> {
        let identifier = crate::store::channels::validate_identifier(input)?;
        self.spawn_add(identifier, false);
        Ok(())
    }

    /// Subscribe to a post's channel. Returns false while one is pending for it.
    pub fn spawn_subscribe_from_post(&mut self, post: &Post) -> bool {
        let Some(identifier) = self.channels.begin_subscribe(post) else {
            return false;
        };
        self.spawn_add(identifier, true);
        true
    }

    fn spawn_add(&mut self, identifier: String, from_post: bool) {
        let api = self.api.clone();
        self.spawn("channel_add", async move {
            let result = api.add_channel(&identifier).await;
            SessionEvent::ChannelAdded {
                identifier,
                from_post,
                result,
            }
        });
    }

    /// Send a confirmed removal. Returns false if one is already in flight for that id.
    pub fn spawn_remove_channel(&mut self, pending: PendingRemoval) -> bool {
        let Some(ticket) = self.channels.confirm_remove(pending) else {
            return false;
        };
        let api = self.api.clone();
        self.spawn("channel_remove", async move {
            let result = api.remove_channel(ticket.channel_id()).await;
            SessionEvent::ChannelRemoved { ticket, result }
        });
        true
    }

    pub fn spawn_topics_load(&mut self) {
        self.topics.begin_load();
        let api = self.api.clone();
        self.spawn("topics_load", async move {
            SessionEvent::TopicsLoaded(api.topics().await)
        });
    }

    /// Returns false while a save is already pending.
    pub fn spawn_topics_save(&mut self) -> bool {
        let Some(selection) = self.topics.begin_save() else {
            return false;
        };
        let api = self.api.clone();
        self.spawn("topics_save", async move {
            SessionEvent::TopicsSaved(api.save_topics(&selection).await)
        });
        true
    }

    pub fn spawn_like(&mut self, post_url: &str) {
        let api = self.api.clone();
        let post_url = post_url.to_string();
        self.spawn("like", async move {
            let result = crate::store::likes::like(&api, &post_url).await;
            SessionEvent::Liked { post_url, result }
        });
    }

    /// Send a chat message. Returns false if the chat is closed, the text is
    /// blank, or a send is pending.
    pub fn spawn_chat_send(&mut self, text: &str) -> bool {
        let Some(message) = self.chat.as_mut().and_then(|chat| chat.begin_send(text)) else {
            return false;
        };
        let api = self.api.clone();
        let generation = self.chat_generation;
        self.spawn("ai_chat", async move {
            let result = api.ai_chat(&message).await;
            SessionEvent::ChatReplied { generation, result }
        });
        true
    }

    fn spawn_suggestions(&mut self) {
        let api = self.api.clone();
        let generation = self.chat_generation;
        self.spawn("ai_suggestions", async move {
            let result = api.ai_suggestions().await;
            SessionEvent::SuggestionsLoaded { generation, result }
        });
    }

    /// Initial loads for a fresh session.
    pub fn start(&mut self) {
        self.spawn_feed_refresh();
        self.spawn_recommendations_refresh();
        self.spawn_channels_refresh();
    }

    // ========================================================================
    // Event handling
    // ========================================================================

    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::FeedLoaded { request, result } => {
                self.feed.apply(request, result);
            }
            SessionEvent::RecommendationsLoaded(result) => {
                self.recommendations.apply(result);
            }
            SessionEvent::SearchCompleted { request, result } => {
                self.search.apply(&request, result);
            }
            SessionEvent::ChannelsLoaded(result) => {
                self.channels.apply_refresh(result);
                // Announce adds only once the list can show them
                if !self.announce_added.is_empty() {
                    let added = std::mem::take(&mut self.announce_added).join(", ");
                    self.set_status(format!("Channel {} added", added));
                }
            }
            SessionEvent::ChannelAdded {
                identifier,
                from_post,
                result,
            } => {
                if from_post {
                    self.channels.finish_subscribe(&identifier);
                }
                match result {
                    Ok(_) => {
                        tracing::info!(channel = %identifier, "Channel added");
                        self.announce_added.push(identifier);
                        if self.nav.overlay_kind() == Some(OverlayKind::AddChannel) {
                            self.close_overlay();
                        }
                        self.spawn_channels_refresh();
                        self.spawn_feed_refresh();
                    }
                    Err(e) => {
                        tracing::warn!(channel = %identifier, error = %e, "Adding channel failed");
                        self.set_status(format!("Failed to add channel: {}", e));
                    }
                }
            }
            SessionEvent::ChannelRemoved { ticket, result } => {
                match self.channels.finish_remove(ticket, result) {
                    Ok(()) => {
                        self.set_status("Channel removed");
                        self.spawn_channels_refresh();
                    }
                    Err(e) => self.set_status(e.message),
                }
            }
            SessionEvent::TopicsLoaded(result) => {
                self.topics.apply_load(result);
            }
            SessionEvent::TopicsSaved(result) => match self.topics.finish_save(result) {
                Ok(()) => self.set_status("Topics saved"),
                Err(e) => self.set_status(format!("Failed to save topics: {}", e)),
            },
            SessionEvent::ChatReplied { generation, result } => match self.current_chat(generation) {
                Some(chat) => {
                    chat.finish_send(result);
                }
                None => tracing::debug!(generation, "Dropping reply for a closed chat"),
            },
            SessionEvent::SuggestionsLoaded { generation, result } => {
                if let Some(chat) = self.current_chat(generation) {
                    chat.apply_suggestions(result);
                }
            }
            SessionEvent::Liked { post_url, result } => match result {
                Ok(()) => self.set_status("Liked"),
                Err(e) => {
                    tracing::debug!(post_url = %post_url, "Like not recorded");
                    self.set_status(format!("Like failed: {}", e));
                }
            },
            SessionEvent::TaskPanicked { task, error } => {
                self.set_status(format!("Internal error in {}: {}", task, error));
            }
        }
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// The open chat, if it is the one `generation` was issued for.
    fn current_chat(&mut self, generation: u64) -> Option<&mut ChatSession> {
        if generation != self.chat_generation {
            return None;
        }
        self.chat.as_mut()
    }

    /// Start or stop the AI chat resources to match the open overlay.
    fn sync_ai_chat(&mut self) {
        let chat_open = self.nav.overlay_kind() == Some(OverlayKind::AiChat);
        match (chat_open, self.ai_poller.is_some()) {
            (true, false) => {
                self.chat_generation = self.chat_generation.wrapping_add(1);
                self.chat = Some(ChatSession::new());
                self.ai_poller = Some(AiStatusPoller::spawn(
                    self.api.clone(),
                    self.options.ai_status_interval,
                ));
                self.spawn_suggestions();
            }
            (false, true) => {
                tracing::debug!("AI chat closed, stopping status poller");
                self.ai_poller = None;
                self.chat = None;
            }
            _ => {}
        }
    }

    /// Copy the poller's latest status into the chat.
    pub fn sync_ai_status(&mut self) {
        let latest = self.ai_poller.as_ref().and_then(AiStatusPoller::latest);
        if let (Some(status), Some(chat)) = (latest, self.chat.as_mut()) {
            chat.set_status(status);
        }
    }

    pub fn ai_poller_active(&self) -> bool {
        self.ai_poller.is_some()
    }

    fn reset_search(&mut self) {
        self.search_debounce.cancel();
        self.spawn_search("");
    }

    /// Bottom-navigation click. Switching to a list section refreshes it.
    pub fn select_section(&mut self, section: Section) {
        let had_query = !self.nav.search_query().is_empty();
        self.nav.select_section(section);
        if had_query {
            self.reset_search();
        }
        match section {
            Section::Feed => self.spawn_feed_refresh(),
            Section::Discover => self.spawn_recommendations_refresh(),
            Section::Settings => self.spawn_channels_refresh(),
            Section::Ai => {}
        }
        self.sync_ai_chat();
    }

    pub fn open_overlay(&mut self, overlay: Overlay) {
        let kind = overlay.kind();
        self.nav.open_overlay(overlay);
        match kind {
            OverlayKind::ChannelList => self.spawn_channels_refresh(),
            OverlayKind::TopicList => self.spawn_topics_load(),
            _ => {}
        }
        self.sync_ai_chat();
    }

    /// Open the add-channel form, replacing whatever overlay is open.
    pub fn open_add_channel(&mut self) {
        self.open_overlay(Overlay::AddChannel);
    }

    pub fn set_settings_tab(&mut self, tab: SettingsTab) {
        self.nav.set_settings_tab(tab);
        if tab == SettingsTab::Topics {
            self.spawn_topics_load();
        }
    }

    pub fn close_overlay(&mut self) -> Option<OverlayKind> {
        let closed = self.nav.close_overlay();
        self.sync_ai_chat();
        closed
    }

    /// Host back signal.
    pub fn back(&mut self) -> BackOutcome {
        let outcome = self.nav.back();
        if outcome == BackOutcome::ClearedSearch {
            self.reset_search();
        }
        self.sync_ai_chat();
        outcome
    }

    /// Keystroke in the search box; the request fires after the debounce window.
    pub fn set_search_query(&mut self, query: &str) {
        self.nav.set_search_query(query);
        self.search_debounce.push(query.to_string());
    }

    /// Fire the debounced search if its window elapsed. Returns true if it fired.
    pub fn poll_search(&mut self) -> bool {
        match self.search_debounce.poll() {
            Some(query) => {
                self.spawn_search(&query);
                true
            }
            None => false,
        }
    }

    pub fn search_deadline(&self) -> Option<tokio::time::Instant> {
        self.search_debounce.deadline()
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn displayed_posts(&self) -> &[Post] {
        match self.nav.displayed_source() {
            PostSource::Search => self.search.results(),
            PostSource::Feed => self.feed.items(),
            PostSource::Recommendations => self.recommendations.items(),
        }
    }

    pub fn displayed_loading(&self) -> bool {
        match self.nav.displayed_source() {
            PostSource::Search => self.search.is_loading(),
            PostSource::Feed => self.feed.is_loading(),
            PostSource::Recommendations => self.recommendations.is_loading(),
        }
    }

    pub fn displayed_error(&self) -> Option<&str> {
        match self.nav.displayed_source() {
            PostSource::Search => self.search.error(),
            PostSource::Feed => self.feed.error(),
            PostSource::Recommendations => self.recommendations.error(),
        }
    }

    /// Open the detail overlay for the `index`-th displayed post.
    pub fn open_post(&mut self, index: usize) -> bool {
        let Some(post) = self.displayed_posts().get(index).cloned() else {
            return false;
        };
        self.nav.open_post(post);
        self.sync_ai_chat();
        true
    }

    /// Start removal of a channel; the caller must confirm the returned value.
    pub fn request_remove_channel(&self, channel_id: &ItemId) -> Option<PendingRemoval> {
        self.channels.request_remove(channel_id)
    }
}

/// RES-002: Abort in-flight tasks when the session goes away.
impl Drop for Session {
    fn drop(&mut self) {
        for handle in self.tasks.drain(..) {
            handle.abort();
        }
        if self.ai_poller.take().is_some() {
            tracing::debug!("Stopped AI status poller on session drop");
        }
    }
}
