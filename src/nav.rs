//! Navigation and modal state.
//!
//! At most one overlay is open at any time, so the overlay is a single
//! `Option` slot and opening one replaces whatever was there. The host's
//! back signal is resolved by [`NavController::back`] in a fixed priority.

use crate::api::Post;

/// Bottom-navigation sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    #[default]
    Feed,
    Discover,
    Ai,
    Settings,
}

impl Section {
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "feed" | "home" => Some(Self::Feed),
            "discover" => Some(Self::Discover),
            "ai" => Some(Self::Ai),
            "settings" => Some(Self::Settings),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Discover => "discover",
            Self::Ai => "ai",
            Self::Settings => "settings",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettingsTab {
    #[default]
    Channels,
    Topics,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    PostDetail(Box<Post>),
    Settings,
    ChannelList,
    TopicList,
    AddChannel,
    AiChat,
}

/// Overlay discriminant, for reporting what was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    PostDetail,
    Settings,
    ChannelList,
    TopicList,
    AddChannel,
    AiChat,
}

impl Overlay {
    pub fn kind(&self) -> OverlayKind {
        match self {
            Overlay::PostDetail(_) => OverlayKind::PostDetail,
            Overlay::Settings => OverlayKind::Settings,
            Overlay::ChannelList => OverlayKind::ChannelList,
            Overlay::TopicList => OverlayKind::TopicList,
            Overlay::AddChannel => OverlayKind::AddChannel,
            Overlay::AiChat => OverlayKind::AiChat,
        }
    }
}

/// What a back signal did. Every outcome except `Exit` consumed the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOutcome {
    ClosedOverlay(OverlayKind),
    ClearedSearch,
    /// Nothing left to close; the host should close the app.
    Exit,
}

/// Which collection the main list shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSource {
    Search,
    Feed,
    Recommendations,
}

#[derive(Debug, Default)]
pub struct NavController {
    overlay: Option<Overlay>,
    section: Section,
    search_query: String,
    settings_tab: SettingsTab,
}

impl NavController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn overlay_kind(&self) -> Option<OverlayKind> {
        self.overlay.as_ref().map(Overlay::kind)
    }

    pub fn section(&self) -> Section {
        self.section
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn settings_tab(&self) -> SettingsTab {
        self.settings_tab
    }

    pub fn set_settings_tab(&mut self, tab: SettingsTab) {
        self.settings_tab = tab;
    }

    /// The post shown in the detail overlay, if any.
    pub fn selected_post(&self) -> Option<&Post> {
        match &self.overlay {
            Some(Overlay::PostDetail(post)) => Some(post.as_ref()),
            _ => None,
        }
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    /// Bottom-navigation click: switches section and clears the search query.
    pub fn select_section(&mut self, section: Section) {
        self.section = section;
        self.search_query.clear();
        match section {
            Section::Settings => self.open_overlay(Overlay::Settings),
            Section::Ai => self.open_overlay(Overlay::AiChat),
            Section::Feed | Section::Discover => {}
        }
    }

    pub fn open_post(&mut self, post: Post) {
        self.open_overlay(Overlay::PostDetail(Box::new(post)));
    }

    /// Open `overlay`, closing the current one first.
    pub fn open_overlay(&mut self, overlay: Overlay) {
        if let Some(previous) = self.overlay.replace(overlay) {
            tracing::debug!(closed = ?previous.kind(), "Overlay replaced");
        }
    }

    pub fn open_add_channel(&mut self) {
        self.open_overlay(Overlay::AddChannel);
    }

    /// Close the open overlay with the same side effects a back signal has.
    pub fn close_overlay(&mut self) -> Option<OverlayKind> {
        let kind = self.overlay.take()?.kind();
        if kind == OverlayKind::AiChat {
            self.section = Section::Feed;
        }
        Some(kind)
    }

    /// Resolve a back signal.
    ///
    /// Priority: the open overlay (post detail, settings, channel list,
    /// topic list, add channel, AI chat), then a non-empty search query,
    /// then exit. Only one overlay can be open so the overlay steps never
    /// compete; closing AI chat also returns to the feed section.
    pub fn back(&mut self) -> BackOutcome {
        if let Some(kind) = self.close_overlay() {
            return BackOutcome::ClosedOverlay(kind);
        }
        if !self.search_query.is_empty() {
            self.search_query.clear();
            return BackOutcome::ClearedSearch;
        }
        BackOutcome::Exit
    }

    /// Whether the host's back button should be visible.
    pub fn back_visible(&self) -> bool {
        self.overlay.is_some() || !self.search_query.is_empty()
    }

    pub fn displayed_source(&self) -> PostSource {
        if !self.search_query.is_empty() {
            PostSource::Search
        } else if self.section == Section::Feed {
            PostSource::Feed
        } else {
            PostSource::Recommendations
        }
    }
}
