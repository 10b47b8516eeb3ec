//! Plain-text rendering of posts, channels and chat for the terminal.
//!
//! Everything here returns `String`s; callers decide where to print. All
//! channel-provided text goes through [`sanitize`] before it reaches the
//! terminal.

use telepulse::api::{AiStatus, Channel, Post};
use telepulse::nav::{NavController, Overlay, Section, SettingsTab};
use telepulse::preferences::ThemeVariant;
use telepulse::store::topics::{TopicStore, TOPICS};
use telepulse::store::{Author, ChatSession};
use telepulse::util::{display_width, excerpt, resolve_image_url, sanitize, truncate_to_width};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Column budget for one-line previews.
pub const LINE_WIDTH: usize = 72;

fn accent(theme: ThemeVariant, text: &str) -> String {
    format!("{}{}{}", theme.accent(), text, RESET)
}

pub fn heading(theme: ThemeVariant, title: &str) -> String {
    format!("{}{}{}", BOLD, accent(theme, title), RESET)
}

/// `  3. Channel · Title` plus an indented excerpt line.
pub fn post_line(theme: ThemeVariant, index: usize, post: &Post) -> String {
    let channel = sanitize(&post.channel.name);
    let title = if post.title.trim().is_empty() {
        excerpt(&post.content, LINE_WIDTH)
    } else {
        excerpt(&post.title, LINE_WIDTH)
    };
    let prefix = format!("{:>3}. ", index + 1);
    let budget = LINE_WIDTH.saturating_sub(display_width(&prefix) + display_width(&channel) + 3);
    let mut line = format!(
        "{}{} · {}",
        prefix,
        accent(theme, &channel),
        truncate_to_width(&title, budget)
    );
    let body = excerpt(&post.content, LINE_WIDTH - 5);
    if !body.is_empty() && !post.title.trim().is_empty() {
        line.push_str(&format!("\n     {}{}{}", DIM, body, RESET));
    }
    line
}

pub fn post_list(theme: ThemeVariant, title: &str, posts: &[Post], loading: bool, error: Option<&str>) -> String {
    let mut out = heading(theme, title);
    if let Some(err) = error {
        out.push_str(&format!("\n  ⚠️  {}", err));
    }
    if posts.is_empty() {
        out.push_str(if loading { "\n  Loading posts..." } else { "\n  No posts yet." });
        return out;
    }
    for (i, post) in posts.iter().enumerate() {
        out.push('\n');
        out.push_str(&post_line(theme, i, post));
    }
    if loading {
        out.push_str("\n  Loading...");
    }
    out
}

pub fn post_detail(theme: ThemeVariant, post: &Post) -> String {
    let mut out = heading(theme, &sanitize(&post.channel.name));
    if !post.date.is_empty() {
        out.push_str(&format!("  {}{}{}", DIM, sanitize(&post.date), RESET));
    }
    if !post.title.trim().is_empty() {
        out.push_str(&format!("\n{}{}{}", BOLD, sanitize(&post.title), RESET));
    }
    out.push_str(&format!("\n\n{}\n", sanitize(&post.content)));
    out.push_str(&format!("\nImage: {}", resolve_image_url(post.image.as_deref())));
    if !post.post_url.is_empty() {
        out.push_str(&format!("\nSource: {}", sanitize(&post.post_url)));
    }
    out
}

pub fn channel_line(theme: ThemeVariant, channel: &Channel, removing: bool) -> String {
    let mut line = format!(
        "  [{}] {} {}@{}{}",
        channel.id,
        accent(theme, &sanitize(&channel.name)),
        DIM,
        sanitize(&channel.username),
        RESET
    );
    if let Some(subs) = channel.subscribers {
        line.push_str(&format!("  {} subscribers", subs));
    }
    if let Some(posts) = channel.post_count {
        line.push_str(&format!("  {} posts", posts));
    }
    if removing {
        line.push_str("  (removing...)");
    }
    line
}

pub fn channel_list(theme: ThemeVariant, channels: &[Channel], is_removing: impl Fn(&Channel) -> bool) -> String {
    let mut out = heading(theme, "Channels");
    if channels.is_empty() {
        out.push_str("\n  No channels yet. Add one with `add @username`.");
    }
    for channel in channels {
        out.push('\n');
        out.push_str(&channel_line(theme, channel, is_removing(channel)));
    }
    out
}

pub fn topic_list(theme: ThemeVariant, store: &TopicStore) -> String {
    let mut out = heading(theme, "Topics");
    for topic in TOPICS {
        let mark = if store.is_selected(topic.id) { "[x]" } else { "[ ]" };
        out.push_str(&format!("\n  {} {} {} ({})", mark, topic.emoji, topic.name, topic.id));
    }
    if store.has_changes() {
        out.push_str("\n  Unsaved changes: `save` or `cancel`.");
    }
    out
}

pub fn ai_status(status: &AiStatus) -> String {
    if status.is_loaded {
        "AI model ready".to_string()
    } else if status.loading {
        format!("Loading AI model... {:.0}%", status.load_progress)
    } else {
        "AI model not loaded".to_string()
    }
}

pub fn chat(theme: ThemeVariant, chat: &ChatSession) -> String {
    let mut out = heading(theme, "TelePulse AI");
    out.push_str(&format!("  {}{}{}", DIM, ai_status(&chat.status()), RESET));
    for message in chat.messages() {
        let who = match message.author {
            Author::User => "you",
            Author::Assistant => "ai",
        };
        out.push_str(&format!(
            "\n{}{} {}{} {}",
            DIM,
            message.timestamp.format("%H:%M"),
            who,
            RESET,
            sanitize(&message.content)
        ));
    }
    if chat.is_sending() {
        out.push_str("\n  ...");
    }
    for suggestion in chat.visible_suggestions() {
        out.push_str(&format!("\n  💡 {}", sanitize(suggestion)));
    }
    out
}

/// Full screen for the current navigation state.
pub fn screen(theme: ThemeVariant, session: &telepulse::session::Session) -> String {
    let nav: &NavController = session.nav();
    match nav.overlay() {
        Some(Overlay::PostDetail(post)) => post_detail(theme, post),
        Some(Overlay::Settings) => {
            let tab = match nav.settings_tab() {
                SettingsTab::Channels => channel_list(theme, session.channels.channels(), |c| {
                    session.channels.is_removing(&c.id)
                }),
                SettingsTab::Topics => topic_list(theme, &session.topics),
            };
            format!("{}\n{}", heading(theme, "Settings"), tab)
        }
        Some(Overlay::ChannelList) => channel_list(theme, session.channels.channels(), |c| {
            session.channels.is_removing(&c.id)
        }),
        Some(Overlay::TopicList) => topic_list(theme, &session.topics),
        Some(Overlay::AddChannel) => format!(
            "{}\n  Enter `add @username` or a t.me link.",
            heading(theme, "Add channel")
        ),
        Some(Overlay::AiChat) => match &session.chat {
            Some(c) => chat(theme, c),
            None => heading(theme, "TelePulse AI"),
        },
        None => {
            let title = if !nav.search_query().is_empty() {
                format!("Search: {}", sanitize(nav.search_query()))
            } else if nav.section() == Section::Feed {
                "My feed".to_string()
            } else {
                "Recommendations".to_string()
            };
            post_list(
                theme,
                &title,
                session.displayed_posts(),
                session.displayed_loading(),
                session.displayed_error(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telepulse::api::{ChannelRef, ItemId};

    fn post() -> Post {
        Post {
            id: ItemId::Int(1),
            channel: ChannelRef {
                name: "Tech\x1b[31m".into(),
                avatar: String::new(),
                username: None,
            },
            title: "Hello".into(),
            content: "Some\ncontent".into(),
            image: Some("https://t.me/tech/51".into()),
            date: "today".into(),
            post_url: "https://t.me/tech/51".into(),
        }
    }

    #[test]
    fn test_post_line_is_sanitized() {
        let line = post_line(ThemeVariant::Dark, 0, &post());
        assert!(line.starts_with("  1. "));
        assert!(!line.contains("\x1b[31m"));
        assert!(line.contains("Some content"));
    }

    #[test]
    fn test_post_detail_shows_placeholder_image() {
        let detail = post_detail(ThemeVariant::Light, &post());
        assert!(detail.contains("Image: https://picsum.photos/400/200?random=1"));
        assert!(detail.contains("Source: https://t.me/tech/51"));
    }

    #[test]
    fn test_empty_list_messages() {
        let loading = post_list(ThemeVariant::Dark, "My feed", &[], true, None);
        assert!(loading.contains("Loading posts..."));
        let failed = post_list(ThemeVariant::Dark, "My feed", &[], false, Some("HTTP error: status 500"));
        assert!(failed.contains("HTTP error: status 500"));
        assert!(failed.contains("No posts yet."));
    }

    #[test]
    fn test_ai_status_text() {
        let status = AiStatus {
            is_loaded: false,
            loading: true,
            load_progress: 42.4,
        };
        assert_eq!(ai_status(&status), "Loading AI model... 42%");
    }

    #[test]
    fn test_topic_list_marks_selection() {
        let mut store = TopicStore::new();
        store.toggle("music");
        let text = topic_list(ThemeVariant::Dark, &store);
        assert!(text.contains("[x] 🎵 Music (music)"));
        assert!(text.contains("[ ] 🎮 Games (games)"));
        assert!(text.contains("Unsaved changes"));
    }
}
