//! Shell command parsing.
//!
//! One line of input becomes one [`ShellCommand`]. Parsing is pure; the loop
//! in `shell.rs` executes the result against the session.

use telepulse::api::ItemId;
use telepulse::nav::Section;

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Section(Section),
    Refresh,
    More,
    /// Update the search box; empty clears it.
    Search(String),
    Open(usize),
    Link,
    Like(Option<usize>),
    Subscribe(usize),
    Channels,
    Topics,
    Add(String),
    Remove(ItemId),
    Toggle(String),
    SelectAll,
    ClearAll,
    Save,
    Cancel,
    Tab(String),
    Say(String),
    Back,
    Theme,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub const HELP: &str = "\
Navigation: feed | discover | ai | settings | back | quit
Posts:      refresh | more | open <n> | link | like [n] | subscribe <n>
Search:     /<query> (empty `/` clears)
Channels:   channels | add <@name or t.me link> | remove <id>
Topics:     topics | toggle <topic> | all | none | save | cancel
Settings:   tab channels|topics | theme
AI chat:    say <message> (or any text while the chat is open)";

/// 1-based index from user input.
fn index(arg: &str) -> Option<usize> {
    arg.trim().parse::<usize>().ok().filter(|n| *n > 0).map(|n| n - 1)
}

/// Parse one input line. `chat_open` makes free text a chat message.
pub fn parse(line: &str, chat_open: bool) -> ShellCommand {
    let line = line.trim();
    if line.is_empty() {
        return ShellCommand::Empty;
    }
    if let Some(query) = line.strip_prefix('/') {
        return ShellCommand::Search(query.trim().to_string());
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };

    let command = match (word.to_ascii_lowercase().as_str(), rest) {
        ("feed" | "home", "") => ShellCommand::Section(Section::Feed),
        ("discover", "") => ShellCommand::Section(Section::Discover),
        ("ai", "") => ShellCommand::Section(Section::Ai),
        ("settings", "") => ShellCommand::Section(Section::Settings),
        ("refresh" | "r", "") => ShellCommand::Refresh,
        ("more" | "m", "") => ShellCommand::More,
        ("search", q) => ShellCommand::Search(q.to_string()),
        ("open" | "o", n) => match index(n) {
            Some(i) => ShellCommand::Open(i),
            None => ShellCommand::Unknown(line.to_string()),
        },
        ("link", "") => ShellCommand::Link,
        ("like", "") => ShellCommand::Like(None),
        ("like", n) => match index(n) {
            Some(i) => ShellCommand::Like(Some(i)),
            None => ShellCommand::Unknown(line.to_string()),
        },
        ("subscribe" | "sub", n) => match index(n) {
            Some(i) => ShellCommand::Subscribe(i),
            None => ShellCommand::Unknown(line.to_string()),
        },
        ("channels", "") => ShellCommand::Channels,
        ("topics", "") => ShellCommand::Topics,
        ("add", id) => ShellCommand::Add(id.to_string()),
        ("remove" | "rm", id) if !id.is_empty() => ShellCommand::Remove(ItemId::parse(id)),
        ("toggle" | "t", id) if !id.is_empty() => ShellCommand::Toggle(id.to_ascii_lowercase()),
        ("all", "") => ShellCommand::SelectAll,
        ("none", "") => ShellCommand::ClearAll,
        ("save", "") => ShellCommand::Save,
        ("cancel", "") => ShellCommand::Cancel,
        ("tab", tab) if !tab.is_empty() => ShellCommand::Tab(tab.to_ascii_lowercase()),
        ("say", text) => ShellCommand::Say(text.to_string()),
        ("back" | "b", "") => ShellCommand::Back,
        ("theme", "") => ShellCommand::Theme,
        ("help" | "?", "") => ShellCommand::Help,
        ("quit" | "exit" | "q", "") => ShellCommand::Quit,
        _ => ShellCommand::Unknown(line.to_string()),
    };

    match command {
        ShellCommand::Unknown(_) if chat_open => ShellCommand::Say(line.to_string()),
        other => other,
    }
}

/// Answer to a yes/no prompt. Anything but yes is no.
pub fn is_yes(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
