//! Interactive shell.
//!
//! `tokio::select!` multiplexes stdin lines, session events and a periodic
//! tick (debounced search, AI status). The screen is reprinted whenever
//! something changed.

use super::input::{is_yes, parse, ShellCommand, HELP};
use super::render;
use anyhow::Result;
use std::path::Path;
use std::time::Duration;
use telepulse::api::ApiClient;
use telepulse::nav::{BackOutcome, Overlay, OverlayKind, Section, SettingsTab};
use telepulse::preferences::{Preferences, ThemeVariant};
use telepulse::session::{Session, SessionOptions};
use telepulse::store::PendingRemoval;
use telepulse::util::validate_link_for_open;
use tokio::io::{AsyncBufReadExt, BufReader};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

const TICK: Duration = Duration::from_millis(100);

pub enum Action {
    Continue,
    Quit,
}

struct Shell<'a> {
    session: Session,
    theme: ThemeVariant,
    prefs: Preferences,
    prefs_path: &'a Path,
    pending_removal: Option<PendingRemoval>,
    needs_redraw: bool,
}

pub async fn run(api: ApiClient, options: SessionOptions, prefs: Preferences, prefs_path: &Path) -> Result<()> {
    let (session, mut events) = Session::new(api, options);
    let mut shell = Shell {
        session,
        theme: prefs.effective_theme(None),
        prefs,
        prefs_path,
        pending_removal: None,
        needs_redraw: true,
    };
    shell.session.start();
    println!("Type `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tick = tokio::time::interval(TICK);

    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())?;

    loop {
        // Drain finished tasks before waiting on input
        while let Ok(event) = events.try_recv() {
            shell.session.handle_event(event);
            shell.needs_redraw = true;
        }
        shell.flush();

        #[cfg(unix)]
        let sigterm_fut = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<Option<()>>();

        tokio::select! {
            biased;

            _ = sigterm_fut => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
                break;
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT, shutting down gracefully");
                break;
            }

            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if let Action::Quit = shell.handle_line(&line) {
                            break;
                        }
                    }
                    None => break, // stdin closed
                }
            }

            Some(event) = events.recv() => {
                shell.session.handle_event(event);
                shell.needs_redraw = true;
            }

            _ = tick.tick() => {
                if shell.session.poll_search() {
                    shell.needs_redraw = true;
                }
                if let Some(chat) = &shell.session.chat {
                    let before = chat.status();
                    shell.session.sync_ai_status();
                    if shell.session.chat.as_ref().map(|c| c.status()) != Some(before) {
                        shell.needs_redraw = true;
                    }
                }
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

impl Shell<'_> {
    fn flush(&mut self) {
        if let Some(status) = self.session.take_status() {
            println!("» {}", status);
        }
        if self.needs_redraw {
            println!("\n{}", render::screen(self.theme, &self.session));
            self.needs_redraw = false;
        }
    }

    fn handle_line(&mut self, line: &str) -> Action {
        if let Some(pending) = self.pending_removal.take() {
            if is_yes(line) {
                if !self.session.spawn_remove_channel(pending) {
                    self.session.set_status("Removal already in progress");
                }
            } else {
                self.session.set_status("Removal cancelled");
            }
            self.needs_redraw = true;
            return Action::Continue;
        }

        let chat_open = self.session.nav().overlay_kind() == Some(OverlayKind::AiChat);
        let command = parse(line, chat_open);
        self.needs_redraw = !matches!(command, ShellCommand::Empty | ShellCommand::Help);
        self.execute(command)
    }

    fn selected_or(&self, index: Option<usize>) -> Option<telepulse::api::Post> {
        match index {
            Some(i) => self.session.displayed_posts().get(i).cloned(),
            None => self.session.nav().selected_post().cloned(),
        }
    }

    fn execute(&mut self, command: ShellCommand) -> Action {
        let session = &mut self.session;
        match command {
            ShellCommand::Section(section) => session.select_section(section),
            ShellCommand::Refresh => match session.nav().section() {
                Section::Discover => session.spawn_recommendations_refresh(),
                _ => session.spawn_feed_refresh(),
            },
            ShellCommand::More => {
                if session.nav().section() != Section::Feed || !session.spawn_feed_load_more() {
                    session.set_status("Nothing more to load");
                }
            }
            ShellCommand::Search(query) => session.set_search_query(&query),
            ShellCommand::Open(i) => {
                if !session.open_post(i) {
                    session.set_status(format!("No post #{}", i + 1));
                }
            }
            ShellCommand::Link => match session.nav().selected_post().map(|p| p.post_url.clone()) {
                Some(link) => match validate_link_for_open(&link) {
                    Ok(url) => {
                        if let Err(e) = open::that(url.as_str()) {
                            tracing::warn!(error = %e, "Failed to launch browser");
                            session.set_status(format!("Could not open link: {}", e));
                        }
                    }
                    Err(e) => session.set_status(e.to_string()),
                },
                None => session.set_status("Open a post first"),
            },
            ShellCommand::Like(index) => match self.selected_or(index) {
                Some(post) => self.session.spawn_like(&post.post_url),
                None => self.session.set_status("No such post"),
            },
            ShellCommand::Subscribe(i) => match session.displayed_posts().get(i).cloned() {
                Some(post) => {
                    if !session.spawn_subscribe_from_post(&post) {
                        session.set_status("Already subscribing to this channel");
                    }
                }
                None => session.set_status(format!("No post #{}", i + 1)),
            },
            ShellCommand::Channels => session.open_overlay(Overlay::ChannelList),
            ShellCommand::Topics => session.open_overlay(Overlay::TopicList),
            ShellCommand::Add(identifier) => {
                session.open_add_channel();
                if let Err(e) = session.spawn_add_channel(&identifier) {
                    session.set_status(e.to_string());
                }
            }
            ShellCommand::Remove(id) => match session.request_remove_channel(&id) {
                Some(pending) => {
                    println!("{} [y/N]", pending.prompt());
                    self.pending_removal = Some(pending);
                    self.needs_redraw = false;
                }
                None if session.channels.is_removing(&id) => {
                    session.set_status("Removal already in progress");
                }
                None => session.set_status(format!("No channel with id {}", id)),
            },
            ShellCommand::Toggle(id) => session.topics.toggle(&id),
            ShellCommand::SelectAll => session.topics.select_all(),
            ShellCommand::ClearAll => session.topics.clear_all(),
            ShellCommand::Save => {
                if !session.topics.has_changes() {
                    session.set_status("No changes to save");
                } else if !session.spawn_topics_save() {
                    session.set_status("Save already in progress");
                } else {
                    session.set_status("Saving topics...");
                }
            }
            ShellCommand::Cancel => {
                session.topics.cancel();
                session.close_overlay();
            }
            ShellCommand::Tab(tab) => match tab.as_str() {
                "channels" => session.set_settings_tab(SettingsTab::Channels),
                "topics" => session.set_settings_tab(SettingsTab::Topics),
                other => session.set_status(format!("Unknown tab: {}", other)),
            },
            ShellCommand::Say(text) => match session.chat.as_ref() {
                None => session.set_status("Open the AI chat first (`ai`)"),
                Some(chat) if chat.is_sending() => session.set_status("Wait for the current reply"),
                Some(chat) if !chat.can_send() => session.set_status("AI model is still loading"),
                Some(_) => {
                    session.spawn_chat_send(&text);
                }
            },
            ShellCommand::Back => {
                if session.back() == BackOutcome::Exit {
                    return Action::Quit;
                }
            }
            ShellCommand::Theme => {
                self.theme = self.prefs.toggle_theme(None);
                match self.prefs.save(self.prefs_path) {
                    Ok(()) => self.session.set_status(format!("{} Theme: {}", self.theme.icon(), self.theme.name())),
                    Err(e) => self.session.set_status(format!("Could not save theme: {}", e)),
                }
            }
            ShellCommand::Help => println!("{}", HELP),
            ShellCommand::Quit => return Action::Quit,
            ShellCommand::Empty => {}
            ShellCommand::Unknown(text) => {
                session.set_status(format!("Unknown command: {} (try `help`)", text));
            }
        }
        Action::Continue
    }
}
