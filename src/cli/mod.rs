//! Command-line front end.
//!
//! Each subcommand drives a store directly through its async helpers; `shell`
//! starts the interactive [`Session`](telepulse::session::Session) loop.

mod input;
mod render;
mod shell;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use telepulse::api::{ApiClient, ItemId};
use telepulse::config::Config;
use telepulse::preferences::{Preferences, ThemeVariant};
use telepulse::session::SessionOptions;
use telepulse::store::{
    likes, ChannelStore, ChatSession, FeedStore, RecommendationStore, RemoveOutcome, SearchStore,
    TopicStore,
};

#[derive(Parser, Debug)]
#[command(name = "telepulse", version, about = "Terminal client for the Telepulse Telegram feed service")]
pub struct Args {
    /// Config file (default: ~/.config/telepulse/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show your feed
    Feed {
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Show personal recommendations
    Discover,
    /// Search posts
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Manage subscribed channels
    #[command(subcommand)]
    Channels(ChannelsCommand),
    /// Manage topics of interest
    #[command(subcommand)]
    Topics(TopicsCommand),
    /// Like a post by its link
    Like { post_url: String },
    /// Talk to the AI assistant
    #[command(subcommand)]
    Ai(AiCommand),
    /// Show or change the theme
    Theme {
        #[arg(value_parser = ["show", "toggle", "dark", "light"], default_value = "show")]
        action: String,
    },
    /// Interactive shell (default)
    Shell,
}

#[derive(Subcommand, Debug)]
pub enum ChannelsCommand {
    List,
    /// Subscribe to a channel (@username or t.me link)
    Add { identifier: String },
    /// Unsubscribe from a channel by id
    Remove {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum TopicsCommand {
    List,
    /// Replace the selection with the given topic ids
    Set {
        #[arg(num_args = 0..)]
        topics: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum AiCommand {
    Status,
    Suggestions,
    Ask {
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
}

/// Everything a command needs besides its arguments.
pub struct CliContext {
    pub config: Config,
    pub prefs: Preferences,
    pub prefs_path: PathBuf,
}

fn theme(ctx: &CliContext) -> ThemeVariant {
    ctx.prefs.effective_theme(None)
}

fn api(config: &Config) -> Result<ApiClient> {
    ApiClient::new(config.client_options()).context("Failed to create API client")
}

pub async fn run(command: Command, mut ctx: CliContext) -> Result<()> {
    match command {
        Command::Feed { pages } => {
            let api = api(&ctx.config)?;
            let mut store = FeedStore::new(ctx.config.feed_page_size);
            store.refresh(&api).await;
            for _ in 1..pages.max(1) {
                if !store.load_more(&api).await || store.error().is_some() {
                    break;
                }
            }
            if let Some(err) = store.error() {
                bail!("Failed to load feed: {}", err);
            }
            println!("{}", render::post_list(theme(&ctx), "My feed", store.items(), false, None));
            if store.has_more() {
                println!("(more available: --pages {})", pages.max(1) + 1);
            }
        }
        Command::Discover => {
            let api = api(&ctx.config)?;
            let mut store = RecommendationStore::new(ctx.config.recommendation_limit);
            store.refresh(&api).await;
            if let Some(err) = store.error() {
                bail!("Failed to load recommendations: {}", err);
            }
            println!("{}", render::post_list(theme(&ctx), "Recommendations", store.items(), false, None));
        }
        Command::Search { query } => {
            let api = api(&ctx.config)?;
            let query = query.join(" ");
            let mut store = SearchStore::new();
            store.search(&api, &query).await;
            if let Some(err) = store.error() {
                bail!("Search failed: {}", err);
            }
            let title = format!("Search: {}", query);
            println!("{}", render::post_list(theme(&ctx), &title, store.results(), false, None));
        }
        Command::Channels(cmd) => channels(cmd, &ctx).await?,
        Command::Topics(cmd) => topics(cmd, &ctx).await?,
        Command::Like { post_url } => {
            let api = api(&ctx.config)?;
            likes::like(&api, &post_url).await?;
            println!("Liked.");
        }
        Command::Ai(cmd) => ai(cmd, &ctx).await?,
        Command::Theme { action } => {
            let current = ctx.prefs.effective_theme(None);
            let next = match action.as_str() {
                "toggle" => Some(ctx.prefs.toggle_theme(None)),
                name => ThemeVariant::from_str_name(name),
            };
            match next {
                Some(variant) => {
                    ctx.prefs.theme = Some(variant);
                    ctx.prefs
                        .save(&ctx.prefs_path)
                        .with_context(|| format!("Failed to save {}", ctx.prefs_path.display()))?;
                    println!("{} Theme: {}", variant.icon(), variant.name());
                }
                None => println!("{} Theme: {}", current.icon(), current.name()),
            }
        }
        Command::Shell => {
            let api = api(&ctx.config)?;
            let options = SessionOptions::from_config(&ctx.config);
            shell::run(api, options, ctx.prefs, &ctx.prefs_path).await?;
        }
    }
    Ok(())
}

async fn channels(cmd: ChannelsCommand, ctx: &CliContext) -> Result<()> {
    let api = api(&ctx.config)?;
    let mut store = ChannelStore::new();
    match cmd {
        ChannelsCommand::List => {
            store.refresh(&api).await;
            if let Some(err) = store.error() {
                bail!("Failed to load channels: {}", err);
            }
        }
        ChannelsCommand::Add { identifier } => {
            store.add(&api, &identifier).await?;
            println!("Channel {} added.", identifier.trim());
        }
        ChannelsCommand::Remove { id, yes } => {
            store.refresh(&api).await;
            if let Some(err) = store.error() {
                bail!("Failed to load channels: {}", err);
            }
            let id = ItemId::parse(&id);
            let Some(pending) = store.request_remove(&id) else {
                bail!("No channel with id {}", id);
            };
            if !yes && !confirm(&pending.prompt())? {
                println!("Cancelled.");
                return Ok(());
            }
            match store.remove(&api, pending).await? {
                RemoveOutcome::Removed => println!("Channel removed."),
                RemoveOutcome::AlreadyInFlight => println!("Removal already in progress."),
            }
        }
    }
    println!(
        "{}",
        render::channel_list(theme(ctx), store.channels(), |c| store.is_removing(&c.id))
    );
    Ok(())
}

async fn topics(cmd: TopicsCommand, ctx: &CliContext) -> Result<()> {
    let api = api(&ctx.config)?;
    let mut store = TopicStore::new();
    store.load(&api).await;
    if let Some(err) = store.error() {
        bail!("Failed to load topics: {}", err);
    }
    if let TopicsCommand::Set { topics } = cmd {
        store.set_selection(&topics);
        if store.has_changes() {
            store.save(&api).await?;
            println!("Topics saved.");
        } else {
            println!("No changes.");
        }
    }
    println!("{}", render::topic_list(theme(ctx), &store));
    Ok(())
}

async fn ai(cmd: AiCommand, ctx: &CliContext) -> Result<()> {
    let api = api(&ctx.config)?;
    match cmd {
        AiCommand::Status => {
            let status = api.ai_status().await?;
            println!("{}", render::ai_status(&status));
        }
        AiCommand::Suggestions => {
            let suggestions = api.ai_suggestions().await?;
            for s in suggestions {
                println!("💡 {}", telepulse::util::sanitize(&s));
            }
        }
        AiCommand::Ask { message } => {
            let mut chat = ChatSession::new();
            chat.send(&api, &message.join(" ")).await;
            if let Some(reply) = chat.messages().last() {
                println!("{}", telepulse::util::sanitize(&reply.content));
            }
        }
    }
    Ok(())
}

/// Ask a yes/no question on stdin.
fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(input::is_yes(&answer))
}
