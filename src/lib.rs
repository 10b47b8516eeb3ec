//! Client core for the Telepulse Telegram feed service.
//!
//! The backend aggregates posts from public Telegram channels. This crate
//! holds everything a front end needs to talk to it:
//!
//! - [`api`] - HTTP client, identity injection and the JSON contract
//! - [`store`] - feed, recommendation, search, channel, topic and AI chat state
//! - [`nav`] - section, search box and overlay navigation with back handling
//! - [`session`] - background tasks and their events, tying stores to navigation
//! - [`config`] / [`preferences`] - user configuration and persisted UI choices
//! - [`util`] - image URL resolution, link checks and terminal text helpers

pub mod api;
pub mod config;
pub mod nav;
pub mod preferences;
pub mod session;
pub mod store;
pub mod util;
