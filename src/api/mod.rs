//! Backend API layer.
//!
//! - [`client`] - request building, identity injection, transport error mapping
//! - [`identity`] - host-platform identity with a fixed fallback
//! - [`types`] - records and response payloads of the JSON contract
//! - [`error`] - the [`ApiError`] taxonomy shared by every store

mod client;
mod error;
mod identity;
mod types;

pub use client::{endpoints, ApiClient, ClientOptions, DEFAULT_BASE_URL};
pub use error::{ApiError, ErrorKind};
pub use identity::{HostIdentity, FALLBACK_USER_ID};
pub use types::{AiStatus, Channel, ChannelRef, FeedPage, ItemId, Post};
