//! Subscribed channels.
//!
//! Mutations are confirmed by the server and followed by a full refresh; the
//! store never inserts or drops a channel optimistically. Removal is a
//! two-step flow (request, then explicit confirmation) and is guarded per id
//! while the request is in flight.

use crate::api::{ApiClient, ApiError, Channel, ItemId, Post};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// Shown when the server rejects a removal without saying why.
pub const GENERIC_REMOVE_FAILURE: &str = "Failed to remove channel";

/// Failed channel removal, with the message to show the user.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RemoveChannelError {
    pub channel_id: ItemId,
    pub message: String,
    #[source]
    pub source: ApiError,
}

impl RemoveChannelError {
    fn new(channel_id: ItemId, source: ApiError) -> Self {
        let message = match &source {
            ApiError::Rejected(Some(msg)) => msg.clone(),
            ApiError::Rejected(None) => GENERIC_REMOVE_FAILURE.to_string(),
            other => format!("{}: {}", GENERIC_REMOVE_FAILURE, other),
        };
        Self {
            channel_id,
            message,
            source,
        }
    }
}

/// A removal the user asked for but has not confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRemoval {
    pub channel_id: ItemId,
    pub channel_name: String,
}

impl PendingRemoval {
    /// Confirmation prompt text.
    pub fn prompt(&self) -> String {
        format!("Remove channel {} from your feed?", self.channel_name)
    }
}

/// A confirmed removal holding the per-id in-flight guard.
#[derive(Debug, PartialEq, Eq)]
pub struct RemovalTicket {
    channel_id: ItemId,
}

impl RemovalTicket {
    pub fn channel_id(&self) -> &ItemId {
        &self.channel_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// A removal for the same id was already in flight; nothing was sent.
    AlreadyInFlight,
}

#[derive(Debug, Default)]
pub struct ChannelStore {
    channels: Vec<Channel>,
    in_flight: usize,
    error: Option<String>,
    removing: HashSet<ItemId>,
    subscribing: HashSet<String>,
}

/// Trim and check a user-entered channel identifier (`@name`, `t.me/name`, ...).
pub fn validate_identifier(input: &str) -> Result<String, ApiError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation(
            "Channel username is required".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Identifier used to subscribe to the channel a post came from.
pub fn post_channel_identifier(post: &Post) -> &str {
    post.channel
        .username
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or(&post.channel.name)
}

impl ChannelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn get(&self, channel_id: &ItemId) -> Option<&Channel> {
        self.channels.iter().find(|c| &c.id == channel_id)
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_removing(&self, channel_id: &ItemId) -> bool {
        self.removing.contains(channel_id)
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    pub fn begin_refresh(&mut self) {
        self.in_flight += 1;
        self.error = None;
    }

    pub fn apply_refresh(&mut self, result: Result<Vec<Channel>, ApiError>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match result {
            Ok(channels) => {
                tracing::debug!(count = channels.len(), "Channels loaded");
                self.channels = channels;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Channel list request failed");
                self.error = Some(e.to_string());
            }
        }
    }

    pub async fn refresh(&mut self, api: &ApiClient) {
        self.begin_refresh();
        let result = api.channels().await;
        self.apply_refresh(result);
    }

    // ========================================================================
    // Add
    // ========================================================================

    /// Subscribe to `identifier`, then reload the list before returning.
    ///
    /// Blank input fails with [`ApiError::Validation`] without a request.
    /// Server rejections and transport errors propagate to the caller; the
    /// refresh that follows a successful add reports its own failure through
    /// [`ChannelStore::error`].
    pub async fn add(&mut self, api: &ApiClient, identifier: &str) -> Result<Value, ApiError> {
        let identifier = validate_identifier(identifier)?;
        let response = api.add_channel(&identifier).await?;
        tracing::info!(channel = %identifier, "Channel added");
        self.refresh(api).await;
        Ok(response)
    }

    /// Claim the subscribe guard for a post's channel. `None` while one is pending.
    pub fn begin_subscribe(&mut self, post: &Post) -> Option<String> {
        let identifier = validate_identifier(post_channel_identifier(post)).ok()?;
        if !self.subscribing.insert(identifier.clone()) {
            tracing::debug!(channel = %identifier, "Subscribe already in flight");
            return None;
        }
        Some(identifier)
    }

    pub fn finish_subscribe(&mut self, identifier: &str) {
        self.subscribing.remove(identifier);
    }

    /// The "subscribe" action on a recommended post.
    ///
    /// Returns `Ok(None)` if a subscribe for the same channel is in flight.
    pub async fn subscribe_from_post(
        &mut self,
        api: &ApiClient,
        post: &Post,
    ) -> Result<Option<Value>, ApiError> {
        let Some(identifier) = self.begin_subscribe(post) else {
            return Ok(None);
        };
        let result = self.add(api, &identifier).await;
        self.finish_subscribe(&identifier);
        result.map(Some)
    }

    // ========================================================================
    // Remove
    // ========================================================================

    /// Ask to remove a channel. The returned value must be confirmed with
    /// [`ChannelStore::confirm_remove`]; dropping it cancels the removal.
    ///
    /// Unknown ids and ids with a removal already in flight yield `None`.
    pub fn request_remove(&self, channel_id: &ItemId) -> Option<PendingRemoval> {
        if self.is_removing(channel_id) {
            return None;
        }
        let channel = self.get(channel_id)?;
        let channel_name = if channel.name.is_empty() {
            channel.id.to_string()
        } else {
            channel.name.clone()
        };
        Some(PendingRemoval {
            channel_id: channel.id.clone(),
            channel_name,
        })
    }

    /// Confirm a removal, taking the in-flight guard for its id.
    ///
    /// Returns `None` (and nothing must be sent) if that id is already being removed.
    pub fn confirm_remove(&mut self, pending: PendingRemoval) -> Option<RemovalTicket> {
        if !self.removing.insert(pending.channel_id.clone()) {
            tracing::debug!(channel_id = %pending.channel_id, "Removal already in flight, suppressed");
            return None;
        }
        Some(RemovalTicket {
            channel_id: pending.channel_id,
        })
    }

    /// Release the guard and translate the outcome. On success the caller
    /// refreshes the list; on failure the channel stays visible.
    pub fn finish_remove(
        &mut self,
        ticket: RemovalTicket,
        result: Result<(), ApiError>,
    ) -> Result<(), RemoveChannelError> {
        self.removing.remove(&ticket.channel_id);
        match result {
            Ok(()) => {
                tracing::info!(channel_id = %ticket.channel_id, "Channel removed");
                Ok(())
            }
            Err(e) => {
                let err = RemoveChannelError::new(ticket.channel_id, e);
                tracing::warn!(channel_id = %err.channel_id, error = %err.source, "Channel removal failed");
                Err(err)
            }
        }
    }

    pub async fn remove(
        &mut self,
        api: &ApiClient,
        pending: PendingRemoval,
    ) -> Result<RemoveOutcome, RemoveChannelError> {
        let Some(ticket) = self.confirm_remove(pending) else {
            return Ok(RemoveOutcome::AlreadyInFlight);
        };
        let result = api.remove_channel(ticket.channel_id()).await;
        self.finish_remove(ticket, result)?;
        self.refresh(api).await;
        Ok(RemoveOutcome::Removed)
    }
}
