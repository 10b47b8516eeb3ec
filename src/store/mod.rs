//! Client-side state for each backend collection.
//!
//! Every store is a plain state machine: a `begin_*` call marks a request in
//! flight and returns what to send, the matching `apply`/`finish_*` call
//! commits the outcome. The async helpers (`refresh`, `load_more`, ...) chain
//! the two around a single [`ApiClient`](crate::api::ApiClient) call for
//! callers that hold the store exclusively; [`Session`](crate::session::Session)
//! drives the same methods from background tasks.

pub mod channels;
pub mod chat;
pub mod feed;
pub mod likes;
pub mod recommendations;
pub mod search;
pub mod topics;

pub use channels::{ChannelStore, PendingRemoval, RemovalTicket, RemoveChannelError, RemoveOutcome};
pub use chat::{AiStatusPoller, Author, ChatMessage, ChatSession};
pub use feed::{FeedRequest, FeedStore, Pagination};
pub use recommendations::RecommendationStore;
pub use search::{Debouncer, SearchRequest, SearchStore};
pub use topics::{Topic, TopicStore, TOPICS};
