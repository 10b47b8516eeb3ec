//! Small pure helpers shared by the stores and the terminal front end.
//!
//! - **Media links**: placeholder and CDN forms of post image URLs
//! - **Link checks**: which post links may be handed to the system opener
//! - **Text**: width-aware truncation and terminal sanitizing of post text

mod links;
mod media;
mod text;

pub use links::{validate_link_for_open, LinkError};
pub use media::{resolve_image_url, telegram_media_url, PLACEHOLDER_IMAGE_URL};
pub use text::{display_width, excerpt, sanitize, truncate_to_width};
