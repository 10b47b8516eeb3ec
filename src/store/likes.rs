use crate::api::{ApiClient, ApiError};

/// Like a post by its source link. No local state changes either way.
pub async fn like(api: &ApiClient, post_url: &str) -> Result<(), ApiError> {
    if post_url.trim().is_empty() {
        return Err(ApiError::Validation("Post link is required".to_string()));
    }
    match api.like(post_url).await {
        Ok(()) => {
            tracing::info!(post_url, "Post liked");
            Ok(())
        }
        Err(e) => {
            tracing::warn!(post_url, error = %e, "Like failed");
            Err(e)
        }
    }
}
