//! Reading shared posts back, newest first.
//!
//! Stored records are mapped leniently: a field that is missing or has the
//! wrong JSON type takes its default instead of failing the whole page.

use crate::store::{DocumentReader, StoreError, StoredDocument};
use crate::types::{FALLBACK_USERNAME, FeedPost, POSTS_COLLECTION};
use serde_json::Value;
use thiserror::Error;

/// Posts per page when not configured.
pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to load posts: {0}")]
    Store(#[from] StoreError),
}

fn text(data: &Value, key: &str) -> Option<String> {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn count(data: &Value, key: &str) -> u64 {
    data.get(key).and_then(Value::as_u64).unwrap_or(0)
}

/// Map a stored document into a feed post, filling defaults.
pub fn map_post(doc: &StoredDocument) -> FeedPost {
    let data = &doc.data;
    let image_urls = data
        .get("imageUrls")
        .and_then(Value::as_array)
        .map(|urls| {
            urls.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    FeedPost {
        id: doc.id.clone(),
        user_id: text(data, "userId").unwrap_or_default(),
        username: text(data, "username").unwrap_or_else(|| FALLBACK_USERNAME.to_string()),
        profile_image_url: text(data, "profileImageUrl").unwrap_or_default(),
        image_urls,
        caption: text(data, "caption").unwrap_or_default(),
        location: text(data, "location").unwrap_or_default(),
        like_count: count(data, "likeCount"),
        comment_count: count(data, "commentCount"),
        created_at: data.get("createdAt").and_then(Value::as_u64),
    }
}

/// The newest `limit` posts, ordered by `createdAt` descending.
///
/// Posts without a timestamp sort after every timestamped post.
pub fn recent_posts(reader: &impl DocumentReader, limit: usize) -> Result<Vec<FeedPost>, FeedError> {
    let mut posts: Vec<FeedPost> = reader
        .list(POSTS_COLLECTION)?
        .iter()
        .map(map_post)
        .collect();
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    posts.truncate(limit);
    tracing::debug!(count = posts.len(), limit, "loaded feed");
    Ok(posts)
}
