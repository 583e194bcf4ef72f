//! Post records shared between the upload workflow and the feed reader.
//!
//! Records are stored as camelCase JSON documents in the `posts` collection.
//! The write side ([`NewPost`]) is strict; the read side ([`FeedPost`]) is
//! lenient and fills in defaults for anything missing or mistyped.

use serde::{Deserialize, Serialize};

/// Collection every post record is inserted into.
pub const POSTS_COLLECTION: &str = "posts";

/// Author name used when the session has neither a nickname nor a username.
pub const FALLBACK_USERNAME: &str = "user";

/// Avatar path used when the session has no photo URL.
pub const DEFAULT_AVATAR: &str = "/images/profile/avatar-default.png";

/// A post record as written by the upload workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub user_id: String,
    pub username: String,
    pub profile_image_url: String,
    pub image_urls: Vec<String>,
    pub caption: String,
    pub location: String,
    pub like_count: u64,
    pub comment_count: u64,
    /// Unix milliseconds.
    pub created_at: u64,
    /// Set by the edit flow; direct uploads of originals leave it out.
    #[serde(flatten)]
    pub sharing: Option<SharingOptions>,
}

/// Accessibility and visibility options chosen on the details step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharingOptions {
    pub alt_text: String,
    pub hide_metrics: bool,
    pub disable_comments: bool,
    pub share_to_threads: bool,
}

/// A post record as shown in the feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPost {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub profile_image_url: String,
    pub image_urls: Vec<String>,
    pub caption: String,
    pub location: String,
    pub like_count: u64,
    pub comment_count: u64,
    /// Unix milliseconds; `None` when the record has no usable timestamp.
    pub created_at: Option<u64>,
}
