//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## Filters
//!
//! ```text
//! 001 Normal (normal)
//!     Effect: none
//! 003 Clarendon (clarendon)
//!     Effect: contrast(1.2) saturate(1.35)
//! ```
//!
//! ## Preview
//!
//! ```text
//! Filter: Clarendon (clarendon) at 50%
//!     Effect: contrast(1.1) saturate(1.175)
//! Adjustments: brightness 40, vignette 100
//!     Effect: brightness(1.4)
//!     Vignette: 0.6
//! Zoom: 1.5x
//! Preview: contrast(1.1) saturate(1.175) brightness(1.4)
//! ```
//!
//! ## Feed
//!
//! ```text
//! 001 ana_k (3 likes, 1 comment)
//!     Caption: sunset at the pier
//!     Location: Busan
//!     Image: https://cdn.example.com/posts/u1/1700000000000-beach.jpg
//!     Posted: 2023-11-14 22:13 UTC
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::imaging::{Adjustment, FilterDefinition, RenderedImage, apply_strength};
use crate::pending::PendingPost;
use crate::types::FeedPost;
use crate::upload::{ShareOutcome, UploadState};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_text(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Unix milliseconds as `YYYY-MM-DD HH:MM UTC`.
fn format_timestamp(millis: u64) -> Option<String> {
    let at = chrono::DateTime::from_timestamp_millis(i64::try_from(millis).ok()?)?;
    Some(at.format("%Y-%m-%d %H:%M UTC").to_string())
}

fn plural(n: u64, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{} {}", n, one)
    } else {
        format!("{} {}", n, many)
    }
}

// ============================================================================
// filters
// ============================================================================

/// Format the filter catalog, optionally showing each effect at `strength`.
pub fn format_filters(filters: &[FilterDefinition], strength: Option<f64>) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, filter) in filters.iter().enumerate() {
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            filter.label,
            filter.id
        ));
        lines.push(format!("{}Effect: {}", indent(1), filter.base_effect));
        if let Some(s) = strength {
            lines.push(format!(
                "{}At {}%: {}",
                indent(1),
                s,
                apply_strength(&filter.base_effect, s)
            ));
        }
    }
    lines
}

pub fn print_filters(filters: &[FilterDefinition], strength: Option<f64>) {
    for line in format_filters(filters, strength) {
        println!("{}", line);
    }
}

// ============================================================================
// preview
// ============================================================================

/// Format the composed effect of a pending post.
pub fn format_preview(post: &PendingPost) -> Vec<String> {
    let composed = post.composed();
    let filter = post.filter();
    let mut lines = vec![format!(
        "Filter: {} ({}) at {}%",
        filter.label,
        filter.id,
        post.filter_strength()
    )];
    lines.push(format!("{}Effect: {}", indent(1), composed.filter));

    let state = post.adjustments();
    let active: Vec<String> = Adjustment::ALL
        .iter()
        .filter(|a| state.get(**a) != 0)
        .map(|a| format!("{} {}", a.id(), state.get(*a)))
        .collect();
    if active.is_empty() {
        lines.push("Adjustments: none".to_string());
    } else {
        lines.push(format!("Adjustments: {}", active.join(", ")));
        lines.push(format!("{}Effect: {}", indent(1), composed.adjustments));
        if composed.vignette_opacity > 0.0 {
            lines.push(format!(
                "{}Vignette: {}",
                indent(1),
                composed.vignette_opacity
            ));
        }
    }

    lines.push(format!("Zoom: {}x", post.zoom()));
    lines.push(format!("Preview: {}", composed.combined));
    lines
}

pub fn print_preview(post: &PendingPost) {
    for line in format_preview(post) {
        println!("{}", line);
    }
}

// ============================================================================
// render
// ============================================================================

/// Format the result of rendering to a file.
pub fn format_render(rendered: &RenderedImage, dimensions: (u32, u32), output: &Path) -> Vec<String> {
    vec![
        format!("Rendered → {}", output.display()),
        format!(
            "{}{}x{} {} ({} bytes)",
            indent(1),
            dimensions.0,
            dimensions.1,
            rendered.content_type,
            rendered.bytes.len()
        ),
    ]
}

pub fn print_render(rendered: &RenderedImage, dimensions: (u32, u32), output: &Path) {
    for line in format_render(rendered, dimensions, output) {
        println!("{}", line);
    }
}

// ============================================================================
// share
// ============================================================================

/// Format a share outcome together with the workflow's final state.
pub fn format_share(outcome: &ShareOutcome, state: &UploadState) -> Vec<String> {
    if outcome.ok {
        let id = outcome.post_id.as_deref().unwrap_or_default();
        return vec![format!("Shared post {}", id)];
    }

    let message = outcome.message.as_deref().unwrap_or("unknown error");
    match state {
        UploadState::Failed { reason, .. } => {
            vec![format!("Share failed ({}): {}", reason, message)]
        }
        _ => vec![format!("Share failed: {}", message)],
    }
}

pub fn print_share(outcome: &ShareOutcome, state: &UploadState) {
    for line in format_share(outcome, state) {
        println!("{}", line);
    }
}

// ============================================================================
// feed
// ============================================================================

const CAPTION_WIDTH: usize = 60;

/// Format a page of feed posts, newest first.
pub fn format_feed(posts: &[FeedPost]) -> Vec<String> {
    if posts.is_empty() {
        return vec!["No posts yet".to_string()];
    }

    let mut lines = Vec::new();
    for (i, post) in posts.iter().enumerate() {
        lines.push(format!(
            "{} {} ({}, {})",
            format_index(i + 1),
            post.username,
            plural(post.like_count, "like", "likes"),
            plural(post.comment_count, "comment", "comments")
        ));
        if !post.caption.is_empty() {
            lines.push(format!(
                "{}Caption: {}",
                indent(1),
                truncate_text(&post.caption, CAPTION_WIDTH)
            ));
        }
        if !post.location.is_empty() {
            lines.push(format!("{}Location: {}", indent(1), post.location));
        }
        for url in &post.image_urls {
            lines.push(format!("{}Image: {}", indent(1), url));
        }
        if let Some(posted) = post.created_at.and_then(format_timestamp) {
            lines.push(format!("{}Posted: {}", indent(1), posted));
        }
    }
    lines
}

pub fn print_feed(posts: &[FeedPost]) {
    for line in format_feed(posts) {
        println!("{}", line);
    }
}
