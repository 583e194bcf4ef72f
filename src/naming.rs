//! Blob path naming for uploaded post images.
//!
//! Every rasterized image is stored under the author's folder with a
//! millisecond timestamp prefix, so two uploads of the same file never collide:
//!
//! - `posts/u1/1700000000000-beach-day.jpg` (from `beach day.png`)
//! - `posts/u1/1700000000000-upload.jpg` (from `.png` or an empty name)
//!
//! The extension of the source is dropped: the stored bytes are always JPEG.
//! Originals uploaded without editing keep their file name as-is
//! (see [`original_blob_paths`]).

use crate::imaging::OUTPUT_EXTENSION;

/// Root folder for post images.
pub const POSTS_PREFIX: &str = "posts";

/// Stem used when the source name has nothing usable.
pub const FALLBACK_STEM: &str = "upload";

/// Turn an original file name into a path-safe stem.
///
/// A trailing extension (a final `.` followed by at least one character and
/// no `/`) is stripped, every whitespace run becomes a single `-`, and path
/// separators become `_` so the stem stays inside one path segment.
/// Surrounding whitespace is not trimmed.
///
/// - `"beach day.png"` → `"beach-day"`
/// - `"IMG_0001.HEIC"` → `"IMG_0001"`
/// - `"archive.tar.gz"` → `"archive.tar"`
/// - `"v1.2/raw"` → `"v1.2_raw"`
/// - `".png"` → `"upload"`
pub fn safe_file_name(original: &str) -> String {
    let stem = match original.rfind('.') {
        Some(dot) if dot + 1 < original.len() && !original[dot + 1..].contains('/') => {
            &original[..dot]
        }
        _ => original,
    };
    if stem.is_empty() {
        return FALLBACK_STEM.to_string();
    }

    let mut out = String::with_capacity(stem.len());
    let mut in_space = false;
    for c in stem.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('-');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        out.push(segment_char(c));
    }
    out
}

fn segment_char(c: char) -> char {
    if c == '/' || c == '\\' { '_' } else { c }
}

/// Blob path for a post image: `posts/{uid}/{millis}-{safe_name}.jpg`.
pub fn blob_path(user_id: &str, created_at_millis: u64, original_name: &str) -> String {
    format!(
        "{}/{}/{}-{}.{}",
        POSTS_PREFIX,
        user_id,
        created_at_millis,
        safe_file_name(original_name),
        OUTPUT_EXTENSION
    )
}

/// Blob paths for original files uploaded without rasterization:
/// `posts/{uid}/{millis}-{name}`, keeping each name and its extension.
///
/// Separators in a name become `_` and an empty name becomes `upload`. A name
/// already used earlier in the batch gets its position added
/// (`{millis}-{index}-{name}`) so no two files share a path.
pub fn original_blob_paths(user_id: &str, created_at_millis: u64, names: &[&str]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let name: String = if name.is_empty() {
                FALLBACK_STEM.to_string()
            } else {
                name.chars().map(segment_char).collect()
            };
            let file = if seen.insert(name.clone()) {
                format!("{created_at_millis}-{name}")
            } else {
                format!("{created_at_millis}-{index}-{name}")
            };
            format!("{POSTS_PREFIX}/{user_id}/{file}")
        })
        .collect()
}
