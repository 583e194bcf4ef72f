//! Shared test utilities for the shutterpost test suite.
//!
//! Provides synthetic image fixtures and in-memory stores that record every
//! call, so workflow tests can assert on exactly what was written.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let png = solid_png(8, 8, [200, 40, 40, 255]);
//! let blobs = RecordingBlobStore::new();
//! let docs = RecordingDocumentStore::failing();
//! // ... run a share ...
//! assert_eq!(blobs.puts().len(), 1);
//! assert!(docs.inserts().is_empty());
//! ```

use crate::store::{BlobHandle, BlobStore, DocumentStore, StoreError};
use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use std::io::Cursor;
use std::sync::Mutex;

// =========================================================================
// Image fixtures
// =========================================================================

/// Encode an RGBA image as PNG bytes.
pub fn encode_png(img: RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// PNG bytes of a single-color image.
pub fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    encode_png(RgbaImage::from_pixel(width, height, image::Rgba(rgba)))
}

/// PNG bytes of an image built pixel by pixel.
pub fn png_from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 4]) -> Vec<u8> {
    encode_png(RgbaImage::from_fn(width, height, |x, y| image::Rgba(f(x, y))))
}

/// Decode any encoded image to RGB for pixel assertions.
pub fn decode_rgb(bytes: &[u8]) -> RgbImage {
    image::load_from_memory(bytes).unwrap().to_rgb8()
}

// =========================================================================
// Recording stores
// =========================================================================

/// One recorded `BlobStore::put` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPut {
    pub path: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-memory blob store that records puts. URLs are `https://blobs.test/{path}`.
#[derive(Default)]
pub struct RecordingBlobStore {
    puts: Mutex<Vec<RecordedPut>>,
    fail_put: bool,
    fail_resolve: bool,
}

impl RecordingBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_put() -> Self {
        Self {
            fail_put: true,
            ..Self::default()
        }
    }

    pub fn failing_resolve() -> Self {
        Self {
            fail_resolve: true,
            ..Self::default()
        }
    }

    pub fn puts(&self) -> Vec<RecordedPut> {
        self.puts.lock().unwrap().clone()
    }
}

impl BlobStore for RecordingBlobStore {
    fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<BlobHandle, StoreError> {
        if self.fail_put {
            return Err(StoreError::Rejected("blob write refused".into()));
        }
        self.puts.lock().unwrap().push(RecordedPut {
            path: path.to_string(),
            bytes: bytes.to_vec(),
            content_type: content_type.to_string(),
        });
        Ok(BlobHandle {
            path: path.to_string(),
        })
    }

    fn resolve_public_url(&self, handle: &BlobHandle) -> Result<String, StoreError> {
        if self.fail_resolve {
            return Err(StoreError::NotFound(handle.path.clone()));
        }
        Ok(format!("https://blobs.test/{}", handle.path))
    }
}

/// In-memory document store that records inserts. Ids are `doc-1`, `doc-2`, ...
#[derive(Default)]
pub struct RecordingDocumentStore {
    inserts: Mutex<Vec<(String, serde_json::Value)>>,
    fail: bool,
}

impl RecordingDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Successfully persisted records.
    pub fn inserts(&self) -> Vec<(String, serde_json::Value)> {
        self.inserts.lock().unwrap().clone()
    }
}

impl DocumentStore for RecordingDocumentStore {
    fn insert(&self, collection: &str, record: serde_json::Value) -> Result<String, StoreError> {
        if self.fail {
            return Err(StoreError::Rejected("record write refused".into()));
        }
        let mut inserts = self.inserts.lock().unwrap();
        inserts.push((collection.to_string(), record));
        Ok(format!("doc-{}", inserts.len()))
    }
}
