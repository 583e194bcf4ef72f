//! Live preview references for the selected source image.
//!
//! A [`PreviewUrl`] stands for a displayable handle on the image being
//! edited. It is released when dropped, so replacing the source, discarding
//! the post, or dropping the session all release it without extra calls.
//! [`PreviewRegistry::live_count`] reports how many are outstanding.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: AtomicU64,
    live: Mutex<BTreeSet<u64>>,
}

impl RegistryInner {
    fn release(&self, id: u64) {
        let removed = self
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if removed {
            tracing::debug!(id, "released preview reference");
        }
    }
}

/// Issues and tracks preview references. Cloning shares the registry.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<RegistryInner>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new reference for `file_name`.
    pub fn create(&self, file_name: &str) -> PreviewUrl {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        tracing::debug!(id, file_name, "issued preview reference");
        PreviewUrl {
            id,
            url: format!("preview://{id}/{file_name}"),
            registry: Arc::clone(&self.inner),
        }
    }

    /// Number of references issued and not yet released.
    pub fn live_count(&self) -> usize {
        self.inner
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A live preview reference, released on drop.
pub struct PreviewUrl {
    id: u64,
    url: String,
    registry: Arc<RegistryInner>,
}

impl PreviewUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl fmt::Debug for PreviewUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PreviewUrl").field(&self.url).finish()
    }
}

impl fmt::Display for PreviewUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

impl Drop for PreviewUrl {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}
