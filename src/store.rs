//! Storage collaborators for the upload workflow.
//!
//! The workflow talks to two stores through traits:
//!
//! | Trait | Operation | Local implementation |
//! |---|---|---|
//! | [`BlobStore`] | put bytes at a path, resolve a public URL | [`LocalBlobStore`]: files under a root directory |
//! | [`DocumentStore`] | insert a JSON record, returns its id | [`JsonDocumentStore`]: one `.json` file per record |
//! | [`DocumentReader`] | list a collection | [`JsonDocumentStore`] |
//!
//! Store paths are always relative, `/`-separated, and may not contain empty,
//! `.` or `..` segments; they are validated before anything touches disk.
//!
//! Document ids are the first 20 hex chars of a SHA-256 over the serialized
//! record, an insertion counter, and the wall clock, so two identical records
//! still get distinct ids.

use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid store path: {0:?}")]
    InvalidPath(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Rejected by store: {0}")]
    Rejected(String),
}

/// Reference to an uploaded blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobHandle {
    pub path: String,
}

/// Object storage for encoded images.
pub trait BlobStore: Sync {
    fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<BlobHandle, StoreError>;

    fn resolve_public_url(&self, handle: &BlobHandle) -> Result<String, StoreError>;
}

/// Write side of a document database.
pub trait DocumentStore: Sync {
    /// Insert a record into `collection`, returning the new document id.
    fn insert(&self, collection: &str, record: serde_json::Value) -> Result<String, StoreError>;
}

/// A stored document and its id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: serde_json::Value,
}

/// Read side of a document database.
pub trait DocumentReader {
    fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError>;
}

impl<T: BlobStore + ?Sized> BlobStore for &T {
    fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<BlobHandle, StoreError> {
        (**self).put(path, bytes, content_type)
    }

    fn resolve_public_url(&self, handle: &BlobHandle) -> Result<String, StoreError> {
        (**self).resolve_public_url(handle)
    }
}

impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    fn insert(&self, collection: &str, record: serde_json::Value) -> Result<String, StoreError> {
        (**self).insert(collection, record)
    }
}

impl<T: DocumentReader + ?Sized> DocumentReader for &T {
    fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        (**self).list(collection)
    }
}

/// Check a relative store path and return its segments.
fn validate_path(path: &str) -> Result<Vec<&str>, StoreError> {
    let invalid = || StoreError::InvalidPath(path.to_string());
    if path.is_empty() || path.starts_with('/') || path.contains('\\') {
        return Err(invalid());
    }
    let segments: Vec<&str> = path.split('/').collect();
    if segments
        .iter()
        .any(|s| s.is_empty() || *s == "." || *s == "..")
    {
        return Err(invalid());
    }
    Ok(segments)
}

fn resolve_under(root: &Path, path: &str) -> Result<PathBuf, StoreError> {
    let segments = validate_path(path)?;
    Ok(segments.iter().fold(root.to_path_buf(), |acc, s| acc.join(s)))
}

// =========================================================================
// LocalBlobStore
// =========================================================================

/// Blob store backed by a directory.
///
/// Public URLs are `{public_base_url}/{path}`; without a base URL they are
/// `file://` URLs of the written file.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: Option<String>,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: Option<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.map(|u| u.trim_end_matches('/').to_string()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BlobStore for LocalBlobStore {
    fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<BlobHandle, StoreError> {
        let target = resolve_under(&self.root, path)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, bytes)?;
        tracing::info!(path, bytes = bytes.len(), content_type, "stored blob");
        Ok(BlobHandle {
            path: path.to_string(),
        })
    }

    fn resolve_public_url(&self, handle: &BlobHandle) -> Result<String, StoreError> {
        let target = resolve_under(&self.root, &handle.path)?;
        if !target.is_file() {
            return Err(StoreError::NotFound(handle.path.clone()));
        }
        Ok(match &self.public_base_url {
            Some(base) => format!("{}/{}", base, handle.path),
            None => format!("file://{}", target.display()),
        })
    }
}

// =========================================================================
// JsonDocumentStore
// =========================================================================

/// Document store writing one pretty-printed JSON file per record to
/// `<root>/<collection>/<id>.json`.
#[derive(Debug)]
pub struct JsonDocumentStore {
    root: PathBuf,
    counter: AtomicU64,
}

/// Length of generated document ids.
const ID_LEN: usize = 20;

impl JsonDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            counter: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn next_id(&self, serialized: &[u8]) -> String {
        let count = self.counter.fetch_add(1, Ordering::Relaxed);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(serialized);
        hasher.update(count.to_le_bytes());
        hasher.update(nanos.to_le_bytes());
        let mut id = format!("{:x}", hasher.finalize());
        id.truncate(ID_LEN);
        id
    }
}

impl DocumentStore for JsonDocumentStore {
    fn insert(&self, collection: &str, record: serde_json::Value) -> Result<String, StoreError> {
        let dir = resolve_under(&self.root, collection)?;
        std::fs::create_dir_all(&dir)?;
        let serialized = serde_json::to_vec_pretty(&record)?;

        loop {
            let id = self.next_id(&serialized);
            let file = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(dir.join(format!("{id}.json")));
            match file {
                Ok(mut file) => {
                    io::Write::write_all(&mut file, &serialized)?;
                    tracing::info!(collection, id = %id, "inserted document");
                    return Ok(id);
                }
                // Counter moves on, so the next id differs.
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl DocumentReader for JsonDocumentStore {
    /// All documents in a collection, ordered by id. A missing collection is empty.
    fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        let dir = resolve_under(&self.root, collection)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut docs = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let data = serde_json::from_slice(&std::fs::read(&path)?)?;
            docs.push(StoredDocument {
                id: id.to_string(),
                data,
            });
        }
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs)
    }
}
