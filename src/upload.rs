//! Sharing a post: validate, rasterize, upload, record.
//!
//! ```text
//! Idle → Validating → Rasterizing → UploadingImage → WritingRecord → Succeeded
//!            │             │               │                │
//!            └─────────────┴───────────────┴────────────────┴──→ Failed(reason)
//! ```
//!
//! The workflow keeps its state behind a mutex: checking for a run in
//! progress and entering `Validating` happen under one lock, so a second
//! `share` while a run is active returns a not-ok outcome without reading the
//! session or touching any store. Terminal states (`Succeeded`, `Failed`)
//! accept a new run, which is how a failed share is retried.
//!
//! Validation reads the session before looking at the image, and no I/O
//! happens until both pass. The blob is written before the record; if the
//! record insert fails the blob stays where it is.
//!
//! The post's [`CancelToken`](crate::pending::CancelToken) is checked before
//! each stage. A store call already in flight is not interrupted.
//!
//! [`UploadWorkflow::share_direct`] shares a [`DirectPost`] the same way but
//! skips `Rasterizing`: every original file is stored under its own name with
//! its own content type, and one record lists all of their URLs.

use crate::imaging::{Quality, RasterBackend, RasterError, render};
use crate::naming::{blob_path, original_blob_paths};
use crate::pending::{DirectPost, PendingPost, SourceImage};
use crate::session::SessionProvider;
use crate::store::{BlobStore, DocumentStore, StoreError};
use crate::types::{NewPost, POSTS_COLLECTION, SharingOptions};
use rayon::prelude::*;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Sign in to share a post")]
    NotAuthenticated,
    #[error("Choose an image to share")]
    NoImage,
    #[error("Failed to render image: {0}")]
    Rasterization(#[from] RasterError),
    #[error("Failed to upload image: {0}")]
    Storage(#[source] StoreError),
    #[error("Failed to save post: {0}")]
    Persistence(#[source] StoreError),
    #[error("Upload cancelled")]
    Cancelled,
}

impl UploadError {
    pub fn reason(&self) -> FailureReason {
        match self {
            UploadError::NotAuthenticated => FailureReason::NotAuthenticated,
            UploadError::NoImage => FailureReason::NoImage,
            UploadError::Rasterization(_) => FailureReason::Rasterization,
            UploadError::Storage(_) => FailureReason::Storage,
            UploadError::Persistence(_) => FailureReason::Persistence,
            UploadError::Cancelled => FailureReason::Cancelled,
        }
    }
}

/// Why a run ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    NotAuthenticated,
    NoImage,
    Rasterization,
    Storage,
    Persistence,
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureReason::NotAuthenticated => "not-authenticated",
            FailureReason::NoImage => "no-image",
            FailureReason::Rasterization => "rasterization",
            FailureReason::Storage => "storage",
            FailureReason::Persistence => "persistence",
            FailureReason::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadState {
    #[default]
    Idle,
    Validating,
    Rasterizing,
    UploadingImage,
    WritingRecord,
    Succeeded {
        post_id: String,
    },
    Failed {
        reason: FailureReason,
        message: String,
    },
}

impl UploadState {
    /// A run is in progress.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            UploadState::Validating
                | UploadState::Rasterizing
                | UploadState::UploadingImage
                | UploadState::WritingRecord
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadState::Succeeded { .. } | UploadState::Failed { .. }
        )
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadState::Idle => f.write_str("idle"),
            UploadState::Validating => f.write_str("validating"),
            UploadState::Rasterizing => f.write_str("rasterizing"),
            UploadState::UploadingImage => f.write_str("uploading-image"),
            UploadState::WritingRecord => f.write_str("writing-record"),
            UploadState::Succeeded { post_id } => write!(f, "succeeded({post_id})"),
            UploadState::Failed { reason, .. } => write!(f, "failed({reason})"),
        }
    }
}

/// Result of one `share` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareOutcome {
    pub ok: bool,
    pub message: Option<String>,
    pub post_id: Option<String>,
}

impl ShareOutcome {
    fn shared(post_id: String) -> Self {
        Self {
            ok: true,
            message: None,
            post_id: Some(post_id),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: Some(message.into()),
            post_id: None,
        }
    }
}

/// Milliseconds since the Unix epoch.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

type Clock = Box<dyn Fn() -> u64 + Send + Sync>;

/// Drives one pending post at a time through the share pipeline.
pub struct UploadWorkflow<R, B, D> {
    backend: R,
    blobs: B,
    documents: D,
    quality: Quality,
    clock: Clock,
    state: Mutex<UploadState>,
}

impl<R, B, D> UploadWorkflow<R, B, D>
where
    R: RasterBackend,
    B: BlobStore,
    D: DocumentStore,
{
    pub fn new(backend: R, blobs: B, documents: D) -> Self {
        Self {
            backend,
            blobs,
            documents,
            quality: Quality::default(),
            clock: Box::new(unix_millis),
            state: Mutex::new(UploadState::Idle),
        }
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Replace the wall clock used for blob paths and `createdAt`.
    pub fn with_clock(mut self, clock: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn state(&self) -> UploadState {
        self.lock().clone()
    }

    /// Return a finished workflow to `Idle`. Does nothing while a run is active.
    pub fn reset(&self) {
        let mut state = self.lock();
        if !state.is_busy() {
            *state = UploadState::Idle;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, UploadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, next: UploadState) {
        let mut state = self.lock();
        let current: &UploadState = &state;
        tracing::info!(from = %current, to = %next, "upload state");
        *state = next;
    }

    /// Enter `Validating` unless a run is already in progress.
    fn begin(&self) -> bool {
        let mut state = self.lock();
        let current: &UploadState = &state;
        if current.is_busy() {
            tracing::warn!(state = %current, "share rejected, upload in progress");
            return false;
        }
        tracing::info!(from = %current, to = "validating", "upload state");
        *state = UploadState::Validating;
        true
    }

    /// Share a pending post on behalf of the current session.
    pub fn share(&self, post: &PendingPost, session: &impl SessionProvider) -> ShareOutcome {
        self.drive(|| self.run(post, session))
    }

    /// Share original files as one post, skipping rasterization.
    ///
    /// Runs `Validating → UploadingImage → WritingRecord`. Files are uploaded
    /// in parallel and their URLs kept in selection order; any failed upload
    /// fails the run before the record is written.
    pub fn share_direct(&self, post: &DirectPost, session: &impl SessionProvider) -> ShareOutcome {
        self.drive(|| self.run_direct(post, session))
    }

    fn drive(&self, run: impl FnOnce() -> Result<String, UploadError>) -> ShareOutcome {
        if !self.begin() {
            return ShareOutcome::failed("An upload is already in progress");
        }

        match run() {
            Ok(post_id) => {
                self.transition(UploadState::Succeeded {
                    post_id: post_id.clone(),
                });
                ShareOutcome::shared(post_id)
            }
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(reason = %err.reason(), error = %message, "share failed");
                self.transition(UploadState::Failed {
                    reason: err.reason(),
                    message: message.clone(),
                });
                ShareOutcome::failed(message)
            }
        }
    }

    fn run(&self, post: &PendingPost, session: &impl SessionProvider) -> Result<String, UploadError> {
        ensure_active(post.is_cancelled())?;
        let session = session.current();
        let user_id = session
            .authenticated_user_id()
            .ok_or(UploadError::NotAuthenticated)?;
        let source = post.source().ok_or(UploadError::NoImage)?;

        ensure_active(post.is_cancelled())?;
        self.transition(UploadState::Rasterizing);
        let params = post.raster_params(self.quality);
        let rendered = render(&self.backend, &source.bytes, &params)?;

        ensure_active(post.is_cancelled())?;
        self.transition(UploadState::UploadingImage);
        let created_at = (self.clock)();
        let path = blob_path(user_id, created_at, &source.file_name);
        let image_url = self.upload(&path, &rendered.bytes, rendered.content_type)?;

        ensure_active(post.is_cancelled())?;
        self.transition(UploadState::WritingRecord);
        let details = post.details();
        let post_id = self.insert_record(&NewPost {
            user_id: user_id.to_string(),
            username: session.display_name().to_string(),
            profile_image_url: session.profile_image_url().to_string(),
            image_urls: vec![image_url],
            caption: details.caption.trim().to_string(),
            location: details.location.trim().to_string(),
            like_count: 0,
            comment_count: 0,
            created_at,
            sharing: Some(SharingOptions {
                alt_text: details.alt_text.trim().to_string(),
                hide_metrics: details.hide_metrics,
                disable_comments: details.disable_comments,
                share_to_threads: details.share_to_threads,
            }),
        })?;

        tracing::info!(post_id = %post_id, path = %path, "shared post");
        Ok(post_id)
    }

    fn run_direct(
        &self,
        post: &DirectPost,
        session: &impl SessionProvider,
    ) -> Result<String, UploadError> {
        ensure_active(post.is_cancelled())?;
        let session = session.current();
        let user_id = session
            .authenticated_user_id()
            .ok_or(UploadError::NotAuthenticated)?;
        if post.is_empty() {
            return Err(UploadError::NoImage);
        }

        ensure_active(post.is_cancelled())?;
        self.transition(UploadState::UploadingImage);
        let created_at = (self.clock)();
        let sources: Vec<&SourceImage> = post.sources().collect();
        let names: Vec<&str> = sources.iter().map(|s| s.file_name.as_str()).collect();
        let paths = original_blob_paths(user_id, created_at, &names);
        let image_urls = sources
            .par_iter()
            .zip(paths.par_iter())
            .map(|(source, path)| self.upload(path, &source.bytes, &source.content_type))
            .collect::<Result<Vec<String>, UploadError>>()?;

        ensure_active(post.is_cancelled())?;
        self.transition(UploadState::WritingRecord);
        let post_id = self.insert_record(&NewPost {
            user_id: user_id.to_string(),
            username: session.display_name().to_string(),
            profile_image_url: session.profile_image_url().to_string(),
            image_urls,
            caption: post.caption().trim().to_string(),
            location: post.location().trim().to_string(),
            like_count: 0,
            comment_count: 0,
            created_at,
            sharing: None,
        })?;

        tracing::info!(post_id = %post_id, images = paths.len(), "shared original files");
        Ok(post_id)
    }

    /// Put one blob and resolve its public URL.
    fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String, UploadError> {
        let handle = self
            .blobs
            .put(path, bytes, content_type)
            .map_err(UploadError::Storage)?;
        self.blobs
            .resolve_public_url(&handle)
            .map_err(UploadError::Storage)
    }

    fn insert_record(&self, record: &NewPost) -> Result<String, UploadError> {
        let value = serde_json::to_value(record)
            .map_err(|e| UploadError::Persistence(StoreError::Json(e)))?;
        self.documents
            .insert(POSTS_COLLECTION, value)
            .map_err(UploadError::Persistence)
    }
}

fn ensure_active(cancelled: bool) -> Result<(), UploadError> {
    if cancelled {
        return Err(UploadError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Adjustment;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::pending::SourceImage;
    use crate::session::SessionSnapshot;
    use crate::test_helpers::{RecordingBlobStore, RecordingDocumentStore};

    const NOW: u64 = 1_700_000_000_000;

    fn post_with_image() -> PendingPost {
        let mut post = PendingPost::default();
        post.select_image(SourceImage::new("beach day.png", "image/png", b"png".to_vec()))
            .unwrap();
        post
    }

    fn session() -> SessionSnapshot {
        SessionSnapshot::signed_in("u1").with_username("ana_k")
    }

    struct Fixture {
        backend: MockBackend,
        blobs: RecordingBlobStore,
        docs: RecordingDocumentStore,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                backend: MockBackend::new(),
                blobs: RecordingBlobStore::new(),
                docs: RecordingDocumentStore::new(),
            }
        }

        fn workflow(
            &self,
        ) -> UploadWorkflow<&MockBackend, &RecordingBlobStore, &RecordingDocumentStore> {
            UploadWorkflow::new(&self.backend, &self.blobs, &self.docs).with_clock(|| NOW)
        }
    }

    // =========================================================================
    // validation
    // =========================================================================

    #[test]
    fn anonymous_share_fails_without_io() {
        let fx = Fixture::new();
        let workflow = fx.workflow();

        let outcome = workflow.share(&post_with_image(), &SessionSnapshot::anonymous());

        assert!(!outcome.ok);
        assert!(matches!(
            workflow.state(),
            UploadState::Failed {
                reason: FailureReason::NotAuthenticated,
                ..
            }
        ));
        assert!(fx.backend.get_operations().is_empty());
        assert!(fx.blobs.puts().is_empty());
        assert!(fx.docs.inserts().is_empty());
    }

    #[test]
    fn session_is_checked_before_image() {
        let fx = Fixture::new();
        let workflow = fx.workflow();

        workflow.share(&PendingPost::default(), &SessionSnapshot::anonymous());

        assert!(matches!(
            workflow.state(),
            UploadState::Failed {
                reason: FailureReason::NotAuthenticated,
                ..
            }
        ));
    }

    #[test]
    fn missing_image_fails_without_io() {
        let fx = Fixture::new();
        let workflow = fx.workflow();

        let outcome = workflow.share(&PendingPost::default(), &session());

        assert!(!outcome.ok);
        assert_eq!(outcome.message.as_deref(), Some("Choose an image to share"));
        assert!(matches!(
            workflow.state(),
            UploadState::Failed {
                reason: FailureReason::NoImage,
                ..
            }
        ));
        assert!(fx.backend.get_operations().is_empty());
    }

    // =========================================================================
    // happy path
    // =========================================================================

    #[test]
    fn share_uploads_then_records() {
        let fx = Fixture::new();
        let workflow = fx.workflow();
        let mut post = post_with_image();
        post.select_filter("clarendon");
        post.set_filter_strength(50.0);
        post.set_adjustment(Adjustment::Vignette, 100);
        post.set_caption("  sunset  ");
        post.set_location(" Busan ");
        post.set_alt_text("waves ");
        post.details_mut().disable_comments = true;

        let outcome = workflow.share(&post, &session());

        assert!(outcome.ok, "{outcome:?}");
        assert_eq!(outcome.post_id.as_deref(), Some("doc-1"));
        assert_eq!(
            workflow.state(),
            UploadState::Succeeded {
                post_id: "doc-1".into()
            }
        );

        let ops = fx.backend.get_operations();
        assert!(matches!(
            &ops[0],
            RecordedOp::Rasterize { effect, quality: 92, vignette_opacity, .. }
                if effect == "contrast(1.1) saturate(1.175)" && (*vignette_opacity - 0.6).abs() < 1e-9
        ));

        let puts = fx.blobs.puts();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].path, "posts/u1/1700000000000-beach-day.jpg");
        assert_eq!(puts[0].content_type, "image/jpeg");
        assert_eq!(puts[0].bytes, b"mock-jpeg");

        let inserts = fx.docs.inserts();
        assert_eq!(inserts.len(), 1);
        let (collection, record) = &inserts[0];
        assert_eq!(collection, "posts");
        assert_eq!(record["userId"], "u1");
        assert_eq!(record["username"], "ana_k");
        assert_eq!(record["profileImageUrl"], "/images/profile/avatar-default.png");
        assert_eq!(
            record["imageUrls"][0],
            "https://blobs.test/posts/u1/1700000000000-beach-day.jpg"
        );
        assert_eq!(record["caption"], "sunset");
        assert_eq!(record["location"], "Busan");
        assert_eq!(record["altText"], "waves");
        assert_eq!(record["likeCount"], 0);
        assert_eq!(record["commentCount"], 0);
        assert_eq!(record["createdAt"], NOW);
        assert_eq!(record["hideMetrics"], false);
        assert_eq!(record["disableComments"], true);
        assert_eq!(record["shareToThreads"], true);
    }

    #[test]
    fn quality_is_configurable() {
        let fx = Fixture::new();
        let workflow = fx.workflow().with_quality(Quality::new(75));
        workflow.share(&post_with_image(), &session());
        assert!(matches!(
            &fx.backend.get_operations()[0],
            RecordedOp::Rasterize { quality: 75, .. }
        ));
    }

    // =========================================================================
    // failures
    // =========================================================================

    #[test]
    fn raster_failure_stops_before_upload() {
        let fx = Fixture {
            backend: MockBackend::failing(),
            ..Fixture::new()
        };
        let workflow = fx.workflow();

        let outcome = workflow.share(&post_with_image(), &session());

        assert!(!outcome.ok);
        assert!(matches!(
            workflow.state(),
            UploadState::Failed {
                reason: FailureReason::Rasterization,
                ..
            }
        ));
        assert!(fx.blobs.puts().is_empty());
        assert!(fx.docs.inserts().is_empty());
    }

    #[test]
    fn blob_failure_is_storage_error() {
        let fx = Fixture {
            blobs: RecordingBlobStore::failing_put(),
            ..Fixture::new()
        };
        let workflow = fx.workflow();

        workflow.share(&post_with_image(), &session());

        assert!(matches!(
            workflow.state(),
            UploadState::Failed {
                reason: FailureReason::Storage,
                ..
            }
        ));
        assert!(fx.docs.inserts().is_empty());
    }

    #[test]
    fn url_failure_is_storage_error() {
        let fx = Fixture {
            blobs: RecordingBlobStore::failing_resolve(),
            ..Fixture::new()
        };
        let workflow = fx.workflow();

        workflow.share(&post_with_image(), &session());

        assert!(matches!(
            workflow.state(),
            UploadState::Failed {
                reason: FailureReason::Storage,
                ..
            }
        ));
        assert_eq!(fx.blobs.puts().len(), 1);
        assert!(fx.docs.inserts().is_empty());
    }

    #[test]
    fn record_failure_leaves_blob_in_place() {
        let fx = Fixture {
            docs: RecordingDocumentStore::failing(),
            ..Fixture::new()
        };
        let workflow = fx.workflow();

        let outcome = workflow.share(&post_with_image(), &session());

        assert!(!outcome.ok);
        assert!(outcome.message.unwrap().starts_with("Failed to save post"));
        assert!(matches!(
            workflow.state(),
            UploadState::Failed {
                reason: FailureReason::Persistence,
                ..
            }
        ));
        assert_eq!(fx.blobs.puts().len(), 1);
        assert!(fx.docs.inserts().is_empty());
    }

    #[test]
    fn failed_share_can_be_retried() {
        let fx = Fixture::new();
        let workflow = fx.workflow();
        let post = post_with_image();

        assert!(!workflow.share(&post, &SessionSnapshot::anonymous()).ok);
        assert!(workflow.share(&post, &session()).ok);
        assert_eq!(fx.docs.inserts().len(), 1);
    }

    // =========================================================================
    // cancellation and re-entry
    // =========================================================================

    #[test]
    fn cancelled_post_is_not_uploaded() {
        let fx = Fixture::new();
        let workflow = fx.workflow();
        let post = post_with_image();
        post.cancellation().cancel();

        let outcome = workflow.share(&post, &session());

        assert!(!outcome.ok);
        assert!(matches!(
            workflow.state(),
            UploadState::Failed {
                reason: FailureReason::Cancelled,
                ..
            }
        ));
        assert!(fx.backend.get_operations().is_empty());
        assert!(fx.blobs.puts().is_empty());
    }

    #[test]
    fn busy_workflow_rejects_share() {
        let fx = Fixture::new();
        let workflow = fx.workflow();
        *workflow.lock() = UploadState::UploadingImage;

        let outcome = workflow.share(&post_with_image(), &session());

        assert!(!outcome.ok);
        assert_eq!(workflow.state(), UploadState::UploadingImage);
        assert!(fx.backend.get_operations().is_empty());
        assert!(fx.blobs.puts().is_empty());
    }

    #[test]
    fn reset_only_from_finished_states() {
        let fx = Fixture::new();
        let workflow = fx.workflow();
        *workflow.lock() = UploadState::Rasterizing;
        workflow.reset();
        assert_eq!(workflow.state(), UploadState::Rasterizing);

        *workflow.lock() = UploadState::Succeeded {
            post_id: "x".into(),
        };
        workflow.reset();
        assert_eq!(workflow.state(), UploadState::Idle);
    }

    #[test]
    fn state_predicates() {
        assert!(!UploadState::Idle.is_busy());
        assert!(UploadState::Validating.is_busy());
        assert!(UploadState::WritingRecord.is_busy());
        assert!(
            UploadState::Failed {
                reason: FailureReason::NoImage,
                message: String::new()
            }
            .is_terminal()
        );
        assert!(!UploadState::Idle.is_terminal());
    }

    // =========================================================================
    // direct upload
    // =========================================================================

    fn direct_post(names: &[&str]) -> DirectPost {
        let mut post = DirectPost::default();
        post.select_files(
            names
                .iter()
                .map(|n| SourceImage::new(*n, "image/webp", n.as_bytes().to_vec()))
                .collect(),
        )
        .unwrap();
        post
    }

    #[test]
    fn direct_share_uploads_originals_into_one_record() {
        let fx = Fixture::new();
        let workflow = fx.workflow();
        let mut post = direct_post(&["a.webp", "b c.webp", "d.webp"]);
        post.set_caption(" trip ");
        post.set_location("Jeju ");

        let outcome = workflow.share_direct(&post, &session());

        assert!(outcome.ok, "{outcome:?}");
        assert!(fx.backend.get_operations().is_empty());

        let mut puts = fx.blobs.puts();
        puts.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(puts.len(), 3);
        assert_eq!(puts[0].path, "posts/u1/1700000000000-a.webp");
        assert_eq!(puts[0].bytes, b"a.webp");
        assert_eq!(puts[0].content_type, "image/webp");

        let inserts = fx.docs.inserts();
        assert_eq!(inserts.len(), 1);
        let record = &inserts[0].1;
        assert_eq!(
            record["imageUrls"],
            serde_json::json!([
                "https://blobs.test/posts/u1/1700000000000-a.webp",
                "https://blobs.test/posts/u1/1700000000000-b c.webp",
                "https://blobs.test/posts/u1/1700000000000-d.webp",
            ])
        );
        assert_eq!(record["caption"], "trip");
        assert_eq!(record["location"], "Jeju");
        assert_eq!(record["username"], "ana_k");
        assert_eq!(record["createdAt"], NOW);
        assert!(record.get("altText").is_none());
    }

    #[test]
    fn direct_share_validates_session_then_files() {
        let fx = Fixture::new();
        let workflow = fx.workflow();

        workflow.share_direct(&DirectPost::default(), &SessionSnapshot::anonymous());
        assert!(matches!(
            workflow.state(),
            UploadState::Failed {
                reason: FailureReason::NotAuthenticated,
                ..
            }
        ));

        let outcome = workflow.share_direct(&DirectPost::default(), &session());
        assert!(!outcome.ok);
        assert!(matches!(
            workflow.state(),
            UploadState::Failed {
                reason: FailureReason::NoImage,
                ..
            }
        ));
        assert!(fx.blobs.puts().is_empty());
        assert!(fx.docs.inserts().is_empty());
    }

    #[test]
    fn direct_upload_failure_skips_record() {
        let fx = Fixture {
            blobs: RecordingBlobStore::failing_put(),
            ..Fixture::new()
        };
        let workflow = fx.workflow();

        let outcome = workflow.share_direct(&direct_post(&["a.webp", "b.webp"]), &session());

        assert!(!outcome.ok);
        assert!(matches!(
            workflow.state(),
            UploadState::Failed {
                reason: FailureReason::Storage,
                ..
            }
        ));
        assert!(fx.docs.inserts().is_empty());
    }

    #[test]
    fn direct_record_failure_keeps_blobs() {
        let fx = Fixture {
            docs: RecordingDocumentStore::failing(),
            ..Fixture::new()
        };
        let workflow = fx.workflow();

        workflow.share_direct(&direct_post(&["a.webp", "b.webp"]), &session());

        assert!(matches!(
            workflow.state(),
            UploadState::Failed {
                reason: FailureReason::Persistence,
                ..
            }
        ));
        assert_eq!(fx.blobs.puts().len(), 2);
    }

    #[test]
    fn direct_share_respects_cancel_and_busy() {
        let fx = Fixture::new();
        let workflow = fx.workflow();
        let post = direct_post(&["a.webp"]);
        post.cancellation().cancel();

        workflow.share_direct(&post, &session());
        assert!(matches!(
            workflow.state(),
            UploadState::Failed {
                reason: FailureReason::Cancelled,
                ..
            }
        ));

        *workflow.lock() = UploadState::WritingRecord;
        let outcome = workflow.share_direct(&direct_post(&["b.webp"]), &session());
        assert!(!outcome.ok);
        assert_eq!(workflow.state(), UploadState::WritingRecord);
        assert!(fx.blobs.puts().is_empty());
    }
}
