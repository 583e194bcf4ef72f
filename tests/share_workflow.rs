//! End-to-end share tests against the real rasterizer and local stores.
//!
//! Each test gets its own temp directory holding a blob root and a document
//! root, so the files a share writes can be inspected directly.

use shutterpost::feed::recent_posts;
use shutterpost::imaging::{Adjustment, RustBackend};
use shutterpost::pending::{DirectPost, PendingPost, SourceImage};
use shutterpost::session::SessionSnapshot;
use shutterpost::store::{
    BlobHandle, BlobStore, DocumentReader, DocumentStore, JsonDocumentStore, LocalBlobStore,
    StoreError,
};
use shutterpost::upload::{FailureReason, UploadState, UploadWorkflow};
use std::io::Cursor;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use tempfile::TempDir;

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 120, 255])
    });
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn post_with_image(name: &str) -> PendingPost {
    let mut post = PendingPost::default();
    post.select_image(SourceImage::new(name, "image/png", png_bytes(48, 32)))
        .unwrap();
    post
}

fn session() -> SessionSnapshot {
    SessionSnapshot::signed_in("u1").with_nickname("Ana")
}

/// Every regular file under `dir`, recursively.
fn files_under(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return out;
    };
    for entry in entries {
        let path = entry.unwrap().path();
        if path.is_dir() {
            out.extend(files_under(&path));
        } else {
            out.push(path);
        }
    }
    out
}

struct Stores {
    tmp: TempDir,
    blobs: LocalBlobStore,
    documents: JsonDocumentStore,
}

impl Stores {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let blobs = LocalBlobStore::new(
            tmp.path().join("blobs"),
            Some("https://cdn.test".to_string()),
        );
        let documents = JsonDocumentStore::new(tmp.path().join("documents"));
        Self {
            tmp,
            blobs,
            documents,
        }
    }

    fn blob_files(&self) -> Vec<std::path::PathBuf> {
        files_under(&self.tmp.path().join("blobs"))
    }
}

// =========================================================================
// Happy path
// =========================================================================

#[test]
fn shared_post_appears_in_feed() {
    let stores = Stores::new();
    let workflow = UploadWorkflow::new(RustBackend::new(), &stores.blobs, &stores.documents)
        .with_clock(|| 1_700_000_000_000);

    let mut post = post_with_image("beach day.png");
    post.select_filter("clarendon");
    post.set_filter_strength(50.0);
    post.set_adjustment(Adjustment::Vignette, 40);
    post.set_caption("  first light ");

    let outcome = workflow.share(&post, &session());
    assert!(outcome.ok, "{outcome:?}");

    let blobs = stores.blob_files();
    assert_eq!(blobs.len(), 1);
    assert!(blobs[0].ends_with("posts/u1/1700000000000-beach-day.jpg"));
    let stored = std::fs::read(&blobs[0]).unwrap();
    assert_eq!(
        image::guess_format(&stored).unwrap(),
        image::ImageFormat::Jpeg
    );
    assert_eq!(
        image::load_from_memory(&stored).unwrap().to_rgb8().dimensions(),
        (48, 32)
    );

    let feed = recent_posts(&stores.documents, 20).unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(Some(feed[0].id.as_str()), outcome.post_id.as_deref());
    assert_eq!(feed[0].username, "Ana");
    assert_eq!(feed[0].caption, "first light");
    assert_eq!(
        feed[0].image_urls,
        vec!["https://cdn.test/posts/u1/1700000000000-beach-day.jpg"]
    );
    assert_eq!(feed[0].created_at, Some(1_700_000_000_000));
}

#[test]
fn feed_lists_newest_first() {
    let stores = Stores::new();
    let tick = AtomicUsize::new(1);
    let workflow = UploadWorkflow::new(RustBackend::new(), &stores.blobs, &stores.documents)
        .with_clock(move || 1_000 * tick.fetch_add(1, Ordering::SeqCst) as u64);

    for name in ["a.png", "b.png", "c.png"] {
        let mut post = post_with_image(name);
        post.set_caption(name);
        assert!(workflow.share(&post, &session()).ok);
    }

    let captions: Vec<String> = recent_posts(&stores.documents, 2)
        .unwrap()
        .into_iter()
        .map(|p| p.caption)
        .collect();
    assert_eq!(captions, vec!["c.png", "b.png"]);
}

// =========================================================================
// Direct upload of originals
// =========================================================================

#[test]
fn direct_post_stores_originals_under_one_record() {
    let stores = Stores::new();
    let workflow = UploadWorkflow::new(RustBackend::new(), &stores.blobs, &stores.documents)
        .with_clock(|| 1_700_000_000_000);
    let first = png_bytes(8, 8);
    let second = png_bytes(4, 6);
    let mut post = DirectPost::default();
    post.select_files(vec![
        SourceImage::new("one.png", "image/png", first.clone()),
        SourceImage::new("two.png", "image/png", second.clone()),
    ])
    .unwrap();
    post.set_caption("pair");

    let outcome = workflow.share_direct(&post, &session());
    assert!(outcome.ok, "{outcome:?}");

    let root = stores.tmp.path().join("blobs/posts/u1");
    assert_eq!(std::fs::read(root.join("1700000000000-one.png")).unwrap(), first);
    assert_eq!(std::fs::read(root.join("1700000000000-two.png")).unwrap(), second);
    assert_eq!(stores.blob_files().len(), 2);

    let feed = recent_posts(&stores.documents, 20).unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].caption, "pair");
    assert_eq!(
        feed[0].image_urls,
        vec![
            "https://cdn.test/posts/u1/1700000000000-one.png",
            "https://cdn.test/posts/u1/1700000000000-two.png",
        ]
    );
}

// =========================================================================
// Scenario C: no session
// =========================================================================

#[test]
fn anonymous_share_writes_nothing() {
    let stores = Stores::new();
    let workflow = UploadWorkflow::new(RustBackend::new(), &stores.blobs, &stores.documents);

    let outcome = workflow.share(&post_with_image("a.png"), &SessionSnapshot::anonymous());

    assert!(!outcome.ok);
    assert!(matches!(
        workflow.state(),
        UploadState::Failed {
            reason: FailureReason::NotAuthenticated,
            ..
        }
    ));
    assert!(stores.blob_files().is_empty());
    assert!(stores.documents.list("posts").unwrap().is_empty());
}

// =========================================================================
// Scenario D: record write fails after the blob write
// =========================================================================

struct RefusingDocumentStore {
    attempts: AtomicUsize,
}

impl DocumentStore for RefusingDocumentStore {
    fn insert(&self, _collection: &str, _record: serde_json::Value) -> Result<String, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Rejected("quota exceeded".into()))
    }
}

#[test]
fn record_failure_keeps_single_blob() {
    let stores = Stores::new();
    let documents = RefusingDocumentStore {
        attempts: AtomicUsize::new(0),
    };
    let workflow = UploadWorkflow::new(RustBackend::new(), &stores.blobs, &documents);

    let outcome = workflow.share(&post_with_image("a.png"), &session());

    assert!(!outcome.ok);
    assert!(outcome.message.unwrap().contains("quota exceeded"));
    assert!(matches!(
        workflow.state(),
        UploadState::Failed {
            reason: FailureReason::Persistence,
            ..
        }
    ));
    assert_eq!(stores.blob_files().len(), 1);
    assert_eq!(documents.attempts.load(Ordering::SeqCst), 1);
    assert!(stores.documents.list("posts").unwrap().is_empty());
}

#[test]
fn undecodable_image_fails_before_upload() {
    let stores = Stores::new();
    let workflow = UploadWorkflow::new(RustBackend::new(), &stores.blobs, &stores.documents);
    let mut post = PendingPost::default();
    post.select_image(SourceImage::new("x.png", "image/png", b"not a png".to_vec()))
        .unwrap();

    let outcome = workflow.share(&post, &session());

    assert!(!outcome.ok);
    assert!(matches!(
        workflow.state(),
        UploadState::Failed {
            reason: FailureReason::Rasterization,
            ..
        }
    ));
    assert!(stores.blob_files().is_empty());
}

// =========================================================================
// Concurrency: re-entry guard and cancellation
// =========================================================================

/// Blob store whose `put` signals entry and then waits to be released.
struct BlockingBlobStore {
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
    puts: AtomicUsize,
}

impl BlockingBlobStore {
    fn new() -> (Self, mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let store = Self {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
            puts: AtomicUsize::new(0),
        };
        (store, entered_rx, release_tx)
    }
}

impl BlobStore for BlockingBlobStore {
    fn put(&self, path: &str, _bytes: &[u8], _content_type: &str) -> Result<BlobHandle, StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.entered.lock().unwrap().send(()).unwrap();
        self.release.lock().unwrap().recv().unwrap();
        Ok(BlobHandle {
            path: path.to_string(),
        })
    }

    fn resolve_public_url(&self, handle: &BlobHandle) -> Result<String, StoreError> {
        Ok(format!("mem://{}", handle.path))
    }
}

#[test]
fn second_share_while_uploading_is_rejected() {
    let stores = Stores::new();
    let (blobs, entered, release) = BlockingBlobStore::new();
    let workflow = UploadWorkflow::new(RustBackend::new(), &blobs, &stores.documents);
    let post = post_with_image("a.png");
    let session = session();

    std::thread::scope(|s| {
        let first = s.spawn(|| workflow.share(&post, &session));

        entered.recv().unwrap();
        assert_eq!(workflow.state(), UploadState::UploadingImage);

        let second = workflow.share(&post, &session);
        assert!(!second.ok);
        assert_eq!(workflow.state(), UploadState::UploadingImage);

        release.send(()).unwrap();
        assert!(first.join().unwrap().ok);
    });

    assert_eq!(blobs.puts.load(Ordering::SeqCst), 1);
    assert_eq!(stores.documents.list("posts").unwrap().len(), 1);
}

#[test]
fn cancel_during_upload_skips_record() {
    let stores = Stores::new();
    let (blobs, entered, release) = BlockingBlobStore::new();
    let workflow = UploadWorkflow::new(RustBackend::new(), &blobs, &stores.documents);
    let post = post_with_image("a.png");
    let cancel = post.cancellation();
    let session = session();

    std::thread::scope(|s| {
        let run = s.spawn(|| workflow.share(&post, &session));

        entered.recv().unwrap();
        cancel.cancel();
        release.send(()).unwrap();

        assert!(!run.join().unwrap().ok);
    });

    // The in-flight put completed; nothing after it ran.
    assert_eq!(blobs.puts.load(Ordering::SeqCst), 1);
    assert!(matches!(
        workflow.state(),
        UploadState::Failed {
            reason: FailureReason::Cancelled,
            ..
        }
    ));
    assert!(stores.documents.list("posts").unwrap().is_empty());
}
