//! Integration tests for the external store engine
//!
//! The "remote" in these tests is a [`FolderClient`] over a temp directory,
//! which exercises the same chunked read/write contract as the share
//! backend. Failure injection uses a wrapper client that can be armed to
//! fail specific writes.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::oneshot;
use uuid::Uuid;

use recipesync_core::domain::{
    AccessStatus, Comparison, DeviceIdentity, EngineError, RemoteDescriptor, DB_MANIFEST,
    LOCK_FILE, MARKER_FILE,
};
use recipesync_core::ports::{ChunkSource, ProgressFn, RemoteFileClient, RemoteStat};
use recipesync_engine::{Command, Direction, Facade, FacadeConfig, LocalStore};
use recipesync_remote::FolderClient;

// ============================================================================
// Test helpers
// ============================================================================

fn facade_over(
    client: Arc<dyn RemoteFileClient>,
    remote_root: &Path,
    local_root: &Path,
    device_name: &str,
) -> Facade {
    Facade::new(FacadeConfig {
        backend: "cloud",
        client,
        descriptor: RemoteDescriptor::cloud_folder(remote_root.to_string_lossy()),
        identity: DeviceIdentity::new(device_name),
        local: LocalStore::new(local_root),
        status: Arc::new(RwLock::new(AccessStatus::default())),
        events: None,
        discovery: None,
        connect_timeout: None,
    })
}

fn facade_for(remote_root: &Path, local_root: &Path, device_name: &str) -> Facade {
    facade_over(
        Arc::new(FolderClient::new()),
        remote_root,
        local_root,
        device_name,
    )
}

/// Seeds a local replica with a database bundle (no marker)
fn seed_local_bundle(local_root: &Path, fill: u8) {
    // Larger than one chunk so chunking is actually exercised.
    std::fs::write(local_root.join("recipes.sqlite"), vec![fill; 70_000]).unwrap();
    std::fs::write(local_root.join("recipes.sqlite-shm"), vec![fill; 64]).unwrap();
    std::fs::write(local_root.join("recipes.sqlite-wal"), vec![fill; 256]).unwrap();
}

/// Client wrapper that fails writes to one path while armed
struct FlakyClient {
    inner: FolderClient,
    fail_writes_to: String,
    armed: AtomicBool,
}

impl FlakyClient {
    fn new(fail_writes_to: &str) -> Self {
        Self {
            inner: FolderClient::new(),
            fail_writes_to: fail_writes_to.to_string(),
            armed: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl RemoteFileClient for FlakyClient {
    async fn connect(&self, descriptor: &RemoteDescriptor) -> anyhow::Result<()> {
        self.inner.connect(descriptor).await
    }
    async fn disconnect(&self) -> anyhow::Result<()> {
        self.inner.disconnect().await
    }
    async fn list_shares(&self) -> anyhow::Result<Vec<String>> {
        self.inner.list_shares().await
    }
    async fn open_share(&self, name: &str) -> anyhow::Result<()> {
        self.inner.open_share(name).await
    }
    async fn close_share(&self) -> anyhow::Result<()> {
        self.inner.close_share().await
    }
    async fn stat(&self, path: &str) -> anyhow::Result<RemoteStat> {
        self.inner.stat(path).await
    }
    async fn read_file(&self, path: &str, progress: Option<ProgressFn>) -> anyhow::Result<Vec<u8>> {
        self.inner.read_file(path, progress).await
    }
    async fn write_file(
        &self,
        path: &str,
        source: Box<dyn ChunkSource + Send>,
    ) -> anyhow::Result<()> {
        if self.armed.load(Ordering::SeqCst) && path == self.fail_writes_to {
            anyhow::bail!("injected write failure for {path}");
        }
        self.inner.write_file(path, source).await
    }
    async fn delete_file(&self, path: &str) -> anyhow::Result<()> {
        self.inner.delete_file(path).await
    }
    async fn create_directory(&self, path: &str) -> anyhow::Result<()> {
        self.inner.create_directory(path).await
    }
    async fn list_directory(&self, path: &str) -> anyhow::Result<Vec<String>> {
        self.inner.list_directory(path).await
    }
}

// ============================================================================
// FIFO serialization
// ============================================================================

#[tokio::test]
async fn commands_complete_in_enqueue_order() {
    let remote = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    let facade = Arc::new(facade_for(remote.path(), local.path(), "tablet"));

    facade.start_session().await.unwrap();

    // Ten writes to the same image name: if dispatch ever reordered or
    // overlapped, the final content would not be the last enqueued value.
    for i in 0u8..10 {
        facade
            .save_image_data("contended.jpg", vec![i; 128])
            .await
            .unwrap();
    }
    let data = facade.fetch_image("contended.jpg").await.unwrap();
    assert_eq!(data, vec![9u8; 128]);

    // Concurrent enqueuers: every completion resolves.
    let mut tasks = Vec::new();
    for i in 0..8 {
        let facade = facade.clone();
        tasks.push(tokio::spawn(async move {
            facade
                .save_image_data(format!("img-{i}.jpg"), vec![i as u8; 64])
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let names = facade.fetch_image_names().await.unwrap();
    assert_eq!(names.len(), 9);
}

// ============================================================================
// Transparent session re-establishment
// ============================================================================

#[tokio::test]
async fn stalled_command_establishes_session_once() {
    let remote = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    let facade = facade_for(remote.path(), local.path(), "tablet");

    // No explicit start_session: the lock command stalls, the facade
    // re-establishes, and the command then succeeds.
    let status = facade.lock().await.unwrap();
    assert!(status.locked && status.by_me);
}

#[tokio::test]
async fn failed_reestablishment_fails_only_that_command() {
    let local = tempfile::tempdir().unwrap();
    let facade = facade_for(Path::new("/nonexistent/remote"), local.path(), "tablet");

    // Session start fails; the stalled command reports the failure.
    let err = facade.lock().await.unwrap_err();
    assert!(matches!(err, EngineError::Connection(_)));

    // The queue keeps advancing: the next command also completes (with
    // its own failure, since the remote still doesn't exist).
    assert!(facade.fetch_image_names().await.is_err());
}

// ============================================================================
// Lock protocol
// ============================================================================

#[tokio::test]
async fn lock_is_idempotent_for_the_same_identity() {
    let remote = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    let facade = facade_for(remote.path(), local.path(), "tablet");

    facade.start_session().await.unwrap();
    let first = facade.lock().await.unwrap();
    assert!(first.by_me);
    let artifact = std::fs::read(remote.path().join(LOCK_FILE)).unwrap();

    // Re-acquire: still ours, artifact byte-identical.
    let second = facade.lock().await.unwrap();
    assert!(second.by_me);
    assert_eq!(std::fs::read(remote.path().join(LOCK_FILE)).unwrap(), artifact);
}

#[tokio::test]
async fn foreign_lock_is_reported_and_left_alone() {
    let remote = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();

    let foreign = format!("other-device,{}", Uuid::new_v4());
    std::fs::write(remote.path().join(LOCK_FILE), &foreign).unwrap();

    let facade = facade_for(remote.path(), local.path(), "tablet");
    facade.start_session().await.unwrap();
    let status = facade.lock().await.unwrap();
    assert!(status.locked);
    assert!(!status.by_me);
    assert_eq!(status.owner_name, "other-device");

    let on_disk = std::fs::read_to_string(remote.path().join(LOCK_FILE)).unwrap();
    assert_eq!(on_disk, foreign);
}

#[tokio::test]
async fn name_collision_is_not_ownership() {
    let remote = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();

    // Same name as ours but a different device id.
    std::fs::write(
        remote.path().join(LOCK_FILE),
        format!("tablet,{}", Uuid::new_v4()),
    )
    .unwrap();

    let facade = facade_for(remote.path(), local.path(), "tablet");
    facade.start_session().await.unwrap();
    let status = facade.lock().await.unwrap();
    assert!(status.locked && !status.by_me);
}

#[tokio::test]
async fn empty_lock_artifact_self_heals() {
    let remote = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    std::fs::write(remote.path().join(LOCK_FILE), "").unwrap();

    let facade = facade_for(remote.path(), local.path(), "tablet");
    facade.start_session().await.unwrap();
    let status = facade.lock().await.unwrap();
    assert!(status.by_me);

    let content = std::fs::read_to_string(remote.path().join(LOCK_FILE)).unwrap();
    assert!(content.starts_with("tablet,"));
}

#[tokio::test]
async fn malformed_lock_artifact_is_untouched() {
    let remote = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    std::fs::write(remote.path().join(LOCK_FILE), "one,two,three").unwrap();

    let facade = facade_for(remote.path(), local.path(), "tablet");
    facade.start_session().await.unwrap();
    let status = facade.lock().await.unwrap();
    assert!(status.locked && !status.by_me);
    assert_eq!(
        std::fs::read_to_string(remote.path().join(LOCK_FILE)).unwrap(),
        "one,two,three"
    );
}

#[tokio::test]
async fn unlock_tolerates_absent_artifact() {
    let remote = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    let facade = facade_for(remote.path(), local.path(), "tablet");

    facade.start_session().await.unwrap();
    let status = facade.unlock().await.unwrap();
    assert!(!status.locked && !status.by_me);
}

// ============================================================================
// Conflict ordering
// ============================================================================

#[tokio::test]
async fn comparison_outcomes() {
    let remote = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    let facade = facade_for(remote.path(), local.path(), "tablet");
    facade.start_session().await.unwrap();

    // Local marker missing: degraded outcome even though the remote marker
    // is perfectly readable, and the name degrades with it.
    std::fs::write(
        remote.path().join(MARKER_FILE),
        "2026-05-01 10:00:00,old-nas",
    )
    .unwrap();
    let outcome = facade.compare_last_updated().await.unwrap();
    assert_eq!(outcome.comparison, Comparison::RemoteMarkerMissing);
    assert_eq!(outcome.last_updated_by, "unknown");
    std::fs::remove_file(remote.path().join(MARKER_FILE)).unwrap();

    // Remote marker missing entirely.
    std::fs::write(
        local.path().join(MARKER_FILE),
        "2026-05-01 10:00:00,tablet",
    )
    .unwrap();
    let outcome = facade.compare_last_updated().await.unwrap();
    assert_eq!(outcome.comparison, Comparison::RemoteMarkerMissing);
    assert_eq!(outcome.last_updated_by, "unknown");

    // Remote strictly older: the device is newer.
    std::fs::write(
        remote.path().join(MARKER_FILE),
        "2026-05-01 09:59:59,old-nas",
    )
    .unwrap();
    let outcome = facade.compare_last_updated().await.unwrap();
    assert_eq!(outcome.comparison, Comparison::DeviceNewer);
    assert_eq!(outcome.last_updated_by, "old-nas");

    // Equal to the second.
    std::fs::write(
        remote.path().join(MARKER_FILE),
        "2026-05-01 10:00:00,old-nas",
    )
    .unwrap();
    let outcome = facade.compare_last_updated().await.unwrap();
    assert_eq!(outcome.comparison, Comparison::Equal);

    // Remote strictly newer.
    std::fs::write(
        remote.path().join(MARKER_FILE),
        "2026-05-01 10:00:01,new-nas",
    )
    .unwrap();
    let outcome = facade.compare_last_updated().await.unwrap();
    assert_eq!(outcome.comparison, Comparison::RemoteNewer);

    // Unparseable remote marker degrades to missing + unknown.
    std::fs::write(remote.path().join(MARKER_FILE), "not a marker").unwrap();
    let outcome = facade.compare_last_updated().await.unwrap();
    assert_eq!(outcome.comparison, Comparison::RemoteMarkerMissing);
    assert_eq!(outcome.last_updated_by, "unknown");
}

// ============================================================================
// Push / pull safety
// ============================================================================

#[tokio::test]
async fn push_requires_owned_lock() {
    let remote = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    seed_local_bundle(local.path(), 1);

    let facade = facade_for(remote.path(), local.path(), "tablet");
    facade.start_session().await.unwrap();

    let err = facade.copy_database(Direction::Push).await.unwrap_err();
    assert!(matches!(err, EngineError::LockRequired));
    // Nothing was written.
    assert!(!remote.path().join("recipes.sqlite").exists());
}

#[tokio::test]
async fn marker_last_push_round_trip() {
    let remote = tempfile::tempdir().unwrap();
    let local_a = tempfile::tempdir().unwrap();
    let local_b = tempfile::tempdir().unwrap();
    seed_local_bundle(local_a.path(), 7);

    // Device A pushes.
    let a = facade_for(remote.path(), local_a.path(), "device-a");
    a.start_session().await.unwrap();
    assert!(a.lock().await.unwrap().by_me);
    a.copy_database(Direction::Push).await.unwrap();
    a.unlock().await.unwrap();
    a.end_session().await.unwrap();

    let pushed_marker = std::fs::read(remote.path().join(MARKER_FILE)).unwrap();
    let marker_text = String::from_utf8(pushed_marker.clone()).unwrap();
    assert!(marker_text.ends_with(",device-a"));

    // Device B, holding an older local marker, pulls.
    std::fs::write(
        local_b.path().join(MARKER_FILE),
        "2020-01-01 00:00:00,device-b",
    )
    .unwrap();
    let b = facade_for(remote.path(), local_b.path(), "device-b");
    b.start_session().await.unwrap();
    assert!(b.lock().await.unwrap().by_me);

    let outcome = b.compare_last_updated().await.unwrap();
    assert_eq!(outcome.comparison, Comparison::RemoteNewer);
    assert_eq!(outcome.last_updated_by, "device-a");

    b.check_database_files().await.unwrap();
    b.copy_database(Direction::Pull).await.unwrap();

    // Byte-identical manifest, marker content exactly as pushed.
    for name in DB_MANIFEST {
        assert_eq!(
            std::fs::read(local_b.path().join(name)).unwrap(),
            std::fs::read(remote.path().join(name)).unwrap(),
            "mismatch in {name}"
        );
    }
    assert_eq!(
        std::fs::read(local_b.path().join(MARKER_FILE)).unwrap(),
        pushed_marker
    );
    assert_eq!(
        std::fs::read(local_b.path().join("recipes.sqlite")).unwrap(),
        vec![7u8; 70_000]
    );
}

#[tokio::test]
async fn interrupted_push_never_looks_complete() {
    let remote = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    seed_local_bundle(local.path(), 3);

    let client = Arc::new(FlakyClient::new(MARKER_FILE));
    let facade = facade_over(client, remote.path(), local.path(), "device-a");
    facade.start_session().await.unwrap();
    assert!(facade.lock().await.unwrap().by_me);

    // Push fails at the very last step: the remote marker write.
    assert!(facade.copy_database(Direction::Push).await.is_err());
    assert!(remote.path().join("recipes.sqlite").exists());
    assert!(!remote.path().join(MARKER_FILE).exists());

    // A second instance comparing against this remote never sees it as
    // authoritative.
    let local_b = tempfile::tempdir().unwrap();
    std::fs::write(
        local_b.path().join(MARKER_FILE),
        "2020-01-01 00:00:00,device-b",
    )
    .unwrap();
    let b = facade_for(remote.path(), local_b.path(), "device-b");
    b.start_session().await.unwrap();
    let outcome = b.compare_last_updated().await.unwrap();
    assert_eq!(outcome.comparison, Comparison::RemoteMarkerMissing);

    // And the manifest pre-flight refuses a pull outright.
    let err = b.check_database_files().await.unwrap_err();
    match err {
        EngineError::RemoteFileMissing { missing } => {
            assert!(missing.contains(&MARKER_FILE.to_string()));
        }
        other => panic!("expected RemoteFileMissing, got {other}"),
    }
}

#[tokio::test]
async fn refused_partial_pull_writes_nothing() {
    let remote = tempfile::tempdir().unwrap();
    let local_a = tempfile::tempdir().unwrap();
    seed_local_bundle(local_a.path(), 5);

    let a = facade_for(remote.path(), local_a.path(), "device-a");
    a.start_session().await.unwrap();
    a.lock().await.unwrap();
    a.copy_database(Direction::Push).await.unwrap();

    // Break the remote bundle.
    std::fs::remove_file(remote.path().join("recipes.sqlite-wal")).unwrap();

    let local_b = tempfile::tempdir().unwrap();
    let b = facade_for(remote.path(), local_b.path(), "device-b");
    b.start_session().await.unwrap();

    let err = b.copy_database(Direction::Pull).await.unwrap_err();
    match err {
        EngineError::RemoteFileMissing { missing } => {
            assert_eq!(missing, vec!["recipes.sqlite-wal".to_string()]);
        }
        other => panic!("expected RemoteFileMissing, got {other}"),
    }

    // No write to the local manifest happened.
    for name in DB_MANIFEST {
        assert!(!local_b.path().join(name).exists(), "{name} was written");
    }
}

// ============================================================================
// Images
// ============================================================================

#[tokio::test]
async fn image_operations_round_trip() {
    let remote = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    let facade = facade_for(remote.path(), local.path(), "tablet");
    facade.start_session().await.unwrap();

    facade
        .save_image_data("tart.jpg", b"jpeg-bytes".to_vec())
        .await
        .unwrap();
    assert_eq!(
        facade.fetch_image("tart.jpg").await.unwrap(),
        b"jpeg-bytes".to_vec()
    );
    assert_eq!(facade.fetch_image_names().await.unwrap(), vec!["tart.jpg"]);

    facade.delete_image("tart.jpg").await.unwrap();
    assert!(facade.fetch_image_names().await.unwrap().is_empty());
}

#[tokio::test]
async fn copy_all_images_replaces_target_set() {
    let remote = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    let facade = facade_for(remote.path(), local.path(), "tablet");
    facade.start_session().await.unwrap();

    // Stale remote image that local no longer has.
    facade
        .save_image_data("stale.jpg", b"old".to_vec())
        .await
        .unwrap();

    std::fs::create_dir_all(local.path().join("pictures")).unwrap();
    std::fs::write(local.path().join("pictures/a.jpg"), b"a").unwrap();
    std::fs::write(local.path().join("pictures/b.png"), b"b").unwrap();

    let copied = facade.copy_all_images(Direction::Push).await.unwrap();
    assert_eq!(copied, 2);
    assert_eq!(
        facade.fetch_image_names().await.unwrap(),
        vec!["a.jpg", "b.png"]
    );
}

#[tokio::test]
async fn sync_images_copies_only_missing() {
    let remote = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    let facade = facade_for(remote.path(), local.path(), "tablet");
    facade.start_session().await.unwrap();

    facade
        .save_image_data("shared.jpg", b"remote-copy".to_vec())
        .await
        .unwrap();
    std::fs::create_dir_all(local.path().join("pictures")).unwrap();
    std::fs::write(local.path().join("pictures/shared.jpg"), b"local-copy").unwrap();
    std::fs::write(local.path().join("pictures/only-local.jpg"), b"x").unwrap();

    let pushed = facade.sync_images(Direction::Push).await.unwrap();
    assert_eq!(pushed, 1);
    // The shared image was NOT overwritten.
    assert_eq!(
        facade.fetch_image("shared.jpg").await.unwrap(),
        b"remote-copy".to_vec()
    );
}

// ============================================================================
// Queue discard
// ============================================================================

#[tokio::test]
async fn empty_queue_cancels_pending_commands() {
    let remote = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    let facade = facade_for(remote.path(), local.path(), "tablet");
    facade.start_session().await.unwrap();

    // Enqueue without yielding: on the single-threaded test runtime the
    // worker cannot run until we next await, so every command is still
    // queued when the discard happens.
    let mut pending = Vec::new();
    for i in 0..5 {
        let (reply, rx) = oneshot::channel();
        facade.enqueue(Command::SaveImage {
            name: format!("p{i}.jpg"),
            data: vec![0; 8],
            reply,
        });
        pending.push(rx);
    }
    facade.empty_queue();

    for rx in pending {
        assert!(matches!(rx.await, Ok(Err(EngineError::Cancelled))));
    }

    // The queue keeps serving new commands afterwards.
    assert!(facade.fetch_image_names().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn queue_discard_races_never_wedge_the_worker() {
    let remote = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    let facade = Arc::new(facade_for(remote.path(), local.path(), "tablet"));
    facade.start_session().await.unwrap();

    // Hammer the window between the worker's head inspection and its pop:
    // a discard landing there must leave the worker running, not panicking
    // with the queue mutex held.
    for round in 0..200 {
        let mut tasks = Vec::new();
        for i in 0..4 {
            let facade = facade.clone();
            tasks.push(tokio::spawn(async move {
                let _ = facade
                    .save_image_data(format!("r{round}-{i}.jpg"), vec![0; 16])
                    .await;
            }));
        }
        facade.empty_queue();
        for task in tasks {
            task.await.unwrap();
        }
    }

    // Worker and queue are still alive.
    facade
        .save_image_data("after-the-storm.jpg", vec![1; 16])
        .await
        .unwrap();
}

// ============================================================================
// End-to-end scenario
// ============================================================================

#[tokio::test]
async fn two_device_round_trip() {
    let remote = tempfile::tempdir().unwrap();
    let local_a = tempfile::tempdir().unwrap();
    let local_b = tempfile::tempdir().unwrap();

    seed_local_bundle(local_a.path(), 9);
    std::fs::create_dir_all(local_a.path().join("pictures")).unwrap();
    std::fs::write(local_a.path().join("pictures/tart.jpg"), b"tart").unwrap();

    // Device A: lock (no prior owner), push database + images, unlock, end.
    let a = facade_for(remote.path(), local_a.path(), "device-a");
    a.start_session().await.unwrap();
    assert!(a.lock().await.unwrap().by_me);
    a.copy_database(Direction::Push).await.unwrap();
    a.copy_all_images(Direction::Push).await.unwrap();
    a.unlock().await.unwrap();
    a.end_session().await.unwrap();

    let marker_a = std::fs::read(remote.path().join(MARKER_FILE)).unwrap();

    // Device B: session, lock (absent => owner), compare => remote newer,
    // pre-check passes, pull applies everything.
    std::fs::write(
        local_b.path().join(MARKER_FILE),
        "2019-06-01 12:00:00,device-b",
    )
    .unwrap();
    let b = facade_for(remote.path(), local_b.path(), "device-b");
    b.start_session().await.unwrap();
    assert!(b.lock().await.unwrap().by_me);
    assert_eq!(
        b.compare_last_updated().await.unwrap().comparison,
        Comparison::RemoteNewer
    );
    b.check_database_files().await.unwrap();
    b.copy_database(Direction::Pull).await.unwrap();
    b.copy_all_images(Direction::Pull).await.unwrap();
    b.unlock().await.unwrap();
    b.end_session().await.unwrap();

    assert_eq!(
        std::fs::read(local_b.path().join(MARKER_FILE)).unwrap(),
        marker_a
    );
    assert_eq!(
        std::fs::read(local_b.path().join("recipes.sqlite")).unwrap(),
        vec![9u8; 70_000]
    );
    assert_eq!(
        std::fs::read(local_b.path().join("pictures/tart.jpg")).unwrap(),
        b"tart"
    );
}
