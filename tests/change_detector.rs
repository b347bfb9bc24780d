use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tz_gin::engine::{rebuild_channel, RebuildReceiver, RebuildRequest};
use tz_gin::errors::SupervisorError;
use tz_gin::fs::mock::MockFileSystem;
use tz_gin::fs::{FileSystem, RealFileSystem};
use tz_gin::watch::{
    classify, compute_file_hash, ChangeDetector, ChangeEvent, ChangeKind, ChangeProcessor,
    RawEventSender, Verdict, WatchSet,
};
use tz_gin_test_utils::builders::ConfigFileBuilder;
use tz_gin_test_utils::events::{
    access_event, chmod_event, create_event, moved_in_event, remove_event, rename_event,
    watch_error, write_event,
};
use tz_gin_test_utils::{init_tracing, with_timeout};

const ROOT: &str = "/proj";

fn project_watch_set() -> WatchSet {
    WatchSet::new(
        ROOT,
        &[PathBuf::from("controller"), PathBuf::from("router")],
        &[
            PathBuf::from("log"),
            PathBuf::from(".git"),
            PathBuf::from("docs"),
            PathBuf::from("tmp"),
        ],
        &["**/*.swp".to_string()],
    )
    .unwrap()
}

fn src(rel: &str) -> PathBuf {
    Path::new(ROOT).join(rel)
}

fn write(rel: &str) -> ChangeEvent {
    ChangeEvent::new(src(rel), ChangeKind::Write)
}

#[test]
fn watch_set_lists_root_first_then_subdirs_once() {
    let ws = WatchSet::new(
        ROOT,
        &[
            PathBuf::from("controller"),
            PathBuf::from("router"),
            PathBuf::from("controller"),
        ],
        &[],
        &[],
    )
    .unwrap();

    assert_eq!(
        ws.dirs().to_vec(),
        vec![PathBuf::from(ROOT), src("controller"), src("router")]
    );
}

#[test]
fn ignore_prefixes_match_whole_components() {
    let ws = project_watch_set();

    assert!(ws.is_ignored(&src("tmp/main")));
    assert!(ws.is_ignored(&src(".git/index")));
    assert!(ws.is_ignored(&src("log/app.log")));
    assert!(ws.is_ignored(&src("docs")));

    assert!(!ws.is_ignored(&src("tmpl/index.go")));
    assert!(!ws.is_ignored(&src("logger.go")));
    assert!(!ws.is_ignored(&src("controller/user.go")));
}

#[test]
fn exclude_globs_and_foreign_paths_are_ignored() {
    let ws = project_watch_set();

    assert!(ws.is_ignored(&src("controller/.user.go.swp")));
    assert!(ws.is_ignored(Path::new("/somewhere/else/main.go")));
}

#[test]
fn output_dir_is_always_ignored() {
    let cfg = ConfigFileBuilder::new()
        .with_ignore(&["log"])
        .with_output_dir("build/bin")
        .build();
    let ws = WatchSet::from_settings(ROOT, cfg.run()).unwrap();

    assert!(ws.ignore_prefixes().contains(&PathBuf::from("build/bin")));
    assert!(ws.is_ignored(&src("build/bin/main")));
    assert!(!ws.is_ignored(&src("build/version.go")));
}

#[test]
fn output_dir_not_duplicated_when_already_covered() {
    let cfg = ConfigFileBuilder::new().with_ignore(&["tmp"]).build();
    let ws = WatchSet::from_settings(ROOT, cfg.run()).unwrap();

    assert_eq!(ws.ignore_prefixes().to_vec(), vec![PathBuf::from("tmp")]);
}

#[test]
fn only_content_changes_are_significant() {
    let ws = project_watch_set();
    let path = src("controller/user.go");

    assert_eq!(classify(&ws, &write("controller/user.go")), Verdict::Significant);
    assert_eq!(
        classify(&ws, &ChangeEvent::new(&path, ChangeKind::MovedIn)),
        Verdict::Significant
    );
    for kind in [ChangeKind::Create, ChangeKind::Remove, ChangeKind::Other] {
        let event = ChangeEvent::new(&path, kind);
        assert_eq!(classify(&ws, &event), Verdict::NotAWrite, "{kind:?}");
    }

    assert_eq!(classify(&ws, &write("tmp/main")), Verdict::Ignored);
}

#[test]
fn notify_kinds_map_to_change_kinds() {
    let path = src("router/router.go");
    let kinds: Vec<ChangeKind> = [
        write_event(&path),
        chmod_event(&path),
        create_event(&path),
        remove_event(&path),
        access_event(&path),
    ]
    .into_iter()
    .flat_map(|e| ChangeEvent::from_notify(e.unwrap()))
    .map(|c| c.kind)
    .collect();

    assert_eq!(
        kinds,
        vec![
            ChangeKind::Write,
            ChangeKind::Other,
            ChangeKind::Create,
            ChangeKind::Remove,
            ChangeKind::Other,
        ]
    );
}

#[test]
fn renames_mark_only_the_destination() {
    let from = src("controller/user.go.tmp");
    let to = src("controller/user.go");

    let paired: Vec<(PathBuf, ChangeKind)> = ChangeEvent::from_notify(rename_event(&from, &to).unwrap())
        .into_iter()
        .map(|c| (c.path, c.kind))
        .collect();
    assert_eq!(
        paired,
        vec![(from, ChangeKind::Other), (to.clone(), ChangeKind::MovedIn)]
    );

    let moved: Vec<ChangeKind> = ChangeEvent::from_notify(moved_in_event(&to).unwrap())
        .into_iter()
        .map(|c| c.kind)
        .collect();
    assert_eq!(moved, vec![ChangeKind::MovedIn]);
}

#[test]
fn rename_over_a_file_is_gated_by_content() {
    let fs = MockFileSystem::new();
    let path = src("controller/user.go");
    fs.add_file(&path, "package controller\n");
    let mut processor = ChangeProcessor::new(Arc::new(project_watch_set()), Arc::new(fs.clone()));
    let moved_in = ChangeEvent::new(&path, ChangeKind::MovedIn);

    assert_eq!(processor.handle(&write("controller/user.go")), Verdict::Changed);
    // Same bytes saved atomically.
    assert_eq!(processor.handle(&moved_in), Verdict::Unchanged);

    fs.add_file(&path, "package controller\n\nfunc Get() {}\n");
    assert_eq!(processor.handle(&moved_in), Verdict::Changed);
}

#[test]
fn identical_content_is_suppressed() {
    let fs = MockFileSystem::new();
    let path = src("controller/user.go");
    fs.add_file(&path, "package controller\n");

    let mut processor = ChangeProcessor::new(Arc::new(project_watch_set()), Arc::new(fs.clone()));

    assert_eq!(processor.handle(&write("controller/user.go")), Verdict::Changed);
    assert_eq!(processor.handle(&write("controller/user.go")), Verdict::Unchanged);
    assert_eq!(processor.handle(&write("controller/user.go")), Verdict::Unchanged);

    fs.add_file(&path, "package controller\n\nfunc List() {}\n");
    assert_eq!(processor.handle(&write("controller/user.go")), Verdict::Changed);
    assert_eq!(processor.cache().len(), 1);
}

#[test]
fn unreadable_file_is_skipped_without_poisoning_the_cache() {
    let fs = MockFileSystem::new();
    let path = src("model/user.go");
    fs.lock_file(&path);

    let mut processor = ChangeProcessor::new(Arc::new(project_watch_set()), Arc::new(fs.clone()));

    assert_eq!(processor.handle(&write("model/user.go")), Verdict::Unreadable);
    assert!(processor.cache().is_empty());

    fs.add_file(&path, "package model\n");
    assert_eq!(processor.handle(&write("model/user.go")), Verdict::Changed);
}

#[test]
fn file_gone_before_hashing_keeps_last_fingerprint() {
    let fs = MockFileSystem::new();
    let path = src("router/router.go");
    fs.add_file(&path, "package router\n");
    let mut processor = ChangeProcessor::new(Arc::new(project_watch_set()), Arc::new(fs.clone()));

    assert_eq!(processor.handle(&write("router/router.go")), Verdict::Changed);

    fs.remove(&path);
    assert_eq!(processor.handle(&write("router/router.go")), Verdict::Unreadable);
    assert_eq!(processor.cache().len(), 1);

    // Restored with the same bytes: nothing to rebuild.
    fs.add_file(&path, "package router\n");
    assert_eq!(processor.handle(&write("router/router.go")), Verdict::Unchanged);
}

#[test]
fn ignored_paths_are_never_hashed() {
    let fs = MockFileSystem::new();
    fs.add_file(src("tmp/main"), vec![0u8; 64]);

    let mut processor = ChangeProcessor::new(Arc::new(project_watch_set()), Arc::new(fs));

    assert_eq!(processor.handle(&write("tmp/main")), Verdict::Ignored);
    assert!(processor.cache().is_empty());
}

#[test]
fn mock_fs_hashing() {
    let fs = MockFileSystem::new();
    fs.add_file("test.txt", b"hello world".to_vec());

    let hash = compute_file_hash(&fs, Path::new("test.txt")).unwrap();
    // blake3 hash of "hello world"
    assert_eq!(
        hash.to_hex().as_str(),
        "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
    );
}

#[test]
fn real_fs_hashing_matches_mock() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.go");
    std::fs::write(&path, b"hello world").unwrap();

    let real = compute_file_hash(&RealFileSystem, &path).unwrap();
    let mock_fs = MockFileSystem::new();
    mock_fs.add_file(&path, b"hello world".to_vec());
    let mock = compute_file_hash(&mock_fs, &path).unwrap();

    assert_eq!(real, mock);
    assert!(compute_file_hash(&RealFileSystem, &dir.path().join("missing.go")).is_err());
}

struct DetectorHarness {
    fs: MockFileSystem,
    raw_tx: RawEventSender,
    requests: RebuildReceiver,
    token: CancellationToken,
    handle: tokio::task::JoinHandle<tz_gin::errors::Result<()>>,
}

fn start_detector() -> DetectorHarness {
    init_tracing();
    let fs = MockFileSystem::new();
    let (raw_tx, raw_rx) = mpsc::unbounded_channel();
    let detector = ChangeDetector::from_receiver(
        Arc::new(project_watch_set()),
        Arc::new(fs.clone()),
        Duration::ZERO,
        raw_rx,
    );
    let (trigger, requests) = rebuild_channel();
    let token = CancellationToken::new();
    let handle = tokio::spawn(detector.run(trigger, token.clone()));

    DetectorHarness {
        fs,
        raw_tx,
        requests,
        token,
        handle,
    }
}

async fn assert_quiet(requests: &RebuildReceiver) {
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!requests.is_pending(), "unexpected rebuild request");
}

#[tokio::test]
async fn detector_emits_file_changed_for_new_content() {
    let mut h = start_detector();
    let path = src("controller/user.go");
    h.fs.add_file(&path, "v1");

    h.raw_tx.send(write_event(&path)).unwrap();
    let req = with_timeout(h.requests.recv()).await;
    assert_eq!(req, Some(RebuildRequest::FileChanged));

    // Same bytes again, plus noise that must be filtered.
    h.raw_tx.send(write_event(&path)).unwrap();
    h.raw_tx.send(chmod_event(&path)).unwrap();
    h.raw_tx.send(create_event(&src("controller/new.go"))).unwrap();
    h.raw_tx.send(write_event(&src("tmp/main"))).unwrap();
    h.raw_tx.send(write_event(&src("controller/.user.go.swp"))).unwrap();

    // Sentinel: once this is processed everything before it was too.
    let sentinel = src("router/router.go");
    h.fs.add_file(&sentinel, "package router\n");
    h.raw_tx.send(write_event(&sentinel)).unwrap();

    let req = with_timeout(h.requests.recv()).await;
    assert_eq!(req, Some(RebuildRequest::FileChanged));
    assert_quiet(&h.requests).await;

    h.token.cancel();
    with_timeout(h.handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn detector_survives_watch_errors_and_unreadable_files() {
    let mut h = start_detector();
    let locked = src("service/order.go");
    h.fs.lock_file(&locked);

    h.raw_tx.send(watch_error("inotify queue overflow")).unwrap();
    h.raw_tx.send(write_event(&locked)).unwrap();
    assert_quiet(&h.requests).await;

    let path = src("service/user.go");
    h.fs.add_file(&path, "package service\n");
    h.raw_tx.send(write_event(&path)).unwrap();

    let req = with_timeout(h.requests.recv()).await;
    assert_eq!(req, Some(RebuildRequest::FileChanged));
    assert!(!h.handle.is_finished());

    h.token.cancel();
    with_timeout(h.handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn detector_stops_when_event_source_closes() {
    let h = start_detector();
    drop(h.raw_tx);

    with_timeout(h.handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn detector_stops_on_cancellation_during_settle_delay() {
    init_tracing();
    let fs = MockFileSystem::new();
    let path = src("controller/user.go");
    fs.add_file(&path, "v1");

    let (raw_tx, raw_rx) = mpsc::unbounded_channel();
    let detector = ChangeDetector::from_receiver(
        Arc::new(project_watch_set()),
        Arc::new(fs),
        Duration::from_secs(30),
        raw_rx,
    );
    let (trigger, requests) = rebuild_channel();
    let token = CancellationToken::new();
    let handle = tokio::spawn(detector.run(trigger, token.clone()));

    raw_tx.send(write_event(&path)).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();

    with_timeout(handle).await.unwrap().unwrap();
    assert!(!requests.is_pending());
}

#[tokio::test]
async fn real_watch_triggers_on_write() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("controller")).unwrap();
    std::fs::create_dir(dir.path().join("tmp")).unwrap();

    let ws = WatchSet::new(
        dir.path(),
        &[PathBuf::from("controller")],
        &[PathBuf::from("tmp")],
        &[],
    )
    .unwrap();
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let detector =
        ChangeDetector::start(Arc::new(ws), fs, Duration::from_millis(20)).unwrap();

    let (trigger, mut requests) = rebuild_channel();
    let token = CancellationToken::new();
    let handle = tokio::spawn(detector.run(trigger, token.clone()));

    // Give the OS watch a moment to settle.
    tokio::time::sleep(Duration::from_millis(100)).await;
    std::fs::write(
        dir.path().join("controller").join("user.go"),
        "package controller\n",
    )
    .unwrap();

    let req = with_timeout(requests.recv()).await;
    assert_eq!(req, Some(RebuildRequest::FileChanged));

    token.cancel();
    with_timeout(handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn real_watch_triggers_on_atomic_save() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let controller = dir.path().join("controller");
    let scratch = dir.path().join("tmp");
    std::fs::create_dir(&controller).unwrap();
    std::fs::create_dir(&scratch).unwrap();
    std::fs::write(controller.join("user.go"), "package controller\n").unwrap();

    let ws = WatchSet::new(
        dir.path(),
        &[PathBuf::from("controller")],
        &[PathBuf::from("tmp")],
        &[],
    )
    .unwrap();
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let detector =
        ChangeDetector::start(Arc::new(ws), fs, Duration::from_millis(20)).unwrap();

    let (trigger, mut requests) = rebuild_channel();
    let token = CancellationToken::new();
    let handle = tokio::spawn(detector.run(trigger, token.clone()));

    tokio::time::sleep(Duration::from_millis(100)).await;
    let staged = scratch.join("user.go.tmp");
    std::fs::write(&staged, "package controller\n\nfunc List() {}\n").unwrap();
    std::fs::rename(&staged, controller.join("user.go")).unwrap();

    let req = with_timeout(requests.recv()).await;
    assert_eq!(req, Some(RebuildRequest::FileChanged));

    token.cancel();
    with_timeout(handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn missing_watch_directory_is_fatal() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let ws = WatchSet::new(dir.path(), &[PathBuf::from("middleware")], &[], &[]).unwrap();

    let err = ChangeDetector::start(Arc::new(ws), Arc::new(RealFileSystem), Duration::ZERO)
        .unwrap_err();

    match err {
        SupervisorError::WatchRegistration { path, .. } => {
            assert!(path.ends_with("middleware"), "{path:?}");
        }
        other => panic!("expected WatchRegistration, got {other:?}"),
    }
}
