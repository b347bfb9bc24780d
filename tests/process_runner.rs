use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tz_gin::engine::BuildResult;
use tz_gin::errors::SupervisorError;
use tz_gin::exec::run_process_loop;
use tz_gin_test_utils::fakes::FakeLauncher;
use tz_gin_test_utils::{init_tracing, wait_until, with_timeout};

const WAIT: Duration = Duration::from_secs(5);

fn built(artifact: &str, success: bool) -> BuildResult {
    BuildResult {
        success,
        artifact: PathBuf::from(artifact),
        exit_code: Some(if success { 0 } else { 1 }),
        output: String::new(),
        duration: Duration::from_millis(5),
    }
}

#[tokio::test]
async fn at_most_one_instance_runs_across_restarts() {
    init_tracing();
    let launcher = FakeLauncher::new();
    let stats = launcher.stats();

    let (result_tx, result_rx) = mpsc::channel(1);
    let token = CancellationToken::new();
    let handle = tokio::spawn(run_process_loop(launcher, result_rx, token.clone()));

    for _ in 0..5 {
        result_tx.send(built("/proj/tmp/main", true)).await.unwrap();
    }
    assert!(wait_until(WAIT, || stats.launches() == 5).await);

    assert_eq!(stats.max_live(), 1);
    assert_eq!(stats.live(), 1);
    assert_eq!(stats.terminations(), 4);

    token.cancel();
    with_timeout(handle).await.unwrap().unwrap();
    assert_eq!(stats.live(), 0);
    assert_eq!(stats.terminations(), 5);
}

#[tokio::test]
async fn unsuccessful_results_are_ignored() {
    init_tracing();
    let launcher = FakeLauncher::new();
    let stats = launcher.stats();

    let (result_tx, result_rx) = mpsc::channel(1);
    let token = CancellationToken::new();
    let handle = tokio::spawn(run_process_loop(launcher, result_rx, token.clone()));

    result_tx.send(built("/proj/tmp/main", false)).await.unwrap();
    result_tx.send(built("/proj/tmp/main", true)).await.unwrap();
    assert!(wait_until(WAIT, || stats.launches() == 1).await);

    token.cancel();
    with_timeout(handle).await.unwrap().unwrap();
    assert_eq!(stats.launches(), 1);
}

#[tokio::test]
async fn launch_failure_is_fatal() {
    init_tracing();
    let launcher = FakeLauncher::new().fail_launch_at(2);
    let stats = launcher.stats();

    let (result_tx, result_rx) = mpsc::channel(1);
    let handle = tokio::spawn(run_process_loop(
        launcher,
        result_rx,
        CancellationToken::new(),
    ));

    result_tx.send(built("/proj/tmp/main", true)).await.unwrap();
    result_tx.send(built("/proj/tmp/main", true)).await.unwrap();

    let err = with_timeout(handle).await.unwrap().unwrap_err();
    assert!(matches!(err, SupervisorError::ProcessStart { .. }), "got {err:?}");
    assert_eq!(stats.live(), 0);
}

#[tokio::test]
async fn kill_failure_is_fatal() {
    init_tracing();
    let launcher = FakeLauncher::new().fail_terminate();
    let stats = launcher.stats();

    let (result_tx, result_rx) = mpsc::channel(1);
    let handle = tokio::spawn(run_process_loop(
        launcher,
        result_rx,
        CancellationToken::new(),
    ));

    result_tx.send(built("/proj/tmp/main", true)).await.unwrap();
    result_tx.send(built("/proj/tmp/main", true)).await.unwrap();

    let err = with_timeout(handle).await.unwrap().unwrap_err();
    match err {
        SupervisorError::ProcessKill { pid, .. } => assert_eq!(pid, Some(10_001)),
        other => panic!("expected ProcessKill, got {other:?}"),
    }
    // The replacement was never started.
    assert_eq!(stats.launches(), 1);
}

#[tokio::test]
async fn crashed_process_is_forgotten_and_next_build_starts_fresh() {
    init_tracing();
    let launcher = FakeLauncher::new().crash_after(Duration::from_millis(20));
    let stats = launcher.stats();

    let (result_tx, result_rx) = mpsc::channel(1);
    let token = CancellationToken::new();
    let handle = tokio::spawn(run_process_loop(launcher, result_rx, token.clone()));

    result_tx.send(built("/proj/tmp/main", true)).await.unwrap();
    assert!(wait_until(WAIT, || stats.launches() == 1 && stats.live() == 0).await);

    result_tx.send(built("/proj/tmp/main", true)).await.unwrap();
    assert!(wait_until(WAIT, || stats.launches() == 2).await);
    // Nothing to stop: the first instance was already gone.
    assert_eq!(stats.terminations(), 0);
    assert_eq!(stats.max_live(), 1);

    token.cancel();
    with_timeout(handle).await.unwrap().unwrap();
    assert_eq!(stats.live(), 0);
}

#[tokio::test]
async fn loop_ends_when_build_loop_is_gone() {
    init_tracing();
    let launcher = FakeLauncher::new();
    let stats = launcher.stats();

    let (result_tx, result_rx) = mpsc::channel(1);
    let handle = tokio::spawn(run_process_loop(
        launcher,
        result_rx,
        CancellationToken::new(),
    ));

    result_tx.send(built("/proj/tmp/main", true)).await.unwrap();
    drop(result_tx);

    with_timeout(handle).await.unwrap().unwrap();
    assert_eq!(stats.launches(), 1);
    assert_eq!(stats.live(), 0);
}

#[cfg(unix)]
mod real_processes {
    use std::path::Path;

    use tz_gin::exec::ChildLauncher;

    use super::*;

    fn recorded_pids(pidfile: &Path) -> Vec<String> {
        std::fs::read_to_string(pidfile)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn is_alive(pid: &str) -> bool {
        std::process::Command::new("kill")
            .args(["-0", pid])
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn previous_instance_is_dead_before_next_starts() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let pidfile = dir.path().join("pids");

        // `sh -c SCRIPT PIDFILE`: record our pid, then become a long sleep.
        let launcher = ChildLauncher::new(vec![
            "-c".to_string(),
            "echo $$ >> \"$0\"; exec sleep 30".to_string(),
            pidfile.to_string_lossy().into_owned(),
        ]);

        let (result_tx, result_rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        let handle = tokio::spawn(run_process_loop(launcher, result_rx, token.clone()));

        result_tx.send(built("/bin/sh", true)).await.unwrap();
        assert!(wait_until(WAIT, || recorded_pids(&pidfile).len() == 1).await);

        result_tx.send(built("/bin/sh", true)).await.unwrap();
        assert!(wait_until(WAIT, || recorded_pids(&pidfile).len() == 2).await);

        let pids = recorded_pids(&pidfile);
        assert!(!is_alive(&pids[0]), "first instance still running");
        assert!(is_alive(&pids[1]), "second instance not running");

        token.cancel();
        with_timeout(handle).await.unwrap().unwrap();
        assert!(!is_alive(&pids[1]), "instance survived shutdown");
    }

    #[tokio::test]
    async fn missing_artifact_is_fatal() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("tmp").join("main");

        let (result_tx, result_rx) = mpsc::channel(1);
        let handle = tokio::spawn(run_process_loop(
            ChildLauncher::default(),
            result_rx,
            CancellationToken::new(),
        ));

        result_tx
            .send(built(&missing.to_string_lossy(), true))
            .await
            .unwrap();

        let err = with_timeout(handle).await.unwrap().unwrap_err();
        match err {
            SupervisorError::ProcessStart { artifact, .. } => assert_eq!(artifact, missing),
            other => panic!("expected ProcessStart, got {other:?}"),
        }
    }
}
