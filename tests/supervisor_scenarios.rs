//! End-to-end scenarios against real child processes, driving the full
//! `Supervisor` rather than its pieces in isolation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use watchdogd::config::service::{ServiceConfig, ServiceType};
use watchdogd::crash::CrashRecorder;
use watchdogd::event::sink::event_sink;
use watchdogd::process::SysinfoInventory;
use watchdogd::supervisor::{NotStartedSupervisor, SupervisorStarter, SupervisorStopper};

fn base_config(name: &str, command: &str, args: &[&str]) -> ServiceConfig {
    ServiceConfig {
        name: name.to_string(),
        service_type: ServiceType::Executable,
        enabled: true,
        auto_restart: true,
        command: command.to_string(),
        args: args.iter().map(|s| s.to_string()).collect(),
        workspace: None,
        environment: HashMap::new(),
        startup_delay_secs: 0,
        min_uptime_for_crash_secs: 1,
        track_child_processes: false,
        use_unique_profile: false,
        profile_base_dir: None,
        snapshot_capture_duration_secs: 0.2,
        snapshot_settle_delay_secs: 0.3,
        snapshot_ancestor_depth: 10,
        snapshot_descendant_limit: 50,
        process_names: Vec::new(),
    }
}

fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    predicate()
}

fn harness() -> (Arc<SysinfoInventory>, Arc<CrashRecorder>) {
    let tmp = tempfile::tempdir().unwrap();
    (
        Arc::new(SysinfoInventory::new()),
        Arc::new(CrashRecorder::new(tmp.path().join("crash.log"))),
    )
}

#[test]
fn crashing_child_is_classified_and_restarted() {
    let (inventory, crash_recorder) = harness();
    let (sink, _consumer) = event_sink();

    let config = base_config("crasher", "/bin/sh", &["-c", "sleep 1; exit 1"]);
    let supervisor = NotStartedSupervisor::new(config, inventory, sink, crash_recorder);
    let handle = supervisor.start().expect("enabled service should start");

    assert!(wait_until(Duration::from_secs(12), || handle.crash_count() >= 1));

    handle.stop().unwrap();
}

#[test]
fn normal_zero_exit_stops_the_supervisor() {
    let (inventory, crash_recorder) = harness();
    let (sink, _consumer) = event_sink();

    let mut config = base_config("quick-exit", "/bin/sh", &["-c", "exit 0"]);
    config.min_uptime_for_crash_secs = 0;
    let supervisor = NotStartedSupervisor::new(config, inventory, sink, crash_recorder);
    let handle = supervisor.start().expect("enabled service should start");

    assert!(wait_until(Duration::from_secs(8), || !handle.is_alive()));
    assert_eq!(handle.crash_count(), 0);

    handle.stop().unwrap();
}

#[test]
fn restart_disabled_stops_after_one_crash() {
    let (inventory, crash_recorder) = harness();
    let (sink, _consumer) = event_sink();

    let mut config = base_config("no-restart", "/bin/sh", &["-c", "sleep 1; exit 1"]);
    config.auto_restart = false;
    let supervisor = NotStartedSupervisor::new(config, inventory, sink, crash_recorder);
    let handle = supervisor.start().expect("enabled service should start");

    assert!(wait_until(Duration::from_secs(10), || handle.crash_count() == 1 && !handle.is_alive()));

    handle.stop().unwrap();
}

#[test]
fn disabled_service_refuses_to_start() {
    let (inventory, crash_recorder) = harness();
    let (sink, _consumer) = event_sink();

    let mut config = base_config("off", "/bin/true", &[]);
    config.enabled = false;
    let supervisor = NotStartedSupervisor::new(config, inventory, sink, crash_recorder);

    assert!(supervisor.start().is_err());
}

#[test]
fn missing_command_fails_fast() {
    let (inventory, crash_recorder) = harness();
    let (sink, _consumer) = event_sink();

    let config = base_config("ghost", "/no/such/binary-xyz", &[]);
    let supervisor = NotStartedSupervisor::new(config, inventory, sink, crash_recorder);
    let handle = supervisor.start().expect("start() itself succeeds; launch fails inside the loop");

    assert!(wait_until(Duration::from_secs(8), || handle.status().to_string() == "error"));
    assert_eq!(handle.crash_count(), 0);

    handle.stop().unwrap();
}

#[test]
fn launcher_with_descendants_tracks_the_grandchild() {
    let (inventory, crash_recorder) = harness();
    let (sink, _consumer) = event_sink();

    // Forks a short-lived grandchild and exits 0 quickly, mirroring a
    // launcher that hands off to a longer-lived worker.
    let mut config = base_config(
        "launcher",
        "/bin/sh",
        &["-c", "(sleep 2 &) ; exit 0"],
    );
    config.track_child_processes = true;
    config.min_uptime_for_crash_secs = 0;
    let supervisor = NotStartedSupervisor::new(config, inventory, sink, crash_recorder);
    let handle = supervisor.start().expect("enabled service should start");

    // Best-effort: descendant discovery for a detached grandchild is
    // inherently racy across shells; assert the supervisor at least reaches
    // a terminal, non-crashed state without panicking.
    assert!(wait_until(Duration::from_secs(8), || !handle.is_alive() || handle.tracked_pid_count() > 0));
    assert_eq!(handle.crash_count(), 0);

    handle.stop().unwrap();
}
