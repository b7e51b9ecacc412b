//! The per-service Supervisor: owns the monitoring loop, the
//! crash/normal-exit classifier, and the group lifecycle.

use super::error::SupervisorError;
use super::starter::SupervisorStarter;
use super::state::{SupervisorSnapshot, TrackedState};
use super::stopper::SupervisorStopper;
use crate::config::service::ServiceConfig;
use crate::context::Context;
use crate::crash::recorder::{CrashRecord, CrashRecorder, ExitKind};
use crate::event::cancellation::CancellationMessage;
use crate::event::channel::EventConsumer;
use crate::event::sink::{EventSink, LogLevel, ServiceStatus};
use crate::launcher::{self, LaunchSpec};
use crate::process::discovery::{discover, DiscoveryInput};
use crate::process::inventory::{Pid, ProcInfo, ProcessInventory};
use crate::process::terminator;
use crate::utils::thread_context::{NotStartedThreadContext, StartedThreadContext, ThreadContextStopperError};
use std::collections::HashMap;
use std::process::{Child, Command};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

const POLL_INTERVAL: Duration = Duration::from_secs(5);
const CAPTURE_WAIT: Duration = Duration::from_secs(1);

pub struct NotStartedSupervisor {
    config: ServiceConfig,
    inventory: Arc<dyn ProcessInventory>,
    sink: EventSink,
    crash_recorder: Arc<CrashRecorder>,
}

pub struct StartedSupervisor {
    thread: StartedThreadContext,
    capture_cancel: Context<bool>,
    snapshot: Arc<Mutex<SupervisorSnapshot>>,
    tracked: Arc<Mutex<TrackedState>>,
}

impl NotStartedSupervisor {
    pub fn new(
        config: ServiceConfig,
        inventory: Arc<dyn ProcessInventory>,
        sink: EventSink,
        crash_recorder: Arc<CrashRecorder>,
    ) -> Self {
        Self {
            config,
            inventory,
            sink,
            crash_recorder,
        }
    }
}

impl SupervisorStarter for NotStartedSupervisor {
    type Stopped = StartedSupervisor;

    fn start(self) -> Result<StartedSupervisor, SupervisorError> {
        let name = self.config.name.clone();

        if !self.config.enabled {
            self.sink.status(&name, ServiceStatus::Disabled);
            info!(service = %name, "service disabled, refusing to start");
            return Err(SupervisorError::Disabled);
        }

        let snapshot = Arc::new(Mutex::new(SupervisorSnapshot::default()));
        let tracked = Arc::new(Mutex::new(TrackedState::default()));
        let capture_cancel = Context::<bool>::new();

        let config = self.config.clone();
        let inventory = self.inventory.clone();
        let sink = self.sink.clone();
        let crash_recorder = self.crash_recorder.clone();
        let snapshot_for_loop = snapshot.clone();
        let tracked_for_loop = tracked.clone();
        let capture_cancel_for_loop = capture_cancel.clone();

        let thread_name = format!("supervisor-{name}");
        let callback = move |stop_consumer: EventConsumer<CancellationMessage>| {
            run_monitor_loop(MonitorLoop {
                config,
                inventory,
                sink,
                crash_recorder,
                snapshot: snapshot_for_loop,
                tracked: tracked_for_loop,
                capture_cancel: capture_cancel_for_loop,
                stop_consumer,
            });
        };

        let thread = NotStartedThreadContext::new(thread_name, callback).start();

        Ok(StartedSupervisor {
            thread,
            capture_cancel,
            snapshot,
            tracked,
        })
    }
}

impl SupervisorStopper for StartedSupervisor {
    fn stop(self) -> Result<(), ThreadContextStopperError> {
        // Tells in-flight descendant capture activities not to mutate
        // `tracked` after this point.
        let _ = self.capture_cancel.cancel_all(true);
        self.thread.stop_blocking()
    }

    fn is_alive(&self) -> bool {
        matches!(
            self.snapshot.lock().expect("snapshot mutex poisoned").status,
            ServiceStatus::Starting | ServiceStatus::Running
        )
    }

    fn status(&self) -> ServiceStatus {
        self.snapshot.lock().expect("snapshot mutex poisoned").status
    }
}

impl StartedSupervisor {
    /// Number of crashes classified so far; monotonically non-decreasing.
    pub fn crash_count(&self) -> u64 {
        self.snapshot.lock().expect("snapshot mutex poisoned").crash_count
    }

    /// Size of the currently tracked-PID set.
    pub fn tracked_pid_count(&self) -> usize {
        self.tracked.lock().expect("tracked mutex poisoned").pids.len()
    }

    /// Snapshot of the tracked-PID set itself, for tests asserting disjointness.
    pub fn tracked_pids(&self) -> Vec<Pid> {
        self.tracked.lock().expect("tracked mutex poisoned").pids.clone()
    }
}

struct MonitorLoop {
    config: ServiceConfig,
    inventory: Arc<dyn ProcessInventory>,
    sink: EventSink,
    crash_recorder: Arc<CrashRecorder>,
    snapshot: Arc<Mutex<SupervisorSnapshot>>,
    tracked: Arc<Mutex<TrackedState>>,
    capture_cancel: Context<bool>,
    stop_consumer: EventConsumer<CancellationMessage>,
}

/// The monitoring activity body. Runs until `stop()` sends a
/// cancellation message, at which point it runs the Group terminator over
/// whatever is left tracked before returning.
fn run_monitor_loop(ctx: MonitorLoop) {
    let MonitorLoop {
        config,
        inventory,
        sink,
        crash_recorder,
        snapshot,
        tracked,
        capture_cancel,
        stop_consumer,
    } = ctx;

    let name = config.name.clone();
    set_status(&snapshot, &sink, &name, ServiceStatus::Starting);

    if stop_consumer.is_cancelled(config.startup_delay()) {
        cleanup(&inventory, &mut None, &tracked);
        set_status(&snapshot, &sink, &name, ServiceStatus::Stopped);
        return;
    }

    let mut current_child: Option<Child> = None;
    let mut direct_child_pid: Option<Pid> = None;
    let mut before_inventory: HashMap<Pid, ProcInfo> = HashMap::new();
    let mut last_start_time: Option<SystemTime> = None;
    let mut launch_spec: Option<LaunchSpec> = None;
    let mut crash_count: u64 = 0;
    let mut should_run = true;
    let mut first_iteration = true;

    while should_run {
        if !first_iteration && stop_consumer.is_cancelled(POLL_INTERVAL) {
            break;
        }
        first_iteration = false;

        let child_running = current_child
            .as_mut()
            .map(|child| matches!(child.try_wait(), Ok(None)))
            .unwrap_or(false);

        let tracked_alive = {
            let guard = tracked.lock().expect("tracked mutex poisoned");
            !guard.pids.is_empty()
                && guard.pids.iter().any(|&pid| {
                    inventory.process_alive(pid)
                        && profile_ok(&inventory.cmdline(pid), guard.profile_flag.as_deref())
                })
        };

        if child_running || tracked_alive {
            continue;
        }

        if let Some(mut child) = current_child.take() {
            let exit_status = child.try_wait().ok().flatten();
            let exit_code = exit_status.and_then(|s| s.code());
            let uptime = last_start_time
                .and_then(|t| t.elapsed().ok())
                .unwrap_or_default();

            let is_crash = classify(exit_code, uptime, config.min_uptime_for_crash());

            if is_crash {
                crash_count += 1;
                record_crash(
                    &crash_recorder,
                    &sink,
                    &config,
                    direct_child_pid,
                    exit_code,
                    uptime,
                    last_start_time,
                    crash_count,
                );
                update_crash_count(&snapshot, crash_count);
                set_status(&snapshot, &sink, &name, ServiceStatus::Error);

                if !config.auto_restart {
                    info!(service = %name, "auto_restart disabled, stopping after crash");
                    should_run = false;
                    direct_child_pid = None;
                    continue;
                }
                // fall through to respawn below, same iteration
            } else {
                info!(service = %name, exit_code, uptime = ?uptime, "service exited normally");

                if config.track_child_processes {
                    if tracked.lock().expect("tracked mutex poisoned").pids.is_empty() {
                        debug!(service = %name, "waiting for background descendant capture");
                        stop_consumer.is_cancelled(CAPTURE_WAIT);
                    }
                    if tracked.lock().expect("tracked mutex poisoned").pids.is_empty() {
                        if let Some(spec) = &launch_spec {
                            debug!(service = %name, "attempting inline descendant capture");
                            let after = inventory.snapshot();
                            let discovered = discover(
                                &DiscoveryInput {
                                    before: &before_inventory,
                                    after: &after,
                                    direct_child: direct_child_pid.unwrap_or_default(),
                                    profile_flag: spec.profile_flag.as_deref(),
                                    exe_path: &spec.program,
                                    process_names: &config.process_names,
                                    ancestor_depth: config.snapshot_ancestor_depth,
                                    descendant_limit: config.snapshot_descendant_limit,
                                },
                                inventory.as_ref(),
                            );
                            if !discovered.is_empty() {
                                let mut guard = tracked.lock().expect("tracked mutex poisoned");
                                guard.pids = discovered;
                            }
                        }
                    }
                    if !tracked.lock().expect("tracked mutex poisoned").pids.is_empty() {
                        direct_child_pid = None;
                        set_status(&snapshot, &sink, &name, ServiceStatus::Running);
                        continue;
                    }
                }

                should_run = false;
                direct_child_pid = None;
                continue;
            }
        }

        // First iteration, or falling through after a restartable crash: spawn.
        // `direct_child_pid` is still set from the crash we just classified
        // (cleared only on the non-restarting paths above), so this only
        // re-announces `starting` on an actual restart, not on the first spawn.
        if direct_child_pid.is_some() {
            set_status(&snapshot, &sink, &name, ServiceStatus::Starting);
        }
        before_inventory = inventory.snapshot();
        match launcher::build(&config) {
            Ok(spec) => match spawn(&spec) {
                Ok(child) => {
                    let pid = child.id();
                    direct_child_pid = Some(pid);
                    last_start_time = Some(SystemTime::now());
                    {
                        let mut guard = tracked.lock().expect("tracked mutex poisoned");
                        *guard = TrackedState {
                            pids: Vec::new(),
                            profile_flag: spec.profile_flag.clone(),
                        };
                    }
                    update_last_start(&snapshot, last_start_time);
                    set_status(&snapshot, &sink, &name, ServiceStatus::Running);

                    if config.track_child_processes {
                        let _ = capture_cancel.reset();
                        spawn_capture_activity(
                            name.clone(),
                            config.clone(),
                            inventory.clone(),
                            before_inventory.clone(),
                            pid,
                            spec.clone(),
                            tracked.clone(),
                            capture_cancel.clone(),
                        );
                    }
                    current_child = Some(child);
                    launch_spec = Some(spec);
                }
                Err(err) => {
                    warn!(service = %name, error = %err, "transient spawn failure, retrying next tick");
                }
            },
            Err(err) => {
                error!(service = %name, error = %err, "launch configuration invalid");
                set_status(&snapshot, &sink, &name, ServiceStatus::Error);
                should_run = false;
            }
        }
    }

    let _ = capture_cancel.cancel_all(true);
    cleanup(&inventory, &mut current_child, &tracked);
    set_status(&snapshot, &sink, &name, ServiceStatus::Stopped);
}

fn classify(exit_code: Option<i32>, uptime: Duration, min_uptime: Duration) -> bool {
    match exit_code {
        // A missing exit code means the child died to a signal rather than
        // returning from `main` — always a crash, regardless of uptime.
        None => true,
        Some(0) => {
            if min_uptime.is_zero() {
                false
            } else {
                uptime >= min_uptime
            }
        }
        Some(_) => true,
    }
}

fn profile_ok(cmdline: &[String], profile_flag: Option<&str>) -> bool {
    match profile_flag {
        Some(flag) => cmdline.iter().any(|token| token.contains(flag)),
        None => true,
    }
}

fn spawn(spec: &LaunchSpec) -> std::io::Result<Child> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args).envs(&spec.env);
    if let Some(cwd) = &spec.cwd {
        cmd.current_dir(cwd);
    }
    cmd.spawn()
}

#[allow(clippy::too_many_arguments)]
fn spawn_capture_activity(
    service: String,
    config: ServiceConfig,
    inventory: Arc<dyn ProcessInventory>,
    before: HashMap<Pid, ProcInfo>,
    direct_child: Pid,
    spec: LaunchSpec,
    tracked: Arc<Mutex<TrackedState>>,
    cancel: Context<bool>,
) {
    crate::utils::threads::spawn_named_thread(format!("capture-{service}"), move || {
        let (lock, cvar) = cancel.get_lock_cvar();
        let guard = lock.lock().expect("capture cancel mutex poisoned");
        let (_guard, wait_result) = cvar
            .wait_timeout_while(guard, config.snapshot_capture_duration() + config.snapshot_settle_delay(), |cancelled| {
                !*cancelled
            })
            .expect("capture cancel mutex poisoned");
        // `timed_out() == false` means the predicate returned false early,
        // i.e. the cancellation flag was set before the settle delay elapsed.
        let cancelled = !wait_result.timed_out();
        drop(_guard);
        if cancelled {
            debug!(service = %service, "descendant capture cancelled before completing");
            return;
        }

        let after = inventory.snapshot();
        let discovered = discover(
            &DiscoveryInput {
                before: &before,
                after: &after,
                direct_child,
                profile_flag: spec.profile_flag.as_deref(),
                exe_path: &spec.program,
                process_names: &config.process_names,
                ancestor_depth: config.snapshot_ancestor_depth,
                descendant_limit: config.snapshot_descendant_limit,
            },
            inventory.as_ref(),
        );

        if !*lock.lock().expect("capture cancel mutex poisoned") {
            let mut guard = tracked.lock().expect("tracked mutex poisoned");
            guard.pids = discovered;
        }
    });
}

#[allow(clippy::too_many_arguments)]
fn record_crash(
    crash_recorder: &CrashRecorder,
    sink: &EventSink,
    config: &ServiceConfig,
    pid: Option<Pid>,
    exit_code: Option<i32>,
    uptime: Duration,
    started_at: Option<SystemTime>,
    crash_number: u64,
) {
    let exit = match exit_code {
        Some(code) => ExitKind::Code(code),
        None => ExitKind::Killed,
    };
    let record = CrashRecord {
        service_name: &config.name,
        service_type: config.service_type,
        pid,
        exit,
        uptime,
        started_at: started_at.unwrap_or(SystemTime::UNIX_EPOCH),
        command: &config.command,
        crash_number,
    };
    crash_recorder.record(sink, &record);
}

fn set_status(snapshot: &Arc<Mutex<SupervisorSnapshot>>, sink: &EventSink, name: &str, status: ServiceStatus) {
    snapshot.lock().expect("snapshot mutex poisoned").status = status;
    sink.status(name, status);
    sink.log(name, LogLevel::Info, format!("status -> {status}"));
}

fn update_crash_count(snapshot: &Arc<Mutex<SupervisorSnapshot>>, crash_count: u64) {
    snapshot.lock().expect("snapshot mutex poisoned").crash_count = crash_count;
}

fn update_last_start(snapshot: &Arc<Mutex<SupervisorSnapshot>>, last_start_time: Option<SystemTime>) {
    snapshot.lock().expect("snapshot mutex poisoned").last_start_time = last_start_time;
}

/// Stop sequence: Group terminator over the direct child and whatever
/// is left in `tracked`, then clear both.
fn cleanup(inventory: &Arc<dyn ProcessInventory>, current_child: &mut Option<Child>, tracked: &Arc<Mutex<TrackedState>>) {
    let mut guard = tracked.lock().expect("tracked mutex poisoned");
    if let Some(mut child) = current_child.take() {
        let pid = child.id();
        let _ = terminator::terminate_group(inventory.as_ref(), pid, guard.profile_flag.as_deref());
        let _ = child.wait();
    }
    if !guard.pids.is_empty() {
        terminator::terminate_pids(inventory.as_ref(), &guard.pids, guard.profile_flag.as_deref());
    }
    guard.pids.clear();
    guard.profile_flag = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::zero_exit_below_threshold(Some(0), 2, 10, false)]
    #[case::zero_exit_at_threshold(Some(0), 10, 10, true)]
    #[case::zero_exit_above_threshold(Some(0), 15, 10, true)]
    #[case::zero_exit_never_crashes_with_no_threshold(Some(0), 999, 0, false)]
    #[case::nonzero_exit_crashes_even_with_no_uptime(Some(1), 0, 10, true)]
    #[case::nonzero_exit_crashes_regardless_of_uptime(Some(1), 999, 10, true)]
    #[case::killed_with_no_code_crashes_even_below_threshold(None, 2, 10, true)]
    #[case::killed_with_no_code_crashes_above_threshold(None, 15, 10, true)]
    fn classify_matches_the_exit_classification_table(
        #[case] exit_code: Option<i32>,
        #[case] uptime_secs: u64,
        #[case] min_uptime_secs: u64,
        #[case] expect_crash: bool,
    ) {
        assert_eq!(
            classify(exit_code, Duration::from_secs(uptime_secs), Duration::from_secs(min_uptime_secs)),
            expect_crash
        );
    }
}
