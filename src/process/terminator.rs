//! Group terminator: recursive, profile-filter-respecting kill.
//!
//! Kills children before the root, leaves before ancestors, and skips any
//! PID whose command-line doesn't match the profile flag rather than ever
//! killing it — a job-object-style kill-on-close would be all-or-nothing
//! and can't honor that skip rule, so each PID is signaled individually.

use super::inventory::{Pid, ProcessInventory};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

const REAP_TIMEOUT: Duration = Duration::from_secs(5);
const REAP_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum TerminateError {
    #[error("process {0} did not reap within the timeout")]
    Timeout(Pid),
}

/// Kills `root` and every live descendant, leaves first, honoring
/// `profile_flag` as a skip rule: a PID whose command-line does not contain
/// it is never touched.
pub fn terminate_group(
    inventory: &dyn ProcessInventory,
    root: Pid,
    profile_flag: Option<&str>,
) -> Result<(), TerminateError> {
    let descendants = inventory.children(root, true);

    for pid in descendants.into_iter().rev() {
        kill_one(inventory, pid, profile_flag);
    }

    kill_one(inventory, root, profile_flag);
    wait_for_reap(inventory, root)
}

/// Terminates an explicit set of tracked PIDs (no single root), used when
/// only descendants remain tracked and the direct child has already exited.
pub fn terminate_pids(inventory: &dyn ProcessInventory, pids: &[Pid], profile_flag: Option<&str>) {
    for &pid in pids.iter().rev() {
        kill_one(inventory, pid, profile_flag);
    }
}

fn kill_one(inventory: &dyn ProcessInventory, pid: Pid, profile_flag: Option<&str>) {
    if let Some(flag) = profile_flag {
        let cmdline = inventory.cmdline(pid);
        if !cmdline.iter().any(|token| token.contains(flag)) {
            debug!(pid, "skipping pid that does not match profile flag");
            return;
        }
    }
    if !inventory.process_alive(pid) {
        return;
    }
    if let Err(err) = send_kill(pid) {
        warn!(pid, error = %err, "failed to signal process, it may have already exited");
    }
}

fn wait_for_reap(inventory: &dyn ProcessInventory, pid: Pid) -> Result<(), TerminateError> {
    let deadline = Instant::now() + REAP_TIMEOUT;
    while Instant::now() < deadline {
        if !inventory.process_alive(pid) {
            return Ok(());
        }
        thread::sleep(REAP_POLL_INTERVAL);
    }
    if inventory.process_alive(pid) {
        Err(TerminateError::Timeout(pid))
    } else {
        Ok(())
    }
}

#[cfg(unix)]
fn send_kill(pid: Pid) -> Result<(), nix::Error> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid as NixPid;

    let nix_pid = NixPid::from_raw(pid as i32);
    // SIGTERM first; if the process ignores it, the supervisor will still
    // report a timeout and move on rather than escalate to SIGKILL here,
    // matching `_kill_process`'s single best-effort terminate call.
    match kill(nix_pid, Signal::SIGTERM) {
        Ok(()) => Ok(()),
        Err(nix::Error::ESRCH) => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(windows)]
fn send_kill(pid: Pid) -> Result<(), std::io::Error> {
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Threading::{OpenProcess, TerminateProcess, PROCESS_TERMINATE};

    unsafe {
        let handle = OpenProcess(PROCESS_TERMINATE, false, pid);
        let handle = match handle {
            Ok(h) => h,
            Err(_) => return Ok(()), // already gone
        };
        let result = TerminateProcess(handle, 1);
        let _ = CloseHandle(handle);
        result.map_err(|e| std::io::Error::from_raw_os_error(e.code().0))
    }
}
