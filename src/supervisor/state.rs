//! Shared, cross-thread-visible pieces of the supervisor's state.
//!
//! The bulk of it (`direct_child`, `before_inventory`, ...) is owned
//! exclusively by the monitoring activity and never leaves its stack frame.
//! These two small structs are the only state genuinely shared across
//! activities: a read-only status snapshot for `status()`/`is_alive()`, and
//! the handoff point where the descendant-capture activity deposits its
//! result for the monitoring activity to pick up.

use crate::event::sink::ServiceStatus;
use crate::process::inventory::Pid;
use std::time::SystemTime;

/// What `StartedSupervisor::status()` reports, updated by the monitoring
/// activity at every transition.
#[derive(Debug, Clone)]
pub struct SupervisorSnapshot {
    pub status: ServiceStatus,
    pub crash_count: u64,
    pub last_start_time: Option<SystemTime>,
}

impl Default for SupervisorSnapshot {
    fn default() -> Self {
        Self {
            status: ServiceStatus::Stopped,
            crash_count: 0,
            last_start_time: None,
        }
    }
}

/// The tracked-PID set plus the profile token it was filtered against,
/// written once by the capture activity per spawn and read every tick by the
/// monitoring activity.
#[derive(Debug, Clone, Default)]
pub struct TrackedState {
    pub pids: Vec<Pid>,
    pub profile_flag: Option<String>,
}
