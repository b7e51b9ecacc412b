//! Process inventory: enumerates running processes and answers
//! liveness/children/cmdline queries. Best-effort — missing processes and
//! access denials are silently treated as absent, never as errors.

use std::collections::HashMap;
use std::sync::Mutex;
use sysinfo::{PidExt, ProcessExt, System, SystemExt};

pub type Pid = u32;

/// A single process's identity, fully lowercased so every consumer compares
/// case-insensitively without re-deriving that rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcInfo {
    pub pid: Pid,
    pub ppid: Option<Pid>,
    pub name: String,
    pub exe: String,
    pub cmdline: Vec<String>,
}

impl ProcInfo {
    pub fn cmdline_joined(&self) -> String {
        self.cmdline.join(" ")
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait ProcessInventory: Send + Sync {
    fn snapshot(&self) -> HashMap<Pid, ProcInfo>;
    fn process_alive(&self, pid: Pid) -> bool;
    /// Direct children of `pid` if `!recursive`, else the full descendant set.
    fn children(&self, pid: Pid, recursive: bool) -> Vec<Pid>;
    fn cmdline(&self, pid: Pid) -> Vec<String>;
}

/// `sysinfo`-backed inventory. Re-refreshes the whole process table on every
/// call — no cached global state.
pub struct SysinfoInventory {
    system: Mutex<System>,
}

impl SysinfoInventory {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    fn refreshed(&self) -> std::sync::MutexGuard<'_, System> {
        let mut system = self.system.lock().expect("process inventory mutex poisoned");
        system.refresh_processes();
        system
    }
}

impl Default for SysinfoInventory {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessInventory for SysinfoInventory {
    fn snapshot(&self) -> HashMap<Pid, ProcInfo> {
        let system = self.refreshed();
        system
            .processes()
            .values()
            .map(|proc| {
                let info = ProcInfo {
                    pid: proc.pid().as_u32(),
                    ppid: proc.parent().map(|p| p.as_u32()),
                    name: proc.name().to_lowercase(),
                    exe: proc.exe().display().to_string().to_lowercase(),
                    cmdline: proc.cmd().iter().map(|s| s.to_lowercase()).collect(),
                };
                (info.pid, info)
            })
            .collect()
    }

    fn process_alive(&self, pid: Pid) -> bool {
        let system = self.refreshed();
        system.process(sysinfo::Pid::from_u32(pid)).is_some()
    }

    fn children(&self, pid: Pid, recursive: bool) -> Vec<Pid> {
        let system = self.refreshed();
        if !recursive {
            return system
                .processes()
                .values()
                .filter(|p| p.parent().map(|pp| pp.as_u32()) == Some(pid))
                .map(|p| p.pid().as_u32())
                .collect();
        }

        let mut result = Vec::new();
        let mut frontier = vec![pid];
        while let Some(current) = frontier.pop() {
            for proc in system.processes().values() {
                if proc.parent().map(|pp| pp.as_u32()) == Some(current) {
                    let child = proc.pid().as_u32();
                    result.push(child);
                    frontier.push(child);
                }
            }
        }
        result
    }

    fn cmdline(&self, pid: Pid) -> Vec<String> {
        let system = self.refreshed();
        system
            .process(sysinfo::Pid::from_u32(pid))
            .map(|p| p.cmd().iter().map(|s| s.to_lowercase()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_process_is_alive() {
        let inventory = SysinfoInventory::new();
        let pid = std::process::id();
        assert!(inventory.process_alive(pid));
    }

    #[test]
    fn snapshot_contains_current_process() {
        let inventory = SysinfoInventory::new();
        let pid = std::process::id();
        let snapshot = inventory.snapshot();
        assert!(snapshot.contains_key(&pid));
    }

    #[test]
    fn unknown_pid_is_not_alive() {
        let inventory = SysinfoInventory::new();
        assert!(!inventory.process_alive(u32::MAX));
    }
}
