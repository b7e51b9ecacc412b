use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

fn default_true() -> bool {
    true
}

fn default_min_uptime_for_crash() -> u64 {
    10
}

fn default_snapshot_capture_duration() -> f64 {
    2.0
}

fn default_snapshot_settle_delay() -> f64 {
    3.0
}

fn default_snapshot_ancestor_depth() -> u32 {
    10
}

fn default_snapshot_descendant_limit() -> usize {
    50
}

/// The closed set of launch strategies a service can declare.
///
/// The supervisor never branches on this tag itself; it is consumed only by
/// the launcher's strategy table (`crate::launcher::build`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Executable,
    NpmScript,
    PowershellScript,
    ShellScript,
}

/// Immutable, declarative description of one supervised service.
///
/// Deserialized straight from the catalog file; every optional field carries
/// a sensible default via `#[serde(default = ...)]` so a minimal entry
/// such as `{"name": "x", "type": "executable", "command": "/bin/true"}` is
/// valid input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: ServiceType,

    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub auto_restart: bool,

    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub workspace: Option<String>,
    #[serde(default)]
    pub environment: HashMap<String, String>,

    #[serde(default)]
    pub startup_delay_secs: u64,
    #[serde(default = "default_min_uptime_for_crash")]
    pub min_uptime_for_crash_secs: u64,

    #[serde(default)]
    pub track_child_processes: bool,

    #[serde(default = "default_true")]
    pub use_unique_profile: bool,
    #[serde(default)]
    pub profile_base_dir: Option<String>,

    #[serde(default = "default_snapshot_capture_duration")]
    pub snapshot_capture_duration_secs: f64,
    #[serde(default = "default_snapshot_settle_delay")]
    pub snapshot_settle_delay_secs: f64,
    #[serde(default = "default_snapshot_ancestor_depth")]
    pub snapshot_ancestor_depth: u32,
    #[serde(default = "default_snapshot_descendant_limit")]
    pub snapshot_descendant_limit: usize,

    #[serde(default)]
    pub process_names: Vec<String>,
}

impl ServiceConfig {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }

    pub fn min_uptime_for_crash(&self) -> Duration {
        Duration::from_secs(self.min_uptime_for_crash_secs)
    }

    pub fn snapshot_capture_duration(&self) -> Duration {
        Duration::from_secs_f64(self.snapshot_capture_duration_secs.max(0.0))
    }

    pub fn snapshot_settle_delay(&self) -> Duration {
        Duration::from_secs_f64(self.snapshot_settle_delay_secs.max(0.0))
    }

    #[cfg(test)]
    pub fn minimal(name: &str, command: &str) -> Self {
        Self {
            name: name.to_string(),
            service_type: ServiceType::Executable,
            enabled: true,
            auto_restart: true,
            command: command.to_string(),
            args: Vec::new(),
            workspace: None,
            environment: HashMap::new(),
            startup_delay_secs: 0,
            min_uptime_for_crash_secs: default_min_uptime_for_crash(),
            track_child_processes: false,
            use_unique_profile: false,
            profile_base_dir: None,
            snapshot_capture_duration_secs: default_snapshot_capture_duration(),
            snapshot_settle_delay_secs: default_snapshot_settle_delay(),
            snapshot_ancestor_depth: default_snapshot_ancestor_depth(),
            snapshot_descendant_limit: default_snapshot_descendant_limit(),
            process_names: Vec::new(),
        }
    }
}
