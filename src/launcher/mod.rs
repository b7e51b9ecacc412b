//! The Launcher adapter: a pure function from `ServiceConfig` to a
//! `LaunchSpec`, one per service type, looked up from a small dispatch
//! table. The supervisor never branches on `ServiceType` itself — it only
//! ever calls [`build`].

pub mod env;
pub mod error;
pub mod executable;
pub mod npm_script;
pub mod powershell_script;
pub mod profile;
pub mod shell_script;

use crate::config::service::{ServiceConfig, ServiceType};
use error::LaunchError;
use std::collections::HashMap;
use std::path::PathBuf;

/// Resolved launch invocation, ready to hand to `std::process::Command`.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: HashMap<String, String>,
    /// The lowercased `--user-data-dir=...` token used to filter this
    /// service's descendants, if unique profiles are enabled.
    pub profile_flag: Option<String>,
    pub profile_dir: Option<PathBuf>,
}

type Strategy = fn(&ServiceConfig) -> Result<LaunchSpec, LaunchError>;

fn dispatch_table() -> HashMap<ServiceType, Strategy> {
    let mut table: HashMap<ServiceType, Strategy> = HashMap::new();
    table.insert(ServiceType::Executable, executable::build as Strategy);
    table.insert(ServiceType::NpmScript, npm_script::build as Strategy);
    table.insert(
        ServiceType::PowershellScript,
        powershell_script::build as Strategy,
    );
    table.insert(ServiceType::ShellScript, shell_script::build as Strategy);
    table
}

/// Builds a [`LaunchSpec`] for the service's configured type. Pure: performs
/// no spawning, only validation and path/argument resolution.
pub fn build(config: &ServiceConfig) -> Result<LaunchSpec, LaunchError> {
    let table = dispatch_table();
    let strategy = table
        .get(&config.service_type)
        .expect("dispatch table covers every ServiceType variant");
    strategy(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_table_covers_every_service_type() {
        let table = dispatch_table();
        assert_eq!(table.len(), 4);
    }
}
