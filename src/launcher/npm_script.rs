//! `npm_script` strategy: runs `command` through the platform shell with
//! `cwd` set to the workspace.

use super::error::LaunchError;
use super::{env, LaunchSpec};
use crate::config::service::ServiceConfig;
use std::path::PathBuf;

pub fn build(config: &ServiceConfig) -> Result<LaunchSpec, LaunchError> {
    if config.command.trim().is_empty() {
        return Err(LaunchError::MissingCommand);
    }

    let workspace = config
        .workspace
        .as_ref()
        .ok_or_else(|| LaunchError::WorkspaceNotFound(PathBuf::new()))?;
    let cwd = PathBuf::from(workspace);
    if !cwd.is_dir() {
        return Err(LaunchError::WorkspaceNotFound(cwd));
    }

    let (program, mut shell_args) = shell_invocation();
    shell_args.push(config.command.clone());

    let mut args = shell_args;
    args.extend(config.args.iter().cloned());

    Ok(LaunchSpec {
        program,
        args,
        cwd: Some(cwd),
        env: env::resolve(&config.environment),
        profile_flag: None,
        profile_dir: None,
    })
}

#[cfg(target_os = "windows")]
fn shell_invocation() -> (PathBuf, Vec<String>) {
    (PathBuf::from("cmd"), vec!["/C".to_string()])
}

#[cfg(not(target_os = "windows"))]
fn shell_invocation() -> (PathBuf, Vec<String>) {
    (PathBuf::from("/bin/sh"), vec!["-c".to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_a_workspace() {
        let mut cfg = ServiceConfig::minimal("svc", "npm run dev");
        cfg.workspace = None;
        let err = build(&cfg).unwrap_err();
        assert!(matches!(err, LaunchError::WorkspaceNotFound(_)));
    }

    #[test]
    fn shells_out_the_command_in_the_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = ServiceConfig::minimal("svc", "npm run dev");
        cfg.workspace = Some(tmp.path().display().to_string());
        let spec = build(&cfg).unwrap();
        assert_eq!(spec.cwd.unwrap(), tmp.path());
        assert!(spec.args.contains(&"npm run dev".to_string()));
    }
}
