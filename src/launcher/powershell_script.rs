//! `powershell_script` strategy: `powershell -ExecutionPolicy Bypass
//! -File <script> <args...>`.

use super::error::LaunchError;
use super::{env, LaunchSpec};
use crate::config::service::ServiceConfig;
use std::path::PathBuf;

pub fn build(config: &ServiceConfig) -> Result<LaunchSpec, LaunchError> {
    if config.command.trim().is_empty() {
        return Err(LaunchError::MissingCommand);
    }
    let script = PathBuf::from(&config.command);
    if !script.is_file() {
        return Err(LaunchError::CommandNotFound(script));
    }

    let cwd = match &config.workspace {
        Some(workspace) => {
            let path = PathBuf::from(workspace);
            if !path.is_dir() {
                return Err(LaunchError::WorkspaceNotFound(path));
            }
            Some(path)
        }
        // No workspace configured: run from the script's own directory
        // rather than the supervisor's.
        None => script.parent().map(PathBuf::from),
    };

    let mut args = vec![
        "-ExecutionPolicy".to_string(),
        "Bypass".to_string(),
        "-File".to_string(),
        script.display().to_string(),
    ];
    args.extend(config.args.iter().cloned());

    Ok(LaunchSpec {
        program: PathBuf::from("powershell"),
        args,
        cwd,
        env: env::resolve(&config.environment),
        profile_flag: None,
        profile_dir: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_script() {
        let cfg = ServiceConfig::minimal("svc", "/no/such/script.ps1");
        let err = build(&cfg).unwrap_err();
        assert!(matches!(err, LaunchError::CommandNotFound(_)));
    }

    #[test]
    fn builds_the_expected_invocation() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let cfg = ServiceConfig::minimal("svc", tmp.path().to_str().unwrap());
        let spec = build(&cfg).unwrap();
        assert_eq!(spec.program, PathBuf::from("powershell"));
        assert_eq!(spec.args[0], "-ExecutionPolicy");
        assert_eq!(spec.args[2], "-File");
    }

    #[test]
    fn defaults_cwd_to_the_scripts_directory_when_no_workspace_is_set() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let cfg = ServiceConfig::minimal("svc", tmp.path().to_str().unwrap());
        let spec = build(&cfg).unwrap();
        assert_eq!(spec.cwd.as_deref(), tmp.path().parent());
    }
}
