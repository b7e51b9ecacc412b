//! `executable` strategy: launch a binary, or on macOS a `.app` bundle,
//! directly — no shell interposed.

use super::error::LaunchError;
use super::{env, profile, LaunchSpec};
use crate::config::service::ServiceConfig;
use std::path::{Path, PathBuf};

pub fn build(config: &ServiceConfig) -> Result<LaunchSpec, LaunchError> {
    if config.command.trim().is_empty() {
        return Err(LaunchError::MissingCommand);
    }
    let command_path = PathBuf::from(&config.command);

    let (program, mut args) = if is_app_bundle(&command_path) {
        resolve_app_bundle(&command_path)?
    } else {
        if !command_path.exists() {
            return Err(LaunchError::CommandNotFound(command_path.clone()));
        }
        ensure_executable(&command_path)?;
        (command_path.clone(), Vec::new())
    };

    args.extend(config.args.iter().cloned());

    let cwd = match &config.workspace {
        Some(workspace) => {
            let path = PathBuf::from(workspace);
            if !path.is_dir() {
                return Err(LaunchError::WorkspaceNotFound(path));
            }
            Some(path)
        }
        None => None,
    };

    let mut profile_flag = None;
    let mut profile_dir = None;
    if config.use_unique_profile && !profile::already_has_profile_flag(&args) {
        let base = config
            .profile_base_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(default_profile_base_dir);
        let derived = profile::derive(&base, &config.name)?;
        args.insert(0, derived.flag_arg);
        profile_flag = Some(derived.profile_flag);
        profile_dir = Some(derived.dir);
    }

    Ok(LaunchSpec {
        program,
        args,
        cwd,
        env: env::resolve(&config.environment),
        profile_flag,
        profile_dir,
    })
}

fn default_profile_base_dir() -> PathBuf {
    dirs_home().join(".watchdogd_launcher").join("profiles")
}

fn dirs_home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn is_app_bundle(path: &Path) -> bool {
    cfg!(target_os = "macos") && path.extension().and_then(|e| e.to_str()) == Some("app")
}

/// Resolves `some.app` to `(open, [-a, some.app, --args])`, matching the
/// original's AppleScript-free `open -a` launch path. Falls back to reading
/// `Contents/Info.plist`'s `CFBundleExecutable`, and then to scanning
/// `Contents/MacOS/` for a single executable, should a caller need the raw
/// binary instead of going through `open`.
fn resolve_app_bundle(bundle: &Path) -> Result<(PathBuf, Vec<String>), LaunchError> {
    if !bundle.is_dir() {
        return Err(LaunchError::CommandNotFound(bundle.to_path_buf()));
    }
    if bundle_executable(bundle).is_none() {
        return Err(LaunchError::AppBundleExecutableNotFound(bundle.to_path_buf()));
    }
    Ok((
        PathBuf::from("open"),
        vec![
            "-a".to_string(),
            bundle.display().to_string(),
            "--args".to_string(),
        ],
    ))
}

/// Returns the bundle's executable path, per `CFBundleExecutable` in
/// `Info.plist` if present, else the sole entry under `Contents/MacOS/`.
fn bundle_executable(bundle: &Path) -> Option<PathBuf> {
    let macos_dir = bundle.join("Contents").join("MacOS");

    if let Some(name) = read_cfbundle_executable(&bundle.join("Contents").join("Info.plist")) {
        let candidate = macos_dir.join(&name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    let mut entries = std::fs::read_dir(&macos_dir).ok()?;
    entries.find_map(|entry| {
        let entry = entry.ok()?;
        let path = entry.path();
        path.is_file().then_some(path)
    })
}

fn read_cfbundle_executable(plist_path: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(plist_path).ok()?;
    let key_pos = contents.find("<key>CFBundleExecutable</key>")?;
    let after_key = &contents[key_pos..];
    let string_start = after_key.find("<string>")? + "<string>".len();
    let string_end = after_key[string_start..].find("</string>")?;
    Some(after_key[string_start..string_start + string_end].to_string())
}

#[cfg(unix)]
fn ensure_executable(path: &Path) -> Result<(), LaunchError> {
    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::metadata(path)
        .map_err(|_| LaunchError::NotExecutable(path.to_path_buf()))?
        .permissions()
        .mode();
    if mode & 0o111 == 0 {
        return Err(LaunchError::NotExecutable(path.to_path_buf()));
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Path) -> Result<(), LaunchError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_command_is_rejected() {
        let mut cfg = ServiceConfig::minimal("svc", "");
        cfg.command = String::new();
        let err = build(&cfg).unwrap_err();
        assert!(matches!(err, LaunchError::MissingCommand));
    }

    #[test]
    fn nonexistent_binary_is_rejected() {
        let cfg = ServiceConfig::minimal("svc", "/no/such/binary-xyz");
        let err = build(&cfg).unwrap_err();
        assert!(matches!(err, LaunchError::CommandNotFound(_)));
    }

    #[test]
    fn existing_binary_builds_a_spec() {
        let cfg = ServiceConfig::minimal("svc", "/bin/sh");
        let spec = build(&cfg).unwrap();
        assert_eq!(spec.program, PathBuf::from("/bin/sh"));
        assert!(spec.profile_flag.is_none());
    }

    #[test]
    fn unique_profile_prepends_flag_and_creates_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = ServiceConfig::minimal("Chrome Profile", "/bin/sh");
        cfg.use_unique_profile = true;
        cfg.profile_base_dir = Some(tmp.path().display().to_string());
        let spec = build(&cfg).unwrap();
        assert!(spec.args[0].starts_with("--user-data-dir="));
        assert!(spec.profile_dir.unwrap().exists());
    }

    #[test]
    fn workspace_must_exist() {
        let mut cfg = ServiceConfig::minimal("svc", "/bin/sh");
        cfg.workspace = Some("/no/such/workspace-xyz".to_string());
        let err = build(&cfg).unwrap_err();
        assert!(matches!(err, LaunchError::WorkspaceNotFound(_)));
    }
}
