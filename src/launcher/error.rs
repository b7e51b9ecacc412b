use std::path::PathBuf;
use thiserror::Error;

/// A precondition the Launcher validates up front.
/// A `LaunchError` always fails `start()` before anything is spawned.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("command '{0}' does not exist")]
    CommandNotFound(PathBuf),

    #[error("command '{0}' is not executable")]
    NotExecutable(PathBuf),

    #[error("workspace '{0}' does not exist")]
    WorkspaceNotFound(PathBuf),

    #[error("service type requires a non-empty 'command'")]
    MissingCommand,

    #[error("could not resolve an executable inside app bundle '{0}'")]
    AppBundleExecutableNotFound(PathBuf),

    #[error("could not create profile directory '{0}': {1}")]
    ProfileDirUncreatable(PathBuf, std::io::Error),
}
