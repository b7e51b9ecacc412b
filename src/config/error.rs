use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading the JSON catalog. Per-service field validation
/// (unknown type, missing command, non-existent workspace) is the Launcher
/// adapter's concern (`LaunchError`) and surfaces once a supervisor tries to
/// start that service, not at catalog-load time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read catalog file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse catalog file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
