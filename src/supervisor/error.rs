use crate::launcher::error::LaunchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("service is disabled")]
    Disabled,

    #[error("launch configuration invalid: {0}")]
    ConfigInvalid(#[from] LaunchError),
}
