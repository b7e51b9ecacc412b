use super::error::SupervisorError;
use super::stopper::SupervisorStopper;

/// Starting consumes the not-started value and produces something that can
/// only be stopped, never started twice — refusing a second start is
/// enforced by the type system rather than a runtime flag.
pub trait SupervisorStarter {
    type Stopped: SupervisorStopper;

    fn start(self) -> Result<Self::Stopped, SupervisorError>;
}
