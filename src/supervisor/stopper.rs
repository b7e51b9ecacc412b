use crate::event::sink::ServiceStatus;
use crate::utils::thread_context::ThreadContextStopperError;

pub trait SupervisorStopper {
    fn stop(self) -> Result<(), ThreadContextStopperError>;
    fn is_alive(&self) -> bool;
    fn status(&self) -> ServiceStatus;
}
