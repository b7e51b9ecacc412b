pub mod error;
pub mod starter;
pub mod state;
pub mod stopper;
pub mod supervisor;

pub use error::SupervisorError;
pub use starter::SupervisorStarter;
pub use stopper::SupervisorStopper;
pub use supervisor::{NotStartedSupervisor, StartedSupervisor};
