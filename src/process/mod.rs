//! Process inventory, descendant discovery, and group termination.

pub mod discovery;
pub mod inventory;
pub mod terminator;

pub use inventory::{Pid, ProcInfo, ProcessInventory, SysinfoInventory};
