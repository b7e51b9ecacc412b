pub mod recorder;

pub use recorder::{CrashRecord, CrashRecorder, ExitKind};
