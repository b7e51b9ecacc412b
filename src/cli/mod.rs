//! CLI front door: this binary's one real input is the catalog path.
//! Verbosity is handled via `RUST_LOG`, not a flag.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Local process supervisor for a catalog of services", long_about = None)]
pub struct Cli {
    /// Path to the JSON service catalog.
    #[arg(long, short)]
    pub catalog: PathBuf,

    /// Directory the crash-record stream is appended to.
    #[arg(long, default_value = "watchdogd-crashes.log")]
    pub crash_log: PathBuf,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
