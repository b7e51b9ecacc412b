//! Entry point: parses CLI args, loads the catalog, starts one Supervisor
//! per enabled service, and installs a Ctrl-C handler that stops them all in
//! a coordinated shutdown.

use std::process::ExitCode;
use std::sync::Arc;

use watchdogd::cli::Cli;
use watchdogd::config::Catalog;
use watchdogd::crash::CrashRecorder;
use watchdogd::event::sink::event_sink;
use watchdogd::logging;
use watchdogd::process::SysinfoInventory;
use watchdogd::supervisor::{NotStartedSupervisor, SupervisorStarter, SupervisorStopper};

use tracing::{error, info};

fn main() -> ExitCode {
    logging::init();

    let cli = Cli::parse_args();

    let catalog = match Catalog::load(&cli.catalog) {
        Ok(catalog) => catalog,
        Err(err) => {
            error!(error = %err, "failed to load catalog");
            return ExitCode::FAILURE;
        }
    };

    let inventory = Arc::new(SysinfoInventory::new());
    let crash_recorder = Arc::new(CrashRecorder::new(&cli.crash_log));
    let (sink, _consumer) = event_sink();

    let mut started = Vec::new();
    for config in catalog.services() {
        let supervisor = NotStartedSupervisor::new(
            config.clone(),
            inventory.clone(),
            sink.clone(),
            crash_recorder.clone(),
        );
        match supervisor.start() {
            Ok(handle) => started.push(handle),
            Err(err) => error!(service = %config.name, error = %err, "failed to start service"),
        }
    }

    info!(count = started.len(), "services started");

    let (stop_tx, stop_rx) = crossbeam::channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .expect("failed to install signal handler");

    let _ = stop_rx.recv();
    info!("shutdown signal received, stopping services");

    for handle in started {
        if let Err(err) = handle.stop() {
            error!(error = %err, "error stopping service");
        }
    }

    ExitCode::SUCCESS
}
