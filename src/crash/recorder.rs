//! Crash recorder: a short notice to the event sink plus a full multi-line
//! block appended to a crash-record stream.

use crate::config::service::ServiceType;
use crate::event::sink::{EventSink, LogLevel};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub enum ExitKind {
    Code(i32),
    Killed,
}

impl fmt::Display for ExitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitKind::Code(code) => write!(f, "{code}"),
            ExitKind::Killed => write!(f, "Process killed"),
        }
    }
}

pub struct CrashRecord<'a> {
    pub service_name: &'a str,
    pub service_type: ServiceType,
    pub pid: Option<u32>,
    pub exit: ExitKind,
    pub uptime: Duration,
    pub started_at: SystemTime,
    pub command: &'a str,
    pub crash_number: u64,
}

/// Appends crash records to a single text stream and pushes a one-line
/// notice to the [`EventSink`].
pub struct CrashRecorder {
    path: PathBuf,
}

impl CrashRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn record(&self, sink: &EventSink, record: &CrashRecord) {
        sink.log(
            record.service_name,
            LogLevel::Error,
            format!(
                "CRASH DETECTED! (Crash #{}) - Auto-restarting...",
                record.crash_number
            ),
        );

        if let Err(err) = self.append(record) {
            warn!(
                service = %record.service_name,
                error = %err,
                "failed to write crash record"
            );
        }
    }

    fn append(&self, record: &CrashRecord) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let block = render(record);
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(block.as_bytes())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn render(record: &CrashRecord) -> String {
    let delimiter = "=".repeat(80);
    let pid_field = record
        .pid
        .map(|pid| pid.to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    format!(
        "\n{delimiter}\nCRASH EVENT #{number}\n{delimiter}\nTimestamp:     {timestamp}\nService:       {service}\nType:          {service_type}\nPID:           {pid}\nExit Code:     {exit}\nUptime:        {uptime}\nStarted At:    {started_at}\nCommand:       {command}\n{delimiter}\n",
        number = record.crash_number,
        timestamp = format_time(SystemTime::now()),
        service = record.service_name,
        service_type = type_name(record.service_type),
        pid = pid_field,
        exit = record.exit,
        uptime = format_duration(record.uptime),
        started_at = format_time(record.started_at),
        command = record.command,
    )
}

fn type_name(service_type: ServiceType) -> &'static str {
    match service_type {
        ServiceType::Executable => "executable",
        ServiceType::NpmScript => "npm_script",
        ServiceType::PowershellScript => "powershell_script",
        ServiceType::ShellScript => "shell_script",
    }
}

fn format_duration(uptime: Duration) -> String {
    let total_secs = uptime.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}

fn format_time(time: SystemTime) -> String {
    let secs = time
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    humantime_like(secs)
}

/// Minimal `%Y-%m-%d %H:%M:%S` UTC formatter, avoiding a chrono dependency
/// nothing else in the crate needs.
fn humantime_like(epoch_secs: u64) -> String {
    const SECONDS_PER_DAY: u64 = 86_400;
    let days_since_epoch = epoch_secs / SECONDS_PER_DAY;
    let secs_of_day = epoch_secs % SECONDS_PER_DAY;

    let (year, month, day) = civil_from_days(days_since_epoch as i64);
    let hour = secs_of_day / 3600;
    let minute = (secs_of_day % 3600) / 60;
    let second = secs_of_day % 60;
    format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}")
}

/// Howard Hinnant's civil-from-days algorithm, proleptic Gregorian calendar.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}
