//! The event sink is the supervisor's only outward-facing surface.
//!
//! It carries two independent channels — human-readable log lines and service
//! status transitions — to whatever is consuming them (a GUI, a test harness,
//! or nothing at all). Publishing is built on the unbounded `crossbeam` channel
//! used throughout the crate so the supervisor never blocks on a slow reader;
//! an uninterested consumer simply lets the channel grow.

use crate::event::channel::{pub_sub, EventConsumer, EventPublisher};
use std::fmt;
use std::time::SystemTime;

/// Lifecycle states reported for a service, per spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceStatus {
    Starting,
    Running,
    Stopped,
    Error,
    Disabled,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceStatus::Starting => "starting",
            ServiceStatus::Running => "running",
            ServiceStatus::Stopped => "stopped",
            ServiceStatus::Error => "error",
            ServiceStatus::Disabled => "disabled",
        };
        f.write_str(s)
    }
}

/// A single, timestamped log line destined for the event sink.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub at: SystemTime,
    pub level: LogLevel,
    pub service: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// A status transition for one named service.
#[derive(Debug, Clone)]
pub struct StatusTransition {
    pub service: String,
    pub status: ServiceStatus,
}

enum SinkEvent {
    Log(LogLine),
    Status(StatusTransition),
}

/// Non-blocking push handle shared by every supervisor that reports to the
/// same sink. Cloning is cheap (it clones the underlying channel senders).
#[derive(Clone)]
pub struct EventSink {
    publisher: EventPublisher<SinkEvent>,
}

/// The read side of an [`EventSink`], held by whatever is consuming events
/// (a GUI, a test harness).
pub struct EventSinkConsumer {
    consumer: EventConsumer<SinkEvent>,
}

/// Builds a connected sink/consumer pair.
pub fn event_sink() -> (EventSink, EventSinkConsumer) {
    let (publisher, consumer) = pub_sub();
    (EventSink { publisher }, EventSinkConsumer { consumer })
}

impl EventSink {
    pub fn log(&self, service: &str, level: LogLevel, message: impl Into<String>) {
        // `try_publish`/`publish` on an unbounded channel never blocks; a
        // disconnected consumer (dropped `EventSinkConsumer`) just drops the event.
        let _ = self.publisher.publish(SinkEvent::Log(LogLine {
            at: SystemTime::now(),
            level,
            service: service.to_string(),
            message: message.into(),
        }));
    }

    pub fn status(&self, service: &str, status: ServiceStatus) {
        let _ = self.publisher.publish(SinkEvent::Status(StatusTransition {
            service: service.to_string(),
            status,
        }));
    }
}

/// One item drained from the consumer side: either a log line or a status transition.
pub enum SinkMessage {
    Log(LogLine),
    Status(StatusTransition),
}

impl EventSinkConsumer {
    /// Drains everything currently buffered without blocking.
    pub fn drain(&self) -> Vec<SinkMessage> {
        let mut out = Vec::new();
        while let Ok(event) = self.consumer.as_ref().try_recv() {
            out.push(match event {
                SinkEvent::Log(l) => SinkMessage::Log(l),
                SinkEvent::Status(s) => SinkMessage::Status(s),
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publishes_log_and_status() {
        let (sink, consumer) = event_sink();
        sink.log("svc", LogLevel::Info, "starting service");
        sink.status("svc", ServiceStatus::Starting);

        let drained = consumer.drain();
        assert_eq!(drained.len(), 2);
        match &drained[0] {
            SinkMessage::Log(l) => assert_eq!(l.message, "starting service"),
            _ => panic!("expected log"),
        }
        match &drained[1] {
            SinkMessage::Status(s) => assert_eq!(s.status, ServiceStatus::Starting),
            _ => panic!("expected status"),
        }
    }
}
