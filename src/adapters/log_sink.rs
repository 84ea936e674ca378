//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured agent reports to the
//! ESP-IDF logger (UART / USB-CDC in production, stderr on the host).

use log::{info, warn};

use crate::app::events::{AgentReport, AttachOutcome};
use crate::app::ports::EventSink;
use crate::app::recorder::RecordStatus;

/// Adapter that logs every [`AgentReport`] to the serial console.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, report: &AgentReport) {
        match report {
            AgentReport::AttachFinished { outcome: AttachOutcome::Attached, retries } => {
                info!("WIFI  | attached after {} retries", retries);
            }
            AgentReport::AttachFinished { outcome: AttachOutcome::Failed, retries } => {
                warn!("WIFI  | attach failed after {} retries", retries);
            }
            AgentReport::AttachRetry { attempt, max } => {
                info!("WIFI  | retry {}/{}", attempt, max);
            }
            AgentReport::ClockAnchored { synced, attempts, now } => {
                info!(
                    "CLOCK | synced={} polls={} | The current date/time is: {}",
                    synced, attempts, now
                );
            }
            AgentReport::SessionState { from, to } => {
                info!("MQTT  | {:?} -> {:?}", from, to);
            }
            AgentReport::SubscribeSent(id) => info!("MQTT  | subscribe sent, msg_id={}", id),
            AgentReport::ReplySent(id) => info!("MQTT  | reply sent, msg_id={}", id),
            AgentReport::LinkFailed { op, error } => warn!("MQTT  | {} failed: {}", op, error),
            AgentReport::TransportError { kind, errno } => {
                warn!("MQTT  | transport error {:?} errno={}", kind, errno);
            }
            AgentReport::TriggerCounted { count, of } => info!("TRIG  | {}/{}", count, of),
            AgentReport::PulseStarted(id) => info!("PULSE | {:?} started", id),
            AgentReport::PulseEnded(id) => info!("PULSE | {:?} ended", id),
            AgentReport::PulseFailed(e) => warn!("PULSE | timer failed: {}", e),
            AgentReport::Recorded(outcome) => match outcome.status {
                RecordStatus::Committed => info!("NVS   | saved \"{}\"", outcome.message),
                RecordStatus::Failed { stage, error } => {
                    warn!("NVS   | {:?} failed: {}", stage, error);
                }
            },
        }
    }
}

/// Tags of the messaging and transport stacks raised to verbose.
#[cfg(target_os = "espidf")]
const VERBOSE_TAGS: [&core::ffi::CStr; 6] = [
    c"mqtt_client",
    c"dudelight",
    c"TRANSPORT_BASE",
    c"esp-tls",
    c"TRANSPORT",
    c"outbox",
];

/// Global INFO level, verbose for the MQTT and transport components.
#[cfg(target_os = "espidf")]
pub fn apply_log_levels() {
    use esp_idf_svc::sys::{esp_log_level_set, esp_log_level_t_ESP_LOG_INFO, esp_log_level_t_ESP_LOG_VERBOSE};

    // SAFETY: tags are 'static NUL-terminated strings.
    unsafe {
        esp_log_level_set(c"*".as_ptr(), esp_log_level_t_ESP_LOG_INFO);
        for tag in VERBOSE_TAGS {
            esp_log_level_set(tag.as_ptr(), esp_log_level_t_ESP_LOG_VERBOSE);
        }
    }
}
