//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Supervisor / SessionController (domain)
//! ```
//!
//! Driven adapters (WiFi, MQTT, SNTP, NVS, GPIO, esp_timer) implement these
//! traits.  The domain consumes them via generics, so the core never touches
//! ESP-IDF directly and every flow is testable with mocks.

use core::time::Duration;

use crate::app::events::AgentReport;

pub use crate::error::{LinkError, StorageError, TimerError};

// ───────────────────────────────────────────────────────────────
// Network attach port (domain → WiFi station)
// ───────────────────────────────────────────────────────────────

pub trait NetworkPort {
    /// Ask the station to (re)associate.  Completion arrives later as a
    /// [`NetEvent`](super::events::NetEvent).
    fn request_attach(&mut self) -> Result<(), LinkError>;
}

// ───────────────────────────────────────────────────────────────
// Messaging port (domain → MQTT client)
// ───────────────────────────────────────────────────────────────

/// Broker-assigned message id, used for log correlation only.
pub type MessageId = u32;

/// QoS 0, no retain, fire-and-forget from the domain's point of view.
pub trait MessagingPort {
    fn subscribe(&mut self, topic: &str) -> Result<MessageId, LinkError>;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<MessageId, LinkError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port (domain ↔ SNTP / RTC)
// ───────────────────────────────────────────────────────────────

pub trait ClockPort {
    /// Start background synchronization against `server`.
    fn begin_sync(&mut self, server: &str) -> Result<(), LinkError>;

    /// Whether wall-clock time has been set by the sync service.
    fn is_synced(&self) -> bool;

    /// Seconds since the Unix epoch.  Unspecified (usually near zero) when
    /// the clock was never synchronized.
    fn now_epoch_secs(&self) -> i64;
}

// ───────────────────────────────────────────────────────────────
// Record store port (domain ↔ NVS)
// ───────────────────────────────────────────────────────────────

/// Opens namespaced sessions on the persistent store.
pub trait RecordStorePort {
    type Session<'a>: RecordSession
    where
        Self: 'a;

    /// Open `namespace` read-write.  The returned session closes on drop.
    fn open(&mut self, namespace: &str) -> Result<Self::Session<'_>, StorageError>;
}

/// An open read-write handle on one namespace.
pub trait RecordSession {
    /// Read a string value into `buf`.  `Ok(None)` if the key is absent.
    fn get_string<'b>(
        &mut self,
        key: &str,
        buf: &'b mut [u8],
    ) -> Result<Option<&'b str>, StorageError>;

    fn set_string(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Flush pending writes to flash.
    fn commit(&mut self) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (domain → GPIO)
// ───────────────────────────────────────────────────────────────

pub trait ActuatorPort {
    /// Drive the output line high (`true`) or low.
    fn set_active(&mut self, on: bool);

    fn is_active(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Deadline timer port (domain → esp_timer)
// ───────────────────────────────────────────────────────────────

/// Callback run exactly once when a scheduled deadline elapses.
pub type ExpiryFn = Box<dyn FnOnce() + Send + 'static>;

/// Single-shot, cancelable timer service.
pub trait DeadlineTimer {
    type Handle;

    /// Arm a new one-shot timer.  `on_expiry` runs on the timer service's
    /// own context, at most once.
    fn schedule(&mut self, after: Duration, on_expiry: ExpiryFn)
    -> Result<Self::Handle, TimerError>;

    /// Disarm and release `handle`.  A no-op if it already fired.
    fn cancel(&mut self, handle: Self::Handle);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AgentReport`]s through this port.
pub trait EventSink {
    fn emit(&mut self, report: &AgentReport);
}
