//! Inbound events and outbound reports.
//!
//! Event sources (WiFi driver, MQTT client, pulse timer) translate their
//! callbacks into the typed events below and deliver them to the owning
//! controller.  The controllers emit [`AgentReport`]s through the
//! [`EventSink`](super::ports::EventSink) port.

use crate::app::clock::Timestamp;
use crate::app::pulse::PulseId;
use crate::app::recorder::RecordOutcome;
use crate::app::ports::{LinkError, MessageId, TimerError};

/// Network-stack signals consumed by the
/// [`ConnectivitySupervisor`](super::supervisor::ConnectivitySupervisor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetEvent {
    /// The station interface is up and ready to associate.
    InterfaceReady,
    /// Association was lost or could not be established.
    AttachLost,
    /// DHCP handed out an address.
    AddressAcquired([u8; 4]),
}

/// Terminal outcome of the initial attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    Attached,
    Failed,
}

/// Class of a messaging transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// TCP/TLS socket failure; `errno` is meaningful.
    Transport,
    /// Broker refused the connection.
    ConnectionRefused,
    Other,
}

/// Messaging-channel events consumed by the
/// [`SessionController`](super::session::SessionController).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    BeforeConnect,
    Connected,
    Disconnected,
    Subscribed(MessageId),
    Unsubscribed(MessageId),
    Published(MessageId),
    /// Inbound message.  `payload` holds exactly the declared length.
    Data { topic: String, payload: Vec<u8> },
    Error { kind: TransportErrorKind, errno: i32 },
}

/// Everything the main task's event queue can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    Session(SessionEvent),
    /// A pulse timer elapsed.  Stale ids are ignored by the controller.
    PulseExpired(PulseId),
}

/// Structured reports emitted by the domain core.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentReport {
    /// Supervisor reached a terminal attach outcome.
    AttachFinished { outcome: AttachOutcome, retries: u8 },
    /// An attach retry was issued.
    AttachRetry { attempt: u8, max: u8 },
    /// Wall clock anchored (or given up on).
    ClockAnchored { synced: bool, attempts: u8, now: Timestamp },
    SessionState { from: super::session::SessionState, to: super::session::SessionState },
    SubscribeSent(MessageId),
    ReplySent(MessageId),
    LinkFailed { op: &'static str, error: LinkError },
    TransportError { kind: TransportErrorKind, errno: i32 },
    /// A qualifying message was counted.
    TriggerCounted { count: u8, of: u8 },
    PulseStarted(PulseId),
    PulseEnded(PulseId),
    PulseFailed(TimerError),
    Recorded(RecordOutcome),
}
