//! Main-task event queue.
//!
//! Events are produced by:
//! - the MQTT client task (connection state, inbound data, errors)
//! - the esp_timer task (pulse expiry)
//!
//! and consumed by the main task, which owns the session controller and
//! processes them one at a time.  MQTT events share a bounded FIFO and the
//! producer blocks while it is full.  Pulse expiries bypass the FIFO through
//! a latest-value signal, so a backlog of messages never holds the LED on.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ MQTT task   │────▶│  AGENT_EVENTS│────▶│              │
//! │             │     │  (bounded)   │     │  Main task   │
//! │ Timer task  │────▶│ PULSE_EXPIRED│────▶│  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use futures_lite::future;
use log::warn;

use crate::app::events::AgentEvent;
use crate::app::pulse::PulseId;

/// Maximum number of pending MQTT events.
const EVENT_QUEUE_CAP: usize = 16;

static AGENT_EVENTS: Channel<CriticalSectionRawMutex, AgentEvent, EVENT_QUEUE_CAP> = Channel::new();

/// Only the newest expiry matters: an overwritten id belongs to a replaced pulse.
static PULSE_EXPIRED: Signal<CriticalSectionRawMutex, PulseId> = Signal::new();

/// Enqueue an event, blocking the calling task while the queue is full.
pub fn post_event(event: AgentEvent) {
    future::block_on(AGENT_EVENTS.send(event));
}

/// Push an event into the queue without blocking.
/// Returns `false` if the queue is full (event dropped).
pub fn push_event(event: AgentEvent) -> bool {
    match AGENT_EVENTS.try_send(event) {
        Ok(()) => true,
        Err(_) => {
            warn!("events: queue full, dropping event");
            false
        }
    }
}

/// Expiry callback target for the pulse timer.  Never blocks, never drops.
pub fn post_pulse_expired(id: PulseId) {
    PULSE_EXPIRED.signal(id);
}

/// Block the calling task until the next event arrives.  A pending pulse
/// expiry is delivered ahead of queued MQTT events.
pub fn next_event() -> AgentEvent {
    future::block_on(future::or(
        async { AgentEvent::PulseExpired(PULSE_EXPIRED.wait().await) },
        AGENT_EVENTS.receive(),
    ))
}

/// Pop the next event, if any.
pub fn try_next_event() -> Option<AgentEvent> {
    PULSE_EXPIRED
        .try_take()
        .map(AgentEvent::PulseExpired)
        .or_else(|| AGENT_EVENTS.try_receive().ok())
}

/// Drain all pending events into a callback.
pub fn drain_events(mut handler: impl FnMut(AgentEvent)) {
    while let Some(event) = try_next_event() {
        handler(event);
    }
}
