//! Session controller: the messaging state machine and counted trigger.
//!
//! ```text
//!  SessionEvent ──▶ ┌──────────────────────────┐ ──▶ MessagingPort (reply)
//!                   │    SessionController     │ ──▶ ActuatorPort (LED)
//!  PulseExpired ──▶ │ state · counter · pulse  │ ──▶ EventRecorder (NVS)
//!                   └──────────────────────────┘ ──▶ EventSink
//! ```
//!
//! The controller is the only writer of its state.  Events from the MQTT
//! task and the timer task reach it through the main task's queue.

use log::{debug, info};

use crate::config::AgentConfig;

use super::events::{AgentEvent, AgentReport, SessionEvent};
use super::ports::{ActuatorPort, ClockPort, DeadlineTimer, EventSink, MessagingPort, RecordStorePort};
use super::pulse::{PulseId, PulseTimer};
use super::recorder::EventRecorder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    SubscribePending,
    Subscribed,
}

/// Fixed trigger parameters, copied out of [`AgentConfig`].
#[derive(Debug, Clone)]
pub struct TriggerRules {
    pub topic: heapless::String<64>,
    pub phrase: heapless::String<64>,
    pub reply: heapless::String<64>,
    pub every: u8,
    pub pulse: core::time::Duration,
}

impl From<&AgentConfig> for TriggerRules {
    fn from(cfg: &AgentConfig) -> Self {
        Self {
            topic: cfg.topic.clone(),
            phrase: cfg.trigger_phrase.clone(),
            reply: cfg.reply_payload.clone(),
            every: cfg.trigger_count.max(1),
            pulse: cfg.pulse_duration(),
        }
    }
}

pub struct SessionController<A, T, S, C>
where
    A: ActuatorPort,
    T: DeadlineTimer,
    S: RecordStorePort,
    C: ClockPort,
{
    rules: TriggerRules,
    state: SessionState,
    /// Qualifying messages since the last pulse, in `0..rules.every`.
    trigger_count: u8,
    led: A,
    pulse: PulseTimer<T>,
    recorder: EventRecorder<S, C>,
}

impl<A, T, S, C> SessionController<A, T, S, C>
where
    A: ActuatorPort,
    T: DeadlineTimer,
    S: RecordStorePort,
    C: ClockPort,
{
    pub fn new(
        rules: TriggerRules,
        led: A,
        pulse: PulseTimer<T>,
        recorder: EventRecorder<S, C>,
    ) -> Self {
        Self {
            rules,
            state: SessionState::Disconnected,
            trigger_count: 0,
            led,
            pulse,
            recorder,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// The transport has been started and will connect on its own.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.transition(SessionState::Connecting, sink);
    }

    // ── Event entry point ─────────────────────────────────────

    /// Single entry point for everything on the main task's queue.
    pub fn dispatch(
        &mut self,
        event: AgentEvent,
        link: &mut impl MessagingPort,
        sink: &mut impl EventSink,
    ) {
        match event {
            AgentEvent::Session(ev) => self.handle(ev, link, sink),
            AgentEvent::PulseExpired(id) => self.on_pulse_expired(id, sink),
        }
    }

    pub fn handle(
        &mut self,
        event: SessionEvent,
        link: &mut impl MessagingPort,
        sink: &mut impl EventSink,
    ) {
        match event {
            SessionEvent::BeforeConnect => {
                debug!("MQTT: before connect");
                self.transition(SessionState::Connecting, sink);
            }
            SessionEvent::Connected => {
                self.transition(SessionState::Connected, sink);
                match link.subscribe(&self.rules.topic) {
                    Ok(id) => {
                        sink.emit(&AgentReport::SubscribeSent(id));
                        self.transition(SessionState::SubscribePending, sink);
                    }
                    Err(error) => sink.emit(&AgentReport::LinkFailed { op: "subscribe", error }),
                }
            }
            SessionEvent::Subscribed(id) => {
                debug!("MQTT: subscribed, msg_id={}", id);
                self.transition(SessionState::Subscribed, sink);
            }
            SessionEvent::Unsubscribed(id) => info!("MQTT: unsubscribed, msg_id={}", id),
            SessionEvent::Published(id) => info!("MQTT: published, msg_id={}", id),
            SessionEvent::Disconnected => self.transition(SessionState::Disconnected, sink),
            SessionEvent::Data { topic, payload } => {
                self.on_message(&topic, &payload, link, sink);
            }
            SessionEvent::Error { kind, errno } => {
                sink.emit(&AgentReport::TransportError { kind, errno });
            }
        }
    }

    // ── Message handling ──────────────────────────────────────

    fn on_message(
        &mut self,
        topic: &str,
        payload: &[u8],
        link: &mut impl MessagingPort,
        sink: &mut impl EventSink,
    ) {
        info!(
            "MQTT: data topic='{}' len={} payload='{}'",
            topic,
            payload.len(),
            String::from_utf8_lossy(payload)
        );

        if payload == self.rules.phrase.as_bytes() {
            self.on_trigger(link, sink);
        }

        // Every inbound message is recorded, matching or not.
        let outcome = self.recorder.record();
        sink.emit(&AgentReport::Recorded(outcome));
    }

    fn on_trigger(&mut self, link: &mut impl MessagingPort, sink: &mut impl EventSink) {
        match link.publish(&self.rules.topic, self.rules.reply.as_bytes()) {
            Ok(id) => sink.emit(&AgentReport::ReplySent(id)),
            Err(error) => sink.emit(&AgentReport::LinkFailed { op: "publish", error }),
        }

        self.trigger_count += 1;
        sink.emit(&AgentReport::TriggerCounted {
            count: self.trigger_count,
            of: self.rules.every,
        });

        if self.trigger_count >= self.rules.every {
            self.start_pulse(sink);
            self.trigger_count = 0;
        }
    }

    // ── Pulse ─────────────────────────────────────────────────

    fn start_pulse(&mut self, sink: &mut impl EventSink) {
        self.led.set_active(true);
        match self.pulse.restart(self.rules.pulse) {
            Ok(id) => sink.emit(&AgentReport::PulseStarted(id)),
            // LED stays on until the next pulse.
            Err(e) => sink.emit(&AgentReport::PulseFailed(e)),
        }
    }

    /// Timer-task report that pulse `id` elapsed.
    pub fn on_pulse_expired(&mut self, id: PulseId, sink: &mut impl EventSink) {
        if self.pulse.expire(id) {
            self.led.set_active(false);
            sink.emit(&AgentReport::PulseEnded(id));
        } else {
            debug!("Pulse: ignoring stale expiry {:?}", id);
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn trigger_count(&self) -> u8 {
        self.trigger_count
    }

    pub fn led(&self) -> &A {
        &self.led
    }

    pub fn pulse(&self) -> &PulseTimer<T> {
        &self.pulse
    }

    pub fn pulse_mut(&mut self) -> &mut PulseTimer<T> {
        &mut self.pulse
    }

    pub fn recorder(&self) -> &EventRecorder<S, C> {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut EventRecorder<S, C> {
        &mut self.recorder
    }

    // ── Internal ──────────────────────────────────────────────

    fn transition(&mut self, to: SessionState, sink: &mut impl EventSink) {
        let from = self.state;
        if from != to {
            self.state = to;
            sink.emit(&AgentReport::SessionState { from, to });
        }
    }
}
