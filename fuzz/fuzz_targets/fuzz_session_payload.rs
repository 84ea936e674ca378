//! Fuzz target: `SessionController` event handling
//!
//! Splits the input into a stream of session events (data with arbitrary
//! topic/payload bytes, connects, disconnects, pulse expiries) and checks:
//! - No panics under arbitrary event sequences
//! - The trigger counter stays below the configured count
//! - Exactly one record attempt per data event
//!
//! cargo fuzz run fuzz_session_payload

#![no_main]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use libfuzzer_sys::fuzz_target;

use dudelight::adapters::nvs::NvsRecordStore;
use dudelight::adapters::time::SystemClock;
use dudelight::app::events::{AgentEvent, AgentReport, SessionEvent, TransportErrorKind};
use dudelight::app::ports::{
    ActuatorPort, DeadlineTimer, EventSink, ExpiryFn, LinkError, MessageId, MessagingPort,
    TimerError,
};
use dudelight::app::pulse::{ExpiryNotifier, PulseId, PulseTimer};
use dudelight::app::recorder::EventRecorder;
use dudelight::app::session::{SessionController, TriggerRules};
use dudelight::config::AgentConfig;

// ── In-memory ports for fuzz testing ──────────────────────────

struct NullLink;

impl MessagingPort for NullLink {
    fn subscribe(&mut self, _topic: &str) -> Result<MessageId, LinkError> {
        Ok(1)
    }

    fn publish(&mut self, _topic: &str, _payload: &[u8]) -> Result<MessageId, LinkError> {
        Ok(2)
    }
}

#[derive(Default)]
struct Led(bool);

impl ActuatorPort for Led {
    fn set_active(&mut self, on: bool) {
        self.0 = on;
    }

    fn is_active(&self) -> bool {
        self.0
    }
}

/// Fires every armed callback on the next `flush`.
#[derive(Default)]
struct QueueTimer {
    armed: Vec<(u32, ExpiryFn)>,
    next: u32,
}

impl DeadlineTimer for QueueTimer {
    type Handle = u32;

    fn schedule(&mut self, _after: Duration, on_expiry: ExpiryFn) -> Result<u32, TimerError> {
        self.next = self.next.wrapping_add(1);
        self.armed.push((self.next, on_expiry));
        Ok(self.next)
    }

    fn cancel(&mut self, handle: u32) {
        self.armed.retain(|(h, _)| *h != handle);
    }
}

#[derive(Default)]
struct CountRecords(usize);

impl EventSink for CountRecords {
    fn emit(&mut self, report: &AgentReport) {
        if matches!(report, AgentReport::Recorded(_)) {
            self.0 += 1;
        }
    }
}

fuzz_target!(|data: &[u8]| {
    let cfg = AgentConfig::default();
    let Ok(store) = NvsRecordStore::init() else {
        return;
    };
    let expired: Arc<Mutex<Vec<PulseId>>> = Arc::new(Mutex::new(Vec::new()));
    let target = Arc::clone(&expired);
    let notify: ExpiryNotifier = Arc::new(move |id: PulseId| {
        if let Ok(mut v) = target.lock() {
            v.push(id);
        }
    });
    let Ok(recorder) = EventRecorder::new(
        store,
        SystemClock::new(),
        &cfg.record_namespace,
        &cfg.record_key,
        &cfg.record_prefix,
    ) else {
        return;
    };
    let mut ctl = SessionController::new(
        TriggerRules::from(&cfg),
        Led::default(),
        PulseTimer::new(QueueTimer::default(), notify),
        recorder,
    );
    let mut link = NullLink;
    let mut sink = CountRecords::default();
    ctl.start(&mut sink);

    let mut data_events = 0usize;
    // Frame format: [op][len][bytes..]
    let mut rest = data;
    while let [op, len, tail @ ..] = rest {
        let n = usize::from(*len).min(tail.len());
        let (chunk, next) = tail.split_at(n);
        rest = next;

        let event = match op % 6 {
            0 => {
                data_events += 1;
                AgentEvent::Session(SessionEvent::Data {
                    topic: "/bigLebowski".into(),
                    payload: chunk.to_vec(),
                })
            }
            1 => {
                data_events += 1;
                // Steer a share of inputs onto the trigger phrase.
                AgentEvent::Session(SessionEvent::Data {
                    topic: String::from_utf8_lossy(chunk).into_owned(),
                    payload: cfg.trigger_phrase.as_bytes().to_vec(),
                })
            }
            2 => AgentEvent::Session(SessionEvent::Connected),
            3 => AgentEvent::Session(SessionEvent::Disconnected),
            4 => AgentEvent::Session(SessionEvent::Error {
                kind: TransportErrorKind::Other,
                errno: i32::from(*len),
            }),
            _ => {
                let armed: Vec<(u32, ExpiryFn)> = ctl.pulse_mut().timer_mut().armed.drain(..).collect();
                for (_, cb) in armed {
                    cb();
                }
                let ids: Vec<PulseId> = expired.lock().map(|mut v| v.drain(..).collect()).unwrap_or_default();
                for id in ids {
                    ctl.dispatch(AgentEvent::PulseExpired(id), &mut link, &mut sink);
                }
                continue;
            }
        };
        ctl.dispatch(event, &mut link, &mut sink);

        assert!(ctl.trigger_count() < cfg.trigger_count);
        assert!(ctl.pulse().timer().armed.len() <= 1);
    }

    assert_eq!(sink.0, data_events);
});
