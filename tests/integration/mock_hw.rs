//! Mock adapters for integration tests.
//!
//! Every mock records the calls it receives so tests can assert on the
//! full history without touching real WiFi, MQTT, NVS or GPIO.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dudelight::app::events::AgentReport;
use dudelight::app::ports::{
    ActuatorPort, ClockPort, DeadlineTimer, EventSink, ExpiryFn, LinkError, MessageId,
    MessagingPort, NetworkPort, RecordSession, RecordStorePort, StorageError, TimerError,
};
use dudelight::app::events::{AgentEvent, SessionEvent};
use dudelight::app::pulse::{ExpiryNotifier, PulseId, PulseTimer};
use dudelight::app::recorder::EventRecorder;
use dudelight::app::session::{SessionController, TriggerRules};
use dudelight::config::AgentConfig;

// ── Network ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockNet {
    pub requests: u32,
    pub reject: bool,
}

impl NetworkPort for MockNet {
    fn request_attach(&mut self) -> Result<(), LinkError> {
        self.requests += 1;
        if self.reject {
            Err(LinkError::Driver(-1))
        } else {
            Ok(())
        }
    }
}

// ── Messaging ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockLink {
    pub subscriptions: Vec<String>,
    pub published: Vec<(String, Vec<u8>)>,
    pub fail_subscribe: bool,
    pub fail_publish: bool,
    next_id: MessageId,
}

#[allow(dead_code)]
impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replies(&self) -> usize {
        self.published.len()
    }
}

impl MessagingPort for MockLink {
    fn subscribe(&mut self, topic: &str) -> Result<MessageId, LinkError> {
        if self.fail_subscribe {
            return Err(LinkError::NotConnected);
        }
        self.subscriptions.push(topic.to_owned());
        self.next_id += 1;
        Ok(self.next_id)
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<MessageId, LinkError> {
        if self.fail_publish {
            return Err(LinkError::NotConnected);
        }
        self.published.push((topic.to_owned(), payload.to_vec()));
        self.next_id += 1;
        Ok(self.next_id)
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Clock that becomes synced after `sync_after` polls of `is_synced`.
pub struct MockClock {
    pub now: i64,
    pub sync_after: Option<u32>,
    pub fail_begin: bool,
    pub begun: Vec<String>,
    polls: Cell<u32>,
}

#[allow(dead_code)]
impl MockClock {
    pub fn at(now: i64) -> Self {
        Self {
            now,
            sync_after: Some(0),
            fail_begin: false,
            begun: Vec::new(),
            polls: Cell::new(0),
        }
    }

    pub fn never_syncs() -> Self {
        Self {
            sync_after: None,
            ..Self::at(0)
        }
    }

    pub fn polls(&self) -> u32 {
        self.polls.get()
    }
}

impl ClockPort for MockClock {
    fn begin_sync(&mut self, server: &str) -> Result<(), LinkError> {
        if self.fail_begin {
            return Err(LinkError::Driver(-1));
        }
        self.begun.push(server.to_owned());
        Ok(())
    }

    fn is_synced(&self) -> bool {
        let n = self.polls.get();
        self.polls.set(n + 1);
        self.sync_after.is_some_and(|after| n >= after)
    }

    fn now_epoch_secs(&self) -> i64 {
        self.now
    }
}

// ── Record store ──────────────────────────────────────────────

/// In-memory store with per-step failure injection.
#[derive(Default)]
pub struct MockStore {
    pub slots: HashMap<(String, String), String>,
    pub fail_open: Option<StorageError>,
    pub fail_get: Option<StorageError>,
    pub fail_set: Option<StorageError>,
    pub fail_commit: Option<StorageError>,
    pub opens: u32,
    pub closes: u32,
    pub commits: u32,
}

#[allow(dead_code)]
impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self, namespace: &str, key: &str) -> Option<&str> {
        self.slots
            .get(&(namespace.to_owned(), key.to_owned()))
            .map(String::as_str)
    }
}

pub struct MockSession<'a> {
    store: &'a mut MockStore,
    namespace: String,
    staged: Option<String>,
    key: String,
}

impl Drop for MockSession<'_> {
    fn drop(&mut self) {
        self.store.closes += 1;
    }
}

impl RecordStorePort for MockStore {
    type Session<'a> = MockSession<'a>;

    fn open(&mut self, namespace: &str) -> Result<MockSession<'_>, StorageError> {
        if let Some(e) = self.fail_open {
            return Err(e);
        }
        self.opens += 1;
        Ok(MockSession {
            store: self,
            namespace: namespace.to_owned(),
            staged: None,
            key: String::new(),
        })
    }
}

impl RecordSession for MockSession<'_> {
    fn get_string<'b>(&mut self, key: &str, buf: &'b mut [u8]) -> Result<Option<&'b str>, StorageError> {
        if let Some(e) = self.store.fail_get {
            return Err(e);
        }
        match self.store.slots.get(&(self.namespace.clone(), key.to_owned())) {
            Some(v) if v.len() < buf.len() => {
                buf[..v.len()].copy_from_slice(v.as_bytes());
                Ok(std::str::from_utf8(&buf[..v.len()]).ok())
            }
            Some(_) => Err(StorageError::TooLong),
            None => Ok(None),
        }
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(e) = self.store.fail_set {
            return Err(e);
        }
        self.key = key.to_owned();
        self.staged = Some(value.to_owned());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        if let Some(e) = self.store.fail_commit {
            return Err(e);
        }
        if let Some(v) = self.staged.take() {
            let k = (self.namespace.clone(), self.key.clone());
            self.store.slots.insert(k, v);
        }
        self.store.commits += 1;
        Ok(())
    }
}

// ── LED ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockLed {
    pub history: Vec<bool>,
    on: bool,
}

impl MockLed {
    /// Number of off→on transitions.
    #[allow(dead_code)]
    pub fn pulses(&self) -> usize {
        self.history.iter().filter(|&&on| on).count()
    }
}

impl ActuatorPort for MockLed {
    fn set_active(&mut self, on: bool) {
        self.history.push(on);
        self.on = on;
    }

    fn is_active(&self) -> bool {
        self.on
    }
}

// ── Virtual-time deadline timer ───────────────────────────────

struct Armed {
    handle: u32,
    deadline: Duration,
    on_expiry: ExpiryFn,
}

/// Deadlines fire only when the test advances virtual time.
#[derive(Default)]
pub struct MockTimer {
    now: Duration,
    armed: Vec<Armed>,
    next_handle: u32,
    pub scheduled: u32,
    pub canceled: u32,
    pub fail_schedule: bool,
}

#[allow(dead_code)]
impl MockTimer {
    /// Advance virtual time and run every expired callback in deadline order.
    pub fn advance(&mut self, by: Duration) {
        self.now += by;
        let now = self.now;
        let mut due: Vec<Armed> = Vec::new();
        let mut i = 0;
        while i < self.armed.len() {
            if self.armed[i].deadline <= now {
                due.push(self.armed.remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by_key(|a| a.deadline);
        for a in due {
            (a.on_expiry)();
        }
    }

    pub fn armed(&self) -> usize {
        self.armed.len()
    }
}

impl DeadlineTimer for MockTimer {
    type Handle = u32;

    fn schedule(&mut self, after: Duration, on_expiry: ExpiryFn) -> Result<u32, TimerError> {
        if self.fail_schedule {
            return Err(TimerError::StartFailed(-1));
        }
        self.next_handle += 1;
        self.scheduled += 1;
        self.armed.push(Armed {
            handle: self.next_handle,
            deadline: self.now + after,
            on_expiry,
        });
        Ok(self.next_handle)
    }

    fn cancel(&mut self, handle: u32) {
        self.canceled += 1;
        self.armed.retain(|a| a.handle != handle);
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub reports: Vec<AgentReport>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, report: &AgentReport) {
        self.reports.push(report.clone());
    }
}

// ── Harness ───────────────────────────────────────────────────

pub type TestController = SessionController<MockLed, MockTimer, MockStore, MockClock>;

/// Controller wired to mocks plus the list its pulse expiries land in.
pub struct Harness {
    pub ctl: TestController,
    pub link: MockLink,
    pub sink: RecordingSink,
    pub expired: Arc<Mutex<Vec<PulseId>>>,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        Self::with_config(&AgentConfig::default())
    }

    pub fn with_config(cfg: &AgentConfig) -> Self {
        let expired = Arc::new(Mutex::new(Vec::new()));
        let sink_list = Arc::clone(&expired);
        let notify: ExpiryNotifier = Arc::new(move |id: PulseId| sink_list.lock().unwrap().push(id));
        let recorder = EventRecorder::new(
            MockStore::new(),
            MockClock::at(0),
            &cfg.record_namespace,
            &cfg.record_key,
            &cfg.record_prefix,
        )
        .unwrap();
        let ctl = SessionController::new(
            TriggerRules::from(cfg),
            MockLed::default(),
            PulseTimer::new(MockTimer::default(), notify),
            recorder,
        );
        Self {
            ctl,
            link: MockLink::new(),
            sink: RecordingSink::default(),
            expired,
        }
    }

    /// Bring the session to `Subscribed`.
    pub fn subscribed() -> Self {
        let mut h = Self::new();
        h.ctl.start(&mut h.sink);
        h.event(SessionEvent::Connected);
        h.event(SessionEvent::Subscribed(1));
        h
    }

    pub fn event(&mut self, ev: SessionEvent) {
        self.ctl.handle(ev, &mut self.link, &mut self.sink);
    }

    pub fn message(&mut self, topic: &str, payload: &[u8]) {
        self.event(SessionEvent::Data {
            topic: topic.to_owned(),
            payload: payload.to_vec(),
        });
    }

    pub fn trigger(&mut self) {
        self.message("/bigLebowski", b"who are you man ?");
    }

    /// Advance the pulse timer and feed every expiry back to the controller.
    pub fn advance(&mut self, by: Duration) {
        self.ctl.pulse_mut().timer_mut().advance(by);
        let ids: Vec<PulseId> = self.expired.lock().unwrap().drain(..).collect();
        for id in ids {
            self.ctl.dispatch(
                AgentEvent::PulseExpired(id),
                &mut self.link,
                &mut self.sink,
            );
        }
    }

    pub fn led_on(&self) -> bool {
        self.ctl.led().is_active()
    }

    pub fn stored(&self) -> Option<&str> {
        self.ctl.recorder().store().value("storage", "dude_date")
    }
}
