//! Connectivity supervisor: network attach with a bounded retry policy.
//!
//! ```text
//!            InterfaceReady            AddressAcquired
//!   Idle ───────────────────▶ Connecting ───────────────▶ Attached
//!                              │    ▲
//!               AttachLost     │    │ retries < max: retry += 1
//!                              ▼    │
//!                             (retry?) ── retries == max ──▶ Failed
//! ```
//!
//! The state machine itself is pure; [`SharedSupervisor`] puts it behind a
//! mutex for the network event task and raises an [`AttachSignal`] the
//! starting task blocks on.

use std::sync::{Arc, Mutex, PoisonError};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{info, warn};

use super::events::{AgentReport, AttachOutcome, NetEvent};
use super::ports::{EventSink, NetworkPort};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Attached,
    Failed,
}

pub struct ConnectivitySupervisor {
    state: ConnectionState,
    retries: u8,
    max_retries: u8,
    attach_requests: u32,
}

impl ConnectivitySupervisor {
    pub fn new(max_retries: u8) -> Self {
        Self {
            state: ConnectionState::Idle,
            retries: 0,
            max_retries,
            attach_requests: 0,
        }
    }

    /// Feed one network event.  Returns the terminal outcome if this event
    /// produced one.
    pub fn handle(
        &mut self,
        event: NetEvent,
        net: &mut impl NetworkPort,
        sink: &mut impl EventSink,
    ) -> Option<AttachOutcome> {
        match event {
            NetEvent::InterfaceReady => {
                info!("WiFi: interface ready, attaching");
                self.state = ConnectionState::Connecting;
                self.request(net);
                None
            }
            NetEvent::AttachLost => {
                if self.state == ConnectionState::Failed {
                    warn!("WiFi: attach lost after giving up, not retrying");
                    return None;
                }
                if self.retries < self.max_retries {
                    self.retries += 1;
                    self.state = ConnectionState::Connecting;
                    sink.emit(&AgentReport::AttachRetry {
                        attempt: self.retries,
                        max: self.max_retries,
                    });
                    self.request(net);
                    None
                } else {
                    self.state = ConnectionState::Failed;
                    self.finish(AttachOutcome::Failed, sink)
                }
            }
            NetEvent::AddressAcquired([a, b, c, d]) => {
                info!("WiFi: got ip {}.{}.{}.{}", a, b, c, d);
                let retries = self.retries;
                self.retries = 0;
                self.state = ConnectionState::Attached;
                sink.emit(&AgentReport::AttachFinished {
                    outcome: AttachOutcome::Attached,
                    retries,
                });
                Some(AttachOutcome::Attached)
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn retries(&self) -> u8 {
        self.retries
    }

    /// Attach requests issued so far (initial + retries).
    pub fn attach_requests(&self) -> u32 {
        self.attach_requests
    }

    fn request(&mut self, net: &mut impl NetworkPort) {
        self.attach_requests += 1;
        if let Err(e) = net.request_attach() {
            // The driver reports the failure as a disconnect, which
            // re-enters the retry path.
            warn!("WiFi: attach request rejected: {}", e);
        }
    }

    fn finish(&mut self, outcome: AttachOutcome, sink: &mut impl EventSink) -> Option<AttachOutcome> {
        sink.emit(&AgentReport::AttachFinished {
            outcome,
            retries: self.retries,
        });
        Some(outcome)
    }
}

// ───────────────────────────────────────────────────────────────
// Attach signal
// ───────────────────────────────────────────────────────────────

/// One-shot rendezvous between the network event task and the task
/// blocked in [`AttachSignal::wait`].
pub struct AttachSignal {
    inner: Signal<CriticalSectionRawMutex, AttachOutcome>,
}

impl AttachSignal {
    pub const fn new() -> Self {
        Self {
            inner: Signal::new(),
        }
    }

    pub fn raise(&self, outcome: AttachOutcome) {
        self.inner.signal(outcome);
    }

    /// Block the calling task until an outcome is raised.  Whichever
    /// outcome is observed first wins.
    pub fn wait(&self) -> AttachOutcome {
        futures_lite::future::block_on(self.inner.wait())
    }

    pub fn try_take(&self) -> Option<AttachOutcome> {
        self.inner.try_take()
    }
}

impl Default for AttachSignal {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Shared supervisor
// ───────────────────────────────────────────────────────────────

/// Cloneable handle used from event-loop callbacks.
#[derive(Clone)]
pub struct SharedSupervisor {
    inner: Arc<Mutex<ConnectivitySupervisor>>,
    signal: Arc<AttachSignal>,
}

impl SharedSupervisor {
    pub fn new(supervisor: ConnectivitySupervisor) -> Self {
        Self {
            inner: Arc::new(Mutex::new(supervisor)),
            signal: Arc::new(AttachSignal::new()),
        }
    }

    /// Feed `event` under the lock and raise the signal on a terminal outcome.
    pub fn dispatch(&self, event: NetEvent, net: &mut impl NetworkPort, sink: &mut impl EventSink) {
        let outcome = {
            let mut sup = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            sup.handle(event, net, sink)
        };
        if let Some(outcome) = outcome {
            self.signal.raise(outcome);
        }
    }

    /// Blocks until `Attached` or `Failed`.
    pub fn wait(&self) -> AttachOutcome {
        self.signal.wait()
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).state()
    }

    pub fn retries(&self) -> u8 {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).retries()
    }

    pub fn attach_requests(&self) -> u32 {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .attach_requests()
    }
}
