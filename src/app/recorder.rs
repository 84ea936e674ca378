//! Event recorder: persists the timestamp of the latest message.
//!
//! One slot, overwritten on every call.  Each store step is fallible on its
//! own; a failure ends that single `record()` call and is reported in the
//! returned [`RecordOutcome`].  Nothing propagates to the caller.

use core::fmt::Write;

use log::{info, warn};

use super::clock::{now_formatted, Timestamp};
use super::ports::{ClockPort, RecordSession, RecordStorePort, StorageError};

/// Capacity of the persisted record (NVS string slot).
pub const RECORD_CAPACITY: usize = 64;

pub type RecordText = heapless::String<RECORD_CAPACITY>;

/// Store step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStage {
    Compose,
    Open,
    Write,
    Commit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Committed,
    Failed { stage: RecordStage, error: StorageError },
}

/// What a single `record()` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub message: RecordText,
    /// Value found in the slot before overwriting, if it could be read.
    pub previous: Option<RecordText>,
    /// Non-fatal read error (anything other than "absent").
    pub read_error: Option<StorageError>,
    pub status: RecordStatus,
}

impl RecordOutcome {
    pub fn is_committed(&self) -> bool {
        self.status == RecordStatus::Committed
    }
}

pub struct EventRecorder<S: RecordStorePort, C: ClockPort> {
    store: S,
    clock: C,
    namespace: heapless::String<15>,
    key: heapless::String<15>,
    prefix: heapless::String<24>,
}

impl<S: RecordStorePort, C: ClockPort> EventRecorder<S, C> {
    /// Fails with [`StorageError::TooLong`] if a name exceeds its slot.
    pub fn new(
        store: S,
        clock: C,
        namespace: &str,
        key: &str,
        prefix: &str,
    ) -> Result<Self, StorageError> {
        Ok(Self {
            store,
            clock,
            namespace: bounded(namespace)?,
            key: bounded(key)?,
            prefix: bounded(prefix)?,
        })
    }

    /// Stamp the current time into the record slot.
    pub fn record(&mut self) -> RecordOutcome {
        let now = now_formatted(&self.clock);
        let mut outcome = RecordOutcome {
            message: RecordText::new(),
            previous: None,
            read_error: None,
            status: RecordStatus::Committed,
        };

        if compose(&mut outcome.message, &self.prefix, &now).is_err() {
            outcome.status = RecordStatus::Failed {
                stage: RecordStage::Compose,
                error: StorageError::TooLong,
            };
            return outcome;
        }
        info!("Recorder: current message: \"{}\"", outcome.message);

        let mut session = match self.store.open(&self.namespace) {
            Ok(s) => s,
            Err(e) => {
                outcome.status = RecordStatus::Failed { stage: RecordStage::Open, error: e };
                return outcome;
            }
        };

        let mut buf = [0u8; RECORD_CAPACITY];
        match session.get_string(&self.key, &mut buf) {
            Ok(Some(prev)) => {
                info!("Recorder: last saved message: \"{}\"", prev);
                let mut text = RecordText::new();
                let _ = text.push_str(prev);
                outcome.previous = Some(text);
            }
            Ok(None) => info!("Recorder: no previous message"),
            Err(e) => {
                warn!("Recorder: reading previous message failed: {}", e);
                outcome.read_error = Some(e);
            }
        }

        if let Err(e) = session.set_string(&self.key, &outcome.message) {
            outcome.status = RecordStatus::Failed { stage: RecordStage::Write, error: e };
            return outcome;
        }
        if let Err(e) = session.commit() {
            outcome.status = RecordStatus::Failed { stage: RecordStage::Commit, error: e };
            return outcome;
        }
        outcome
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

fn bounded<const N: usize>(s: &str) -> Result<heapless::String<N>, StorageError> {
    heapless::String::try_from(s).map_err(|()| StorageError::TooLong)
}

fn compose(out: &mut RecordText, prefix: &str, now: &Timestamp) -> core::fmt::Result {
    write!(out, "{} {}", prefix, now)
}
