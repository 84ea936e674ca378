//! Event recorder and clock anchoring against mock store / clock.

use std::time::Duration;

use dudelight::adapters::nvs::NvsRecordStore;
use dudelight::app::clock::{synchronize, SyncOutcome};
use dudelight::app::ports::StorageError;
use dudelight::app::recorder::{EventRecorder, RecordStage, RecordStatus};
use embedded_hal::delay::DelayNs;

use crate::mock_hw::{MockClock, MockStore};

fn recorder(store: MockStore, now: i64) -> EventRecorder<MockStore, MockClock> {
    EventRecorder::new(store, MockClock::at(now), "storage", "dude_date", "The dude abided on").unwrap()
}

// ── Recorder ──────────────────────────────────────────────────

#[test]
fn first_record_has_no_previous() {
    let mut r = recorder(MockStore::new(), 0);
    let out = r.record();
    assert!(out.is_committed());
    assert_eq!(out.previous, None);
    assert_eq!(out.message.as_str(), "The dude abided on Thu Jan  1 00:00:00 1970");
}

#[test]
fn second_record_reads_back_previous() {
    let mut r = recorder(MockStore::new(), 0);
    r.record();
    r.clock_mut().now = 1_000_000_000;
    let out = r.record();
    assert_eq!(
        out.previous.as_deref(),
        Some("The dude abided on Thu Jan  1 00:00:00 1970")
    );
    assert_eq!(
        r.store().value("storage", "dude_date"),
        Some("The dude abided on Sun Sep  9 01:46:40 2001")
    );
}

#[test]
fn open_failure_stops_before_write() {
    let store = MockStore {
        fail_open: Some(StorageError::Io(-2)),
        ..Default::default()
    };
    let mut r = recorder(store, 0);
    let out = r.record();
    assert_eq!(
        out.status,
        RecordStatus::Failed {
            stage: RecordStage::Open,
            error: StorageError::Io(-2)
        }
    );
    assert_eq!(r.store().commits, 0);
    assert_eq!(r.store().closes, 0);
}

#[test]
fn read_error_is_not_fatal() {
    let store = MockStore {
        fail_get: Some(StorageError::Io(-3)),
        ..Default::default()
    };
    let mut r = recorder(store, 0);
    let out = r.record();
    assert!(out.is_committed());
    assert_eq!(out.read_error, Some(StorageError::Io(-3)));
    assert_eq!(r.store().commits, 1);
}

#[test]
fn write_failure_skips_commit_and_closes() {
    let store = MockStore {
        fail_set: Some(StorageError::Io(-4)),
        ..Default::default()
    };
    let mut r = recorder(store, 0);
    let out = r.record();
    assert_eq!(
        out.status,
        RecordStatus::Failed {
            stage: RecordStage::Write,
            error: StorageError::Io(-4)
        }
    );
    assert_eq!(r.store().commits, 0);
    assert_eq!(r.store().closes, 1);
    assert_eq!(r.store().value("storage", "dude_date"), None);
}

#[test]
fn commit_failure_closes_handle() {
    let store = MockStore {
        fail_commit: Some(StorageError::Io(-5)),
        ..Default::default()
    };
    let mut r = recorder(store, 0);
    let out = r.record();
    assert!(!out.is_committed());
    assert_eq!(r.store().closes, 1);
}

#[test]
fn failure_is_isolated_to_one_call() {
    let store = MockStore {
        fail_commit: Some(StorageError::Io(-5)),
        ..Default::default()
    };
    let mut r = recorder(store, 0);
    assert!(!r.record().is_committed());
    r.store_mut().fail_commit = None;
    assert!(r.record().is_committed());
}

#[test]
fn simulated_nvs_round_trip() {
    let nvs = NvsRecordStore::init().unwrap();
    let mut r = EventRecorder::new(
        nvs,
        MockClock::at(0),
        "storage",
        "dude_date",
        "The dude abided on",
    )
    .unwrap();
    assert!(r.record().is_committed());
    let out = r.record();
    assert_eq!(
        out.previous.as_deref(),
        Some("The dude abided on Thu Jan  1 00:00:00 1970")
    );
    assert_eq!(
        r.store().committed("storage", "dude_date"),
        Some("The dude abided on Thu Jan  1 00:00:00 1970")
    );
}

#[test]
fn oversized_names_are_rejected() {
    let long_ns = EventRecorder::new(
        MockStore::new(),
        MockClock::at(0),
        "storage_namespace",
        "dude_date",
        "The dude abided on",
    );
    assert!(matches!(long_ns, Err(StorageError::TooLong)));

    let long_prefix = EventRecorder::new(
        MockStore::new(),
        MockClock::at(0),
        "storage",
        "dude_date",
        "The dude abided on a long rug",
    );
    assert!(matches!(long_prefix, Err(StorageError::TooLong)));

    // 15 bytes exactly still fits.
    let r = EventRecorder::new(MockStore::new(), MockClock::at(0), "abcdefghijklmno", "k", "p");
    assert!(r.is_ok());
}

// ── Clock anchoring ───────────────────────────────────────────

#[derive(Default)]
struct VirtualDelay {
    elapsed_ms: u64,
}

impl DelayNs for VirtualDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ms += u64::from(ns) / 1_000_000;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ms += u64::from(ms);
    }
}

#[test]
fn sync_gives_up_after_fifteen_polls() {
    let mut clock = MockClock::never_syncs();
    let mut delay = VirtualDelay::default();
    let out = synchronize(&mut clock, &mut delay, "pool.ntp.org", Duration::from_millis(2000), 15);
    assert_eq!(out, SyncOutcome::GaveUp { attempts: 15 });
    assert_eq!(delay.elapsed_ms, 30_000);
    assert_eq!(clock.begun, vec!["pool.ntp.org".to_string()]);
}

#[test]
fn sync_stops_polling_once_set() {
    let mut clock = MockClock::at(1_700_000_000);
    clock.sync_after = Some(3);
    let mut delay = VirtualDelay::default();
    let out = synchronize(&mut clock, &mut delay, "pool.ntp.org", Duration::from_millis(2000), 15);
    assert_eq!(out, SyncOutcome::Synced { attempts: 3 });
    assert_eq!(delay.elapsed_ms, 6_000);
}

#[test]
fn sync_start_failure_proceeds_unsynced() {
    let mut clock = MockClock::at(0);
    clock.fail_begin = true;
    let mut delay = VirtualDelay::default();
    let out = synchronize(&mut clock, &mut delay, "pool.ntp.org", Duration::from_millis(2000), 15);
    assert!(!out.is_synced());
    assert_eq!(delay.elapsed_ms, 0);
}
