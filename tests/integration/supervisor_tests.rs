//! Connectivity supervisor integration tests.

use std::thread;
use std::time::Duration;

use dudelight::app::events::{AgentReport, AttachOutcome, NetEvent};
use dudelight::app::supervisor::{ConnectionState, ConnectivitySupervisor, SharedSupervisor};

use crate::mock_hw::{MockNet, RecordingSink};

#[test]
fn five_failures_then_failed_without_sixth_retry() {
    let mut sup = ConnectivitySupervisor::new(5);
    let mut net = MockNet::default();
    let mut sink = RecordingSink::default();

    assert_eq!(sup.handle(NetEvent::InterfaceReady, &mut net, &mut sink), None);
    for _ in 0..5 {
        assert_eq!(sup.handle(NetEvent::AttachLost, &mut net, &mut sink), None);
    }
    assert_eq!(sup.retries(), 5);
    assert_eq!(net.requests, 6);

    let outcome = sup.handle(NetEvent::AttachLost, &mut net, &mut sink);
    assert_eq!(outcome, Some(AttachOutcome::Failed));
    assert_eq!(sup.state(), ConnectionState::Failed);
    assert_eq!(net.requests, 6, "sixth retry must never be issued");

    // Late disconnects after giving up stay silent.
    assert_eq!(sup.handle(NetEvent::AttachLost, &mut net, &mut sink), None);
    assert_eq!(net.requests, 6);

    let retries: Vec<u8> = sink
        .reports
        .iter()
        .filter_map(|r| match r {
            AgentReport::AttachRetry { attempt, .. } => Some(*attempt),
            _ => None,
        })
        .collect();
    assert_eq!(retries, vec![1, 2, 3, 4, 5]);
}

#[test]
fn address_resets_retries_after_any_number_of_failures() {
    for failures in 0..=5u8 {
        let mut sup = ConnectivitySupervisor::new(5);
        let mut net = MockNet::default();
        let mut sink = RecordingSink::default();
        sup.handle(NetEvent::InterfaceReady, &mut net, &mut sink);
        for _ in 0..failures {
            sup.handle(NetEvent::AttachLost, &mut net, &mut sink);
        }
        let outcome = sup.handle(NetEvent::AddressAcquired([192, 168, 1, 7]), &mut net, &mut sink);
        assert_eq!(outcome, Some(AttachOutcome::Attached));
        assert_eq!(sup.retries(), 0);
        assert_eq!(sup.state(), ConnectionState::Attached);
        assert!(sink.reports.contains(&AgentReport::AttachFinished {
            outcome: AttachOutcome::Attached,
            retries: failures,
        }));
    }
}

#[test]
fn disconnect_after_attach_retries_with_fresh_budget() {
    let mut sup = ConnectivitySupervisor::new(5);
    let mut net = MockNet::default();
    let mut sink = RecordingSink::default();
    sup.handle(NetEvent::InterfaceReady, &mut net, &mut sink);
    sup.handle(NetEvent::AttachLost, &mut net, &mut sink);
    sup.handle(NetEvent::AttachLost, &mut net, &mut sink);
    sup.handle(NetEvent::AddressAcquired([10, 0, 0, 2]), &mut net, &mut sink);

    sup.handle(NetEvent::AttachLost, &mut net, &mut sink);
    assert_eq!(sup.retries(), 1);
    assert_eq!(sup.state(), ConnectionState::Connecting);
}

#[test]
fn rejected_attach_request_is_not_fatal() {
    let mut sup = ConnectivitySupervisor::new(5);
    let mut net = MockNet {
        reject: true,
        ..Default::default()
    };
    let mut sink = RecordingSink::default();
    sup.handle(NetEvent::InterfaceReady, &mut net, &mut sink);
    assert_eq!(sup.state(), ConnectionState::Connecting);
    assert_eq!(sup.attach_requests(), 1);
}

#[test]
fn shared_supervisor_wakes_waiter_from_event_thread() {
    let shared = SharedSupervisor::new(ConnectivitySupervisor::new(5));
    let events = shared.clone();

    let driver = thread::spawn(move || {
        let mut net = MockNet::default();
        let mut sink = RecordingSink::default();
        events.dispatch(NetEvent::InterfaceReady, &mut net, &mut sink);
        thread::sleep(Duration::from_millis(20));
        events.dispatch(NetEvent::AttachLost, &mut net, &mut sink);
        events.dispatch(NetEvent::AddressAcquired([192, 168, 4, 2]), &mut net, &mut sink);
        net.requests
    });

    assert_eq!(shared.wait(), AttachOutcome::Attached);
    assert_eq!(driver.join().unwrap(), 2);
    assert_eq!(shared.state(), ConnectionState::Attached);
    assert_eq!(shared.retries(), 0);
}

#[test]
fn shared_supervisor_reports_failure() {
    let shared = SharedSupervisor::new(ConnectivitySupervisor::new(5));
    let events = shared.clone();

    let driver = thread::spawn(move || {
        let mut net = MockNet::default();
        let mut sink = RecordingSink::default();
        events.dispatch(NetEvent::InterfaceReady, &mut net, &mut sink);
        for _ in 0..6 {
            events.dispatch(NetEvent::AttachLost, &mut net, &mut sink);
        }
    });

    assert_eq!(shared.wait(), AttachOutcome::Failed);
    driver.join().unwrap();
    assert_eq!(shared.attach_requests(), 6);
}
