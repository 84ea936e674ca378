//! Application core: pure domain logic, zero I/O.
//!
//! Business rules for the agent: network attach supervision, clock
//! anchoring, the MQTT session state machine with its counted trigger, the
//! LED pulse timer, and the NVS event record.  All interaction with the
//! device happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod clock;
pub mod events;
pub mod ports;
pub mod pulse;
pub mod recorder;
pub mod session;
pub mod supervisor;
