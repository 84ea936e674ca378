//! Actuator drivers and timer services.

pub mod hw_timer;
pub mod led;
