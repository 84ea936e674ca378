//! GPIO assignments for the agent board.
//!
//! Single source of truth: drivers reference this module rather than
//! hard-coding pin numbers.

/// Digital output driving the (big) LED.  HIGH = on.
pub const LED_GPIO: i32 = 13;
