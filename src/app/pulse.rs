//! Single-slot pulse timer.
//!
//! Wraps a [`DeadlineTimer`] so that at most one deadline is ever live.
//! Restarting cancels and releases the previous handle before arming the
//! next one, so a pulse is reset rather than extended.  Every arm gets a
//! fresh [`PulseId`]; the expiry callback reports that id back and
//! [`PulseTimer::expire`] drops reports that belong to a replaced pulse.

use core::time::Duration;
use std::sync::Arc;

use super::ports::{DeadlineTimer, TimerError};

/// Identity of one armed pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PulseId(pub u32);

/// Receives the id of an elapsed pulse (typically posts it to the main
/// task's event queue).  Runs on the timer service's context.
pub type ExpiryNotifier = Arc<dyn Fn(PulseId) + Send + Sync + 'static>;

pub struct PulseTimer<T: DeadlineTimer> {
    timer: T,
    notify: ExpiryNotifier,
    live: Option<(PulseId, T::Handle)>,
    next_id: u32,
}

impl<T: DeadlineTimer> PulseTimer<T> {
    pub fn new(timer: T, notify: ExpiryNotifier) -> Self {
        Self {
            timer,
            notify,
            live: None,
            next_id: 1,
        }
    }

    /// Cancel any live deadline, then arm a new one `after` from now.
    pub fn restart(&mut self, after: Duration) -> Result<PulseId, TimerError> {
        self.cancel();

        let id = PulseId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        let notify = Arc::clone(&self.notify);
        let handle = self.timer.schedule(after, Box::new(move || notify(id)))?;
        self.live = Some((id, handle));
        Ok(id)
    }

    /// Disarm the live deadline, if any.
    pub fn cancel(&mut self) {
        if let Some((_, handle)) = self.live.take() {
            self.timer.cancel(handle);
        }
    }

    /// Consume an expiry report.  Returns `true` if `id` is the live pulse,
    /// whose (now inert) handle is released.
    pub fn expire(&mut self, id: PulseId) -> bool {
        match &self.live {
            Some((live, _)) if *live == id => {
                self.cancel();
                true
            }
            _ => false,
        }
    }

    pub fn live(&self) -> Option<PulseId> {
        self.live.as_ref().map(|(id, _)| *id)
    }

    pub fn is_pending(&self) -> bool {
        self.live.is_some()
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }
}
