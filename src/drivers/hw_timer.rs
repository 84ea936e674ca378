//! One-shot deadline timers.
//!
//! - **`target_os = "espidf"`**: [`EspPulseTimer`] arms `esp_timer`
//!   instances through `EspTaskTimerService`.  Callbacks execute in the ESP
//!   timer task context (not ISR), so they can safely post to the event
//!   queue.
//! - **all other targets**: [`ThreadTimer`] parks a helper thread until the
//!   deadline, for host-side simulation and tests.

use core::time::Duration;

use crate::app::ports::{DeadlineTimer, ExpiryFn, TimerError};

// ───────────────────────────────────────────────────────────────
// ESP-IDF
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp::EspPulseTimer;

#[cfg(target_os = "espidf")]
mod esp {
    use super::*;
    use esp_idf_svc::timer::{EspTaskTimerService, EspTimer};
    use log::{info, warn};

    pub struct EspPulseTimer {
        service: EspTaskTimerService,
    }

    impl EspPulseTimer {
        pub fn new() -> Result<Self, TimerError> {
            let service = EspTaskTimerService::new().map_err(|e| TimerError::CreateFailed(e.code()))?;
            info!("hw_timer: task timer service ready");
            Ok(Self { service })
        }
    }

    impl DeadlineTimer for EspPulseTimer {
        type Handle = EspTimer<'static>;

        fn schedule(&mut self, after: Duration, on_expiry: ExpiryFn) -> Result<Self::Handle, TimerError> {
            let mut once = Some(on_expiry);
            let timer = self
                .service
                .timer(move || {
                    if let Some(cb) = once.take() {
                        cb();
                    }
                })
                .map_err(|e| TimerError::CreateFailed(e.code()))?;
            timer.after(after).map_err(|e| TimerError::StartFailed(e.code()))?;
            Ok(timer)
        }

        fn cancel(&mut self, handle: Self::Handle) {
            // Stopping an already-fired one-shot returns Ok(false).
            if let Err(e) = handle.cancel() {
                warn!("hw_timer: cancel failed (rc={})", e.code());
            }
            // Dropping the handle deletes the esp_timer.
            drop(handle);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Host simulation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub use sim::{ThreadHandle, ThreadTimer};

#[cfg(not(target_os = "espidf"))]
mod sim {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU8, Ordering};
    use std::thread::{self, Thread};
    use std::time::Instant;

    const ARMED: u8 = 0;
    const FIRED: u8 = 1;
    const CANCELED: u8 = 2;

    /// Thread-per-deadline timer.
    #[derive(Default)]
    pub struct ThreadTimer;

    impl ThreadTimer {
        pub fn new() -> Self {
            Self
        }
    }

    pub struct ThreadHandle {
        state: Arc<AtomicU8>,
        worker: Thread,
    }

    impl ThreadHandle {
        pub fn has_fired(&self) -> bool {
            self.state.load(Ordering::Acquire) == FIRED
        }
    }

    impl DeadlineTimer for ThreadTimer {
        type Handle = ThreadHandle;

        fn schedule(&mut self, after: Duration, on_expiry: ExpiryFn) -> Result<ThreadHandle, TimerError> {
            let state = Arc::new(AtomicU8::new(ARMED));
            let worker_state = Arc::clone(&state);
            let deadline = Instant::now() + after;

            let join = thread::Builder::new()
                .name("pulse-timer".into())
                .spawn(move || {
                    loop {
                        if worker_state.load(Ordering::Acquire) == CANCELED {
                            return;
                        }
                        let now = Instant::now();
                        if now >= deadline {
                            break;
                        }
                        thread::park_timeout(deadline - now);
                    }
                    if worker_state
                        .compare_exchange(ARMED, FIRED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        on_expiry();
                    }
                })
                .map_err(|_| TimerError::CreateFailed(0))?;

            Ok(ThreadHandle {
                state,
                worker: join.thread().clone(),
            })
        }

        fn cancel(&mut self, handle: ThreadHandle) {
            // Losing the race to FIRED leaves the state untouched.
            let _ = handle.state.compare_exchange(ARMED, CANCELED, Ordering::AcqRel, Ordering::Acquire);
            handle.worker.unpark();
        }
    }

}
