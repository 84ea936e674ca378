//! Single-line LED driver.
//!
//! Generic over any `embedded_hal` output pin: on ESP-IDF this is an
//! `esp_idf_hal::gpio::PinDriver` on [`LED_GPIO`](crate::pins::LED_GPIO),
//! on the host a mock pin.  The line is driven low at construction.

use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::app::ports::ActuatorPort;

pub struct LedDriver<P: OutputPin> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> LedDriver<P> {
    pub fn new(mut pin: P) -> Self {
        if let Err(e) = pin.set_low() {
            warn!("LED: initial set_low failed: {:?}", e);
        }
        Self { pin, on: false }
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }
}

impl<P: OutputPin> ActuatorPort for LedDriver<P> {
    fn set_active(&mut self, on: bool) {
        let result = if on { self.pin.set_high() } else { self.pin.set_low() };
        match result {
            Ok(()) => {
                info!("LED: switched {}", if on { "on" } else { "off" });
                self.on = on;
            }
            Err(e) => warn!("LED: GPIO write failed: {:?}", e),
        }
    }

    fn is_active(&self) -> bool {
        self.on
    }
}
