//! Wall-clock adapter.
//!
//! - **`target_os = "espidf"`**: [`SntpClock`] wraps `EspSntp` in polling
//!   mode.  Time is read back through `SystemTime`, which newlib backs with
//!   the SNTP-adjusted RTC.
//! - **`not(target_os = "espidf")`**: [`SystemClock`] reports the host
//!   clock as already synchronized.

use crate::app::ports::{ClockPort, LinkError};

fn system_epoch_secs() -> i64 {
    match std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
        Err(e) => -i64::try_from(e.duration().as_secs()).unwrap_or(i64::MAX),
    }
}

#[cfg(target_os = "espidf")]
pub use esp::SntpClock;

#[cfg(target_os = "espidf")]
mod esp {
    use super::*;
    use esp_idf_svc::sntp::{EspSntp, SntpConf, SyncStatus};
    use log::{info, warn};

    /// SNTP client started once by [`ClockPort::begin_sync`].
    #[derive(Default)]
    pub struct SntpClock {
        sntp: Option<EspSntp<'static>>,
    }

    impl SntpClock {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl ClockPort for SntpClock {
        fn begin_sync(&mut self, server: &str) -> Result<(), LinkError> {
            if self.sntp.is_some() {
                warn!("SNTP: already running");
                return Ok(());
            }
            let mut conf = SntpConf::default();
            conf.servers[0] = server;
            let sntp = EspSntp::new(&conf).map_err(|e| LinkError::Driver(e.code()))?;
            info!("SNTP: polling '{}'", server);
            self.sntp = Some(sntp);
            Ok(())
        }

        fn is_synced(&self) -> bool {
            self.sntp
                .as_ref()
                .is_some_and(|s| s.get_sync_status() == SyncStatus::Completed)
        }

        fn now_epoch_secs(&self) -> i64 {
            system_epoch_secs()
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub use sim::SystemClock;

#[cfg(not(target_os = "espidf"))]
mod sim {
    use super::*;

    /// Host clock; always synchronized.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct SystemClock;

    impl SystemClock {
        pub fn new() -> Self {
            Self
        }
    }

    impl ClockPort for SystemClock {
        fn begin_sync(&mut self, _server: &str) -> Result<(), LinkError> {
            Ok(())
        }

        fn is_synced(&self) -> bool {
            true
        }

        fn now_epoch_secs(&self) -> i64 {
            system_epoch_secs()
        }
    }

}
