//! Dudelight agent: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  WifiStation      SntpClock     NvsRecordStore   MqttLink     │
//! │  (NetworkPort)    (ClockPort)   (RecordStore)    (Messaging)  │
//! │  LedDriver        EspPulseTimer LogEventSink                  │
//! │  (ActuatorPort)   (Deadline)    (EventSink)                   │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────       │
//! │                                                              │
//! │  ConnectivitySupervisor → synchronize → SessionController    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Startup is strictly sequential: logging, NVS, LED, WiFi attach (with
//! bounded retry), SNTP anchoring, then the MQTT session.  From there the
//! main task only drains the event queue into the session controller.
#![deny(unused_must_use)]

use std::sync::Arc;

use anyhow::Result;
use log::{info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use dudelight::adapters::log_sink::{apply_log_levels, LogEventSink};
use dudelight::adapters::mqtt::MqttLink;
use dudelight::adapters::nvs::NvsRecordStore;
use dudelight::adapters::time::SntpClock;
use dudelight::adapters::wifi;
use dudelight::app::clock::{now_formatted, synchronize};
use dudelight::app::events::{AgentReport, AttachOutcome};
use dudelight::app::ports::EventSink;
use dudelight::app::pulse::{ExpiryNotifier, PulseTimer};
use dudelight::app::recorder::EventRecorder;
use dudelight::app::session::{SessionController, TriggerRules};
use dudelight::app::supervisor::{ConnectivitySupervisor, SharedSupervisor};
use dudelight::config::AgentConfig;
use dudelight::drivers::hw_timer::EspPulseTimer;
use dudelight::drivers::led::LedDriver;
use dudelight::error::Error;
use dudelight::{events, pins};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    apply_log_levels();

    info!("[APP] Startup..");
    info!("[APP] Free memory: {} bytes", unsafe { esp_idf_svc::sys::esp_get_free_heap_size() });
    info!("dudelight v{}", env!("CARGO_PKG_VERSION"));

    let cfg = AgentConfig::default();
    if let Err(e) = cfg.validate().map_err(Error::from) {
        warn!("{} (continuing, attach will likely fail)", e);
    }

    // ── 2. Persistent storage ─────────────────────────────────
    let store = NvsRecordStore::init().map_err(Error::from)?;

    // ── 3. LED ────────────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let led = LedDriver::new(PinDriver::output(peripherals.pins.gpio13)?);
    info!("LED: GPIO{} configured as output", pins::LED_GPIO);

    // ── 4. WiFi attach ────────────────────────────────────────
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;
    let supervisor = SharedSupervisor::new(ConnectivitySupervisor::new(cfg.max_attach_retries));
    let _wifi = wifi::start(peripherals.modem, &sysloop, nvs_partition, &cfg, &supervisor)?;

    match supervisor.wait() {
        AttachOutcome::Attached => info!("connected to ap SSID:{}", cfg.wifi_ssid),
        AttachOutcome::Failed => warn!("Failed to connect to SSID:{}", cfg.wifi_ssid),
    }

    // ── 5. Clock ──────────────────────────────────────────────
    let mut sink = LogEventSink::new();
    let mut clock = SntpClock::new();
    let sync = synchronize(
        &mut clock,
        &mut FreeRtos,
        &cfg.sntp_server,
        cfg.sync_poll_interval(),
        cfg.sync_poll_attempts,
    );
    sink.emit(&AgentReport::ClockAnchored {
        synced: sync.is_synced(),
        attempts: sync.attempts(),
        now: now_formatted(&clock),
    });

    // ── 6. Session ────────────────────────────────────────────
    let recorder = EventRecorder::new(
        store,
        clock,
        &cfg.record_namespace,
        &cfg.record_key,
        &cfg.record_prefix,
    )
    .map_err(Error::from)?;
    let notify: ExpiryNotifier = Arc::new(events::post_pulse_expired);
    let timer = EspPulseTimer::new().map_err(Error::from)?;
    let mut controller = SessionController::new(
        TriggerRules::from(&cfg),
        led,
        PulseTimer::new(timer, notify),
        recorder,
    );

    let mut link = MqttLink::connect(&cfg.broker_url)?;
    controller.start(&mut sink);

    // ── 7. Event loop ─────────────────────────────────────────
    loop {
        let event = events::next_event();
        controller.dispatch(event, &mut link, &mut sink);
    }
}
