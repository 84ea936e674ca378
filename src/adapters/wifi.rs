//! WiFi station-mode adapter.
//!
//! Implements [`NetworkPort`] and bridges the system event loop into the
//! [`SharedSupervisor`]:
//!
//! | System event                 | Domain event                 |
//! |------------------------------|------------------------------|
//! | `WifiEvent::StaStarted`      | `NetEvent::InterfaceReady`   |
//! | `WifiEvent::StaDisconnected` | `NetEvent::AttachLost`       |
//! | `IpEvent::DhcpIpAssigned`    | `NetEvent::AddressAcquired`  |
//!
//! Only built for `target_os = "espidf"`; host tests drive the supervisor
//! with a mock [`NetworkPort`].

use anyhow::{anyhow, Result};
use log::info;

use esp_idf_svc::eventloop::{EspSubscription, EspSystemEventLoop, System};
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::netif::IpEvent;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::{esp, esp_wifi_connect};
use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi, WifiEvent};

use crate::adapters::log_sink::LogEventSink;
use crate::app::events::NetEvent;
use crate::app::ports::{LinkError, NetworkPort};
use crate::app::supervisor::SharedSupervisor;
use crate::config::AgentConfig;

/// Handle on the running station interface.
pub struct EspStation;

impl NetworkPort for EspStation {
    fn request_attach(&mut self) -> Result<(), LinkError> {
        // SAFETY: called from the system event task after the driver started.
        esp!(unsafe { esp_wifi_connect() }).map_err(|e| LinkError::Driver(e.code()))
    }
}

/// Owns the driver and the event subscriptions; dropping it stops WiFi.
pub struct WifiStation {
    _wifi: EspWifi<'static>,
    _wifi_events: EspSubscription<'static, System>,
    _ip_events: EspSubscription<'static, System>,
}

/// Configure WPA2-PSK station mode, subscribe the supervisor to the
/// system event loop, and start the driver.  Returns as soon as the driver
/// is started; the attach outcome arrives through [`SharedSupervisor::wait`].
pub fn start(
    modem: Modem,
    sysloop: &EspSystemEventLoop,
    nvs: EspDefaultNvsPartition,
    cfg: &AgentConfig,
    supervisor: &SharedSupervisor,
) -> Result<WifiStation> {
    let mut wifi = EspWifi::new(modem, sysloop.clone(), Some(nvs))?;

    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: cfg
            .wifi_ssid
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("SSID too long"))?,
        password: cfg
            .wifi_password
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("password too long"))?,
        auth_method: AuthMethod::WPA2Personal,
        ..Default::default()
    }))?;

    let sup = supervisor.clone();
    let wifi_events = sysloop.subscribe::<WifiEvent, _>(move |event| {
        let net_event = match event {
            WifiEvent::StaStarted => NetEvent::InterfaceReady,
            WifiEvent::StaDisconnected(_) => NetEvent::AttachLost,
            _ => return,
        };
        sup.dispatch(net_event, &mut EspStation, &mut LogEventSink);
    })?;

    let sup = supervisor.clone();
    let ip_events = sysloop.subscribe::<IpEvent, _>(move |event| {
        if let IpEvent::DhcpIpAssigned(assignment) = event {
            let ip = assignment.ip().octets();
            sup.dispatch(NetEvent::AddressAcquired(ip), &mut EspStation, &mut LogEventSink);
        }
    })?;

    wifi.start()?;
    info!("WiFi: station started, SSID '{}'", cfg.wifi_ssid);

    Ok(WifiStation {
        _wifi: wifi,
        _wifi_events: wifi_events,
        _ip_events: ip_events,
    })
}
