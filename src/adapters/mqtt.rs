//! MQTT client adapter.
//!
//! Implements [`MessagingPort`] on `EspMqttClient`.  The client runs its own
//! task; its callback translates every event into a [`SessionEvent`] and
//! posts it to the main task's queue, waiting for room when it is full.
//! Publishing and subscribing happen on the main task through [`MqttLink`].
//!
//! Only built for `target_os = "espidf"`.

use log::{debug, info};

use esp_idf_svc::mqtt::client::{Details, EspMqttClient, EventPayload, MqttClientConfiguration, QoS};
use esp_idf_svc::sys::EspError;

use crate::app::events::{AgentEvent, SessionEvent, TransportErrorKind};
use crate::app::ports::{LinkError, MessageId, MessagingPort};
use crate::events::post_event;

pub struct MqttLink {
    client: EspMqttClient<'static>,
}

impl MqttLink {
    /// Create the client and let it connect in the background.
    pub fn connect(broker_url: &str) -> Result<Self, EspError> {
        let client = EspMqttClient::new_cb(broker_url, &MqttClientConfiguration::default(), |event| {
            if let Some(ev) = translate(event.payload()) {
                post_event(AgentEvent::Session(ev));
            }
        })?;
        info!("MQTT: client started for {}", broker_url);
        Ok(Self { client })
    }
}

fn translate(payload: EventPayload<'_, EspError>) -> Option<SessionEvent> {
    let event = match payload {
        EventPayload::BeforeConnect => SessionEvent::BeforeConnect,
        EventPayload::Connected(_) => SessionEvent::Connected,
        EventPayload::Disconnected => SessionEvent::Disconnected,
        EventPayload::Subscribed(id) => SessionEvent::Subscribed(id),
        EventPayload::Unsubscribed(id) => SessionEvent::Unsubscribed(id),
        EventPayload::Published(id) => SessionEvent::Published(id),
        EventPayload::Received { topic, data, details, .. } => {
            if !matches!(details, Details::Complete) {
                debug!("MQTT: chunked delivery {:?}, len={}", details, data.len());
            }
            SessionEvent::Data {
                topic: topic.unwrap_or_default().to_owned(),
                payload: data.to_vec(),
            }
        }
        EventPayload::Error(e) => SessionEvent::Error {
            kind: TransportErrorKind::Transport,
            errno: e.code(),
        },
        _ => {
            debug!("MQTT: other event");
            return None;
        }
    };
    Some(event)
}

impl MessagingPort for MqttLink {
    fn subscribe(&mut self, topic: &str) -> Result<MessageId, LinkError> {
        self.client
            .subscribe(topic, QoS::AtMostOnce)
            .map_err(|e| LinkError::Driver(e.code()))
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<MessageId, LinkError> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .map_err(|e| LinkError::Driver(e.code()))
    }
}
