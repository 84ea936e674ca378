//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements         | Connects to                    |
//! |------------|--------------------|--------------------------------|
//! | `log_sink` | EventSink          | Serial log output              |
//! | `mqtt`     | MessagingPort      | ESP-IDF MQTT client (espidf)   |
//! | `nvs`      | RecordStorePort    | NVS / in-memory store          |
//! | `time`     | ClockPort          | SNTP / host system clock       |
//! | `wifi`     | NetworkPort        | ESP-IDF WiFi STA (espidf)      |

pub mod log_sink;
#[cfg(target_os = "espidf")]
pub mod mqtt;
pub mod nvs;
pub mod time;
#[cfg(target_os = "espidf")]
pub mod wifi;
