//! Agent configuration parameters
//!
//! Every tunable for the agent lives here.  There is no runtime command
//! surface: values are fixed at build time (WiFi credentials come from the
//! `DUDE_WIFI_SSID` / `DUDE_WIFI_PASSWORD` environment variables).

use core::fmt;
use core::time::Duration;

use serde::{Deserialize, Serialize};

/// WiFi SSID baked in at build time.
pub const WIFI_SSID: &str = match option_env!("DUDE_WIFI_SSID") {
    Some(s) => s,
    None => "",
};

/// WiFi passphrase baked in at build time.
pub const WIFI_PASSWORD: &str = match option_env!("DUDE_WIFI_PASSWORD") {
    Some(s) => s,
    None => "",
};

/// Public broker, no account needed.
pub const BROKER_URL: &str = "mqtt://public.mqtthq.com";
pub const TRIGGER_TOPIC: &str = "/bigLebowski";
pub const TRIGGER_PHRASE: &str = "who are you man ?";
pub const REPLY_PAYLOAD: &str = "I'm The Dude";
pub const SNTP_SERVER: &str = "pool.ntp.org";
pub const RECORD_NAMESPACE: &str = "storage";
pub const RECORD_KEY: &str = "dude_date";
pub const RECORD_PREFIX: &str = "The dude abided on";

/// Core agent configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    // --- Network ---
    pub wifi_ssid: heapless::String<32>,
    pub wifi_password: heapless::String<64>,
    /// Disconnects tolerated before the attach is declared failed.
    pub max_attach_retries: u8,

    // --- Time ---
    pub sntp_server: heapless::String<64>,
    /// Sub-interval between "is synchronized" polls (milliseconds)
    pub sync_poll_interval_ms: u32,
    /// Maximum number of polls before giving up on time sync
    pub sync_poll_attempts: u8,

    // --- Messaging ---
    pub broker_url: heapless::String<64>,
    pub topic: heapless::String<64>,
    pub trigger_phrase: heapless::String<64>,
    pub reply_payload: heapless::String<64>,

    // --- Trigger / actuator ---
    /// Qualifying messages per LED pulse
    pub trigger_count: u8,
    /// LED on-time per pulse (milliseconds)
    pub pulse_duration_ms: u32,

    // --- Persistence ---
    pub record_namespace: heapless::String<15>,
    pub record_key: heapless::String<15>,
    pub record_prefix: heapless::String<24>,
}

impl AgentConfig {
    pub fn pulse_duration(&self) -> Duration {
        Duration::from_millis(u64::from(self.pulse_duration_ms))
    }

    pub fn sync_poll_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.sync_poll_interval_ms))
    }

    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_ssid(&self.wifi_ssid)?;
        validate_password(&self.wifi_password)?;
        if self.max_attach_retries == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_attach_retries must be at least 1",
            ));
        }
        if self.sync_poll_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "sync_poll_attempts must be at least 1",
            ));
        }
        if !(100..=60_000).contains(&self.sync_poll_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "sync_poll_interval_ms must be 100–60000",
            ));
        }
        if self.trigger_count == 0 {
            return Err(ConfigError::ValidationFailed(
                "trigger_count must be at least 1",
            ));
        }
        if !(1..=60_000).contains(&self.pulse_duration_ms) {
            return Err(ConfigError::ValidationFailed(
                "pulse_duration_ms must be 1–60000",
            ));
        }
        if self.trigger_phrase.is_empty() {
            return Err(ConfigError::ValidationFailed("trigger_phrase must not be empty"));
        }
        if self.topic.is_empty() {
            return Err(ConfigError::ValidationFailed("topic must not be empty"));
        }
        if self.broker_url.is_empty() {
            return Err(ConfigError::ValidationFailed("broker_url must not be empty"));
        }
        if self.record_namespace.is_empty() || self.record_key.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "record_namespace and record_key must not be empty",
            ));
        }
        Ok(())
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            // Network
            wifi_ssid: fixed(WIFI_SSID),
            wifi_password: fixed(WIFI_PASSWORD),
            max_attach_retries: 5,

            // Time
            sntp_server: fixed(SNTP_SERVER),
            sync_poll_interval_ms: 2000,
            sync_poll_attempts: 15,

            // Messaging
            broker_url: fixed(BROKER_URL),
            topic: fixed(TRIGGER_TOPIC),
            trigger_phrase: fixed(TRIGGER_PHRASE),
            reply_payload: fixed(REPLY_PAYLOAD),

            // Trigger / actuator
            trigger_count: 3,
            pulse_duration_ms: 3000,

            // Persistence
            record_namespace: fixed(RECORD_NAMESPACE),
            record_key: fixed(RECORD_KEY),
            record_prefix: fixed(RECORD_PREFIX),
        }
    }
}

/// Copy `s` into a fixed-capacity string, truncating on a char boundary.
fn fixed<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConfigError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConfigError::ValidationFailed(
            "wifi_ssid must be 1-32 printable ASCII bytes",
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConfigError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConfigError::ValidationFailed(
            "wifi_password must be 8-64 bytes for WPA2, or empty for open",
        ));
    }
    Ok(())
}
