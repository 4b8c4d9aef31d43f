//! Tunables for the alert lifecycle and the voice-trigger listener.
//!
//! Defaults come from the environment where an override makes sense for a
//! deployment, and from fixed fallbacks otherwise.

use std::time::Duration;

/// Configuration for the alert orchestrator
#[derive(Clone, Debug)]
pub struct AlertConfig {
    /// Hard bound on the best-effort location fetch during alert creation
    pub location_timeout: Duration,
    /// Leading phrase of every outgoing SMS body
    pub sms_phrase: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        let location_timeout_secs = std::env::var("ALERT_LOCATION_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(10);
        let sms_phrase = std::env::var("ALERT_SMS_PHRASE")
            .unwrap_or_else(|_| "EMERGENCY ALERT: I need help!".to_string());

        Self {
            location_timeout: Duration::from_secs(location_timeout_secs),
            sms_phrase,
        }
    }
}

/// Configuration for the voice-trigger listener
#[derive(Clone, Debug)]
pub struct ListenerConfig {
    /// Phrase used until `enable` supplies one
    pub default_phrase: String,
    /// Capacity of the outgoing trigger channel
    pub trigger_buffer: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        let default_phrase =
            std::env::var("VOICE_TRIGGER_PHRASE").unwrap_or_else(|_| "help me".to_string());
        let trigger_buffer = std::env::var("VOICE_TRIGGER_BUFFER")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(8);

        Self {
            default_phrase,
            trigger_buffer,
        }
    }
}
