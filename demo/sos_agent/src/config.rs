use std::fs;
use std::path::Path;

use haven_core::{EmergencyContact, LocationSnapshot};

/// High-level configuration for the SOS demo
#[derive(Clone, Debug)]
pub struct SosAgentConfig {
    /// Phrase the simulated speaker will be listened for
    pub trigger_phrase: String,
    /// Countdown between trigger and fan-out
    pub countdown_secs: u32,
    /// The utterance the simulated speech engine "hears"
    pub spoken_line: String,
    /// Delay before the utterance arrives, in milliseconds
    pub speak_after_ms: u64,
    /// Fixed position reported by the simulated location port
    pub location: Option<LocationSnapshot>,
    /// Contacts receiving the fan-out
    pub contacts: Vec<EmergencyContact>,
}

impl Default for SosAgentConfig {
    fn default() -> Self {
        let trigger_phrase =
            std::env::var("SOS_TRIGGER_PHRASE").unwrap_or_else(|_| "help me".to_string());
        let countdown_secs = std::env::var("SOS_COUNTDOWN_SECS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(3);
        let spoken_line = std::env::var("SOS_SPOKEN_LINE")
            .unwrap_or_else(|_| format!("someone please {} right now", trigger_phrase));
        let speak_after_ms = std::env::var("SOS_SPEAK_AFTER_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(2_000);

        Self {
            trigger_phrase,
            countdown_secs,
            spoken_line,
            speak_after_ms,
            location: Some(LocationSnapshot {
                latitude: 37.7749,
                longitude: -122.4194,
                accuracy: Some(12.0),
                address: Some("San Francisco, CA".to_string()),
            }),
            contacts: vec![
                EmergencyContact {
                    id: "demo_1".to_string(),
                    name: "Alice".to_string(),
                    phone_number: "+15550100".to_string(),
                    photo_uri: None,
                    priority: 1,
                    send_sms: true,
                    make_call: true,
                },
                EmergencyContact {
                    id: "demo_2".to_string(),
                    name: "Bob".to_string(),
                    phone_number: "+15550101".to_string(),
                    photo_uri: None,
                    priority: 2,
                    send_sms: true,
                    make_call: false,
                },
            ],
        }
    }
}

impl SosAgentConfig {
    /// Load configuration from a TOML file (path via SOS_AGENT_CONFIG or
    /// ./sos_agent.toml), overlaying values onto env-driven defaults.
    pub fn load() -> Self {
        let default = Self::default();
        let path = std::env::var("SOS_AGENT_CONFIG").unwrap_or_else(|_| "sos_agent.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target = "sos_agent", path = %path, "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(p) {
            Ok(s) => match toml::from_str::<SosAgentToml>(&s) {
                Ok(t) => t.overlay(default),
                Err(e) => {
                    tracing::warn!(target = "sos_agent", error = %e, "Failed to parse TOML; using defaults");
                    default
                }
            },
            Err(e) => {
                tracing::warn!(target = "sos_agent", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct SosAgentToml {
    pub trigger_phrase: Option<String>,
    pub countdown_secs: Option<u32>,
    pub spoken_line: Option<String>,
    pub speak_after_ms: Option<u64>,
    pub location: Option<LocationToml>,
    pub contacts: Option<Vec<ContactToml>>,
}

impl SosAgentToml {
    fn overlay(self, mut base: SosAgentConfig) -> SosAgentConfig {
        if let Some(p) = self.trigger_phrase {
            base.trigger_phrase = p;
        }
        if let Some(c) = self.countdown_secs {
            base.countdown_secs = c;
        }
        if let Some(s) = self.spoken_line {
            base.spoken_line = s;
        }
        if let Some(ms) = self.speak_after_ms {
            base.speak_after_ms = ms;
        }
        if let Some(l) = self.location {
            base.location = Some(LocationSnapshot {
                latitude: l.latitude,
                longitude: l.longitude,
                accuracy: l.accuracy,
                address: l.address,
            });
        }
        if let Some(contacts) = self.contacts {
            base.contacts = contacts
                .into_iter()
                .enumerate()
                .map(|(i, c)| c.into_contact(i))
                .collect();
        }
        base
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
struct LocationToml {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f32>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct ContactToml {
    pub name: String,
    pub phone: String,
    pub priority: Option<i32>,
    pub send_sms: Option<bool>,
    pub make_call: Option<bool>,
}

impl ContactToml {
    fn into_contact(self, index: usize) -> EmergencyContact {
        EmergencyContact {
            id: format!("contact_{}", index + 1),
            name: self.name,
            phone_number: self.phone,
            photo_uri: None,
            priority: self.priority.unwrap_or(index as i32),
            send_sms: self.send_sms.unwrap_or(true),
            make_call: self.make_call.unwrap_or(false),
        }
    }
}
