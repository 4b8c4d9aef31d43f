//! External collaborator interfaces.
//!
//! The core never talks to platform services directly: preferences storage,
//! geolocation, SMS/dialer and the speech recognition engine are all supplied
//! by the host behind these traits. Port implementations live outside this
//! crate (the demo app ships simulated ones).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::alert::LocationSnapshot;
use crate::Result;

/// An emergency contact as configured by the user.
///
/// `priority` orders the fan-out (lower value is notified first); the two
/// channel flags are independent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub id: String,
    pub name: String,
    pub phone_number: String,
    #[serde(default)]
    pub photo_uri: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_send_sms")]
    pub send_sms: bool,
    #[serde(default)]
    pub make_call: bool,
}

fn default_send_sms() -> bool {
    true
}

/// User preferences consumed by this core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub voice_trigger_enabled: bool,
    pub voice_trigger_phrase: String,
    pub location_sharing_enabled: bool,
    pub alert_countdown_seconds: u32,
    pub emergency_contacts: Vec<EmergencyContact>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            voice_trigger_enabled: false,
            voice_trigger_phrase: "help me".to_string(),
            location_sharing_enabled: true,
            alert_countdown_seconds: 5,
            emergency_contacts: Vec::new(),
        }
    }
}

/// Read/write access to the persisted user preferences.
#[async_trait]
pub trait PreferencesPort: Send + Sync {
    async fn load(&self) -> Result<UserPreferences>;

    /// Persist the voice-trigger switch together with its phrase, so the UI
    /// and the listener agree across process restarts.
    async fn set_voice_trigger(&self, enabled: bool, phrase: &str) -> Result<()>;
}

/// Best-effort current-location source.
#[async_trait]
pub trait LocationPort: Send + Sync {
    fn location_permission_granted(&self) -> bool;

    /// Resolve the current position, or `None` when it cannot be determined.
    /// Callers bound this with a timeout; implementations need not.
    async fn current_location(&self) -> Option<LocationSnapshot>;
}

/// Outbound notification channels (SMS and dialer).
#[async_trait]
pub trait NotifierPort: Send + Sync {
    async fn send_sms(&self, phone_number: &str, text: &str) -> Result<()>;
    async fn make_call(&self, phone_number: &str) -> Result<()>;
}

/// Events delivered by a single recognition pass.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// The engine is ready and capturing
    Ready,
    /// Interim hypothesis for the current utterance
    Partial(String),
    /// Final hypothesis for the current utterance
    Final(String),
    /// The pass ended without a usable result; benign, restart
    Ended(PassEnd),
    /// The engine failed; see `EngineFault::is_fatal`
    Fault(EngineFault),
}

/// Benign reasons a recognition pass stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassEnd {
    EndOfSpeech,
    NoMatch,
    Timeout,
}

/// Engine failures. The fatal ones end the listening session until the user
/// re-enables the trigger; permission loss is tracked separately so the UI
/// can point at the right fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineFault {
    RecognizerBusy,
    Audio,
    Server,
    PermissionDenied,
}

impl EngineFault {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RecognizerBusy | Self::Audio | Self::Server)
    }
}

/// One-shot speech recognition engine.
///
/// A pass runs from `start_pass` until a `Final`, `Ended` or `Fault` event;
/// the returned channel closes afterwards. Continuous listening is the
/// listener's job, by chaining passes.
#[async_trait]
pub trait SpeechEnginePort: Send + Sync {
    fn microphone_permission_granted(&self) -> bool;

    /// Begin one recognition pass and stream its events.
    async fn start_pass(&self) -> Result<mpsc::Receiver<RecognitionEvent>>;

    /// Abort the in-flight pass, if any. A no-op when idle.
    async fn stop_pass(&self);
}
