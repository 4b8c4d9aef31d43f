// Haven Core Library
// Personal-safety runtime: alert lifecycle, voice trigger, microphone arbitration

pub mod alert;
pub mod config;
pub mod mic;
pub mod ports;
pub mod telemetry;
pub mod voice;

// Export core types
pub use alert::{Alert, AlertId, AlertOrchestrator, AlertStatus, CountdownState, LocationSnapshot};
pub use config::{AlertConfig, ListenerConfig};
pub use mic::{LeaseHolder, MicrophoneArbiter, MicrophoneLease};
pub use ports::{
    EmergencyContact, EngineFault, LocationPort, NotifierPort, PassEnd, PreferencesPort,
    RecognitionEvent, SpeechEnginePort, UserPreferences,
};
pub use voice::{
    DisableReason, ListenerHandle, ListenerState, TriggerDetected, VoiceTriggerListener,
};

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HavenError {
    #[error("Alert not found: {0}")]
    AlertNotFound(String),

    #[error("Microphone unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Preferences error: {0}")]
    Preferences(String),

    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, HavenError>;

/// Core runtime
///
/// Owns the microphone arbiter, the voice-trigger listener and the alert
/// orchestrator, and bridges detected triggers into alert creation. The
/// host drives the countdown by calling `AlertOrchestrator::tick` from its
/// own 1-second timer source.
pub struct Haven {
    pub arbiter: Arc<MicrophoneArbiter>,
    pub orchestrator: Arc<AlertOrchestrator>,
    pub listener: ListenerHandle,
    prefs: Arc<dyn PreferencesPort>,
    bridge: Option<JoinHandle<()>>,
}

impl Haven {
    pub fn new(
        engine: Arc<dyn SpeechEnginePort>,
        prefs: Arc<dyn PreferencesPort>,
        location: Arc<dyn LocationPort>,
        notifier: Arc<dyn NotifierPort>,
        alert_cfg: AlertConfig,
        listener_cfg: ListenerConfig,
    ) -> Self {
        let arbiter = Arc::new(MicrophoneArbiter::new());
        let orchestrator = Arc::new(AlertOrchestrator::new(
            alert_cfg,
            Arc::clone(&prefs),
            location,
            notifier,
        ));
        let listener = VoiceTriggerListener::spawn(
            engine,
            Arc::clone(&prefs),
            Arc::clone(&arbiter),
            listener_cfg,
        );

        Self {
            arbiter,
            orchestrator,
            listener,
            prefs,
            bridge: None,
        }
    }

    /// Start the runtime: consume the listener's trigger stream into alert
    /// creation, and resume listening when the persisted preference says the
    /// voice trigger was left enabled.
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting Haven...");

        let mut triggers = self
            .listener
            .take_triggers()
            .ok_or_else(|| HavenError::ChannelClosed("trigger stream already taken".into()))?;

        let orchestrator = Arc::clone(&self.orchestrator);
        self.bridge = Some(tokio::spawn(async move {
            while let Some(trigger) = triggers.recv().await {
                info!(target: "haven", phrase = %trigger.phrase, heard = %trigger.heard, "Voice trigger received");
                let alert = orchestrator.create_alert(None).await;
                debug!(target: "haven", alert_id = %alert.id, "Alert created from voice trigger");
            }
        }));

        match self.prefs.load().await {
            Ok(prefs) if prefs.voice_trigger_enabled => {
                self.listener.enable(prefs.voice_trigger_phrase).await?;
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to load preferences at startup"),
        }

        info!("Haven started");
        Ok(())
    }

    /// Tear down the runtime tasks. Does not touch the persisted
    /// voice-trigger preference, so listening resumes on the next start.
    pub async fn shutdown(&mut self) {
        info!("Shutting down Haven...");

        self.listener.abort();
        if let Some(bridge) = self.bridge.take() {
            bridge.abort();
        }

        info!("Haven shut down");
    }
}
