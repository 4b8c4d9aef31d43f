//! Simulated port implementations for the demo: a speech engine that
//! "hears" one scripted utterance, a notifier that prints instead of
//! sending, a fixed location source and in-memory preferences.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

use haven_core::{
    LocationPort, LocationSnapshot, NotifierPort, PreferencesPort, RecognitionEvent, Result,
    SpeechEnginePort, UserPreferences,
};

/// Speech engine whose first recognition pass delivers one scripted final
/// hypothesis after a delay; later passes stay open and silent.
pub struct SimSpeechEngine {
    spoken_line: String,
    speak_after: Duration,
    passes: AtomicUsize,
}

impl SimSpeechEngine {
    pub fn new(spoken_line: String, speak_after: Duration) -> Self {
        Self {
            spoken_line,
            speak_after,
            passes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SpeechEnginePort for SimSpeechEngine {
    fn microphone_permission_granted(&self) -> bool {
        true
    }

    async fn start_pass(&self) -> Result<mpsc::Receiver<RecognitionEvent>> {
        let pass = self.passes.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(8);

        if pass == 0 {
            let line = self.spoken_line.clone();
            let delay = self.speak_after;
            tokio::spawn(async move {
                let _ = tx.send(RecognitionEvent::Ready).await;
                tokio::time::sleep(delay).await;
                info!(target: "sim", heard = %line, "Simulated speaker talks");
                let _ = tx.send(RecognitionEvent::Final(line)).await;
                // Hold the pass open; the listener decides when it ends
                tokio::time::sleep(Duration::from_secs(3600)).await;
            });
        } else {
            tokio::spawn(async move {
                let _ = tx.send(RecognitionEvent::Ready).await;
                tokio::time::sleep(Duration::from_secs(3600)).await;
            });
        }
        Ok(rx)
    }

    async fn stop_pass(&self) {}
}

/// Notifier that prints deliveries instead of reaching a carrier.
pub struct ConsoleNotifier;

#[async_trait]
impl NotifierPort for ConsoleNotifier {
    async fn send_sms(&self, phone_number: &str, text: &str) -> Result<()> {
        info!(target: "sim", to = %phone_number, body = %text, "📨 SMS sent");
        Ok(())
    }

    async fn make_call(&self, phone_number: &str) -> Result<()> {
        info!(target: "sim", to = %phone_number, "📞 Call placed");
        Ok(())
    }
}

/// Location port answering with a fixed position.
pub struct FixedLocation {
    location: Option<LocationSnapshot>,
}

impl FixedLocation {
    pub fn new(location: Option<LocationSnapshot>) -> Self {
        Self { location }
    }
}

#[async_trait]
impl LocationPort for FixedLocation {
    fn location_permission_granted(&self) -> bool {
        self.location.is_some()
    }

    async fn current_location(&self) -> Option<LocationSnapshot> {
        self.location.clone()
    }
}

/// In-memory preferences store.
pub struct MemoryPrefs {
    inner: Mutex<UserPreferences>,
}

impl MemoryPrefs {
    pub fn new(prefs: UserPreferences) -> Self {
        Self {
            inner: Mutex::new(prefs),
        }
    }
}

#[async_trait]
impl PreferencesPort for MemoryPrefs {
    async fn load(&self) -> Result<UserPreferences> {
        Ok(self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    async fn set_voice_trigger(&self, enabled: bool, phrase: &str) -> Result<()> {
        let mut prefs = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        prefs.voice_trigger_enabled = enabled;
        prefs.voice_trigger_phrase = phrase.to_string();
        info!(target: "sim", enabled, phrase = %phrase, "Voice-trigger preference persisted");
        Ok(())
    }
}
