//! Shared test doubles for the port traits.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use haven_core::{
    EmergencyContact, ListenerState, LocationPort, LocationSnapshot, NotifierPort,
    PreferencesPort, RecognitionEvent, Result, SpeechEnginePort, UserPreferences,
};

/// Speech engine replaying a fixed script of events per recognition pass.
///
/// Each call to `start_pass` consumes the next script; once the scripts run
/// out, passes stay open and silent. The feeder task holds the channel open
/// after the last event so a pass only ends when the script says so.
pub struct ScriptedEngine {
    passes: Mutex<VecDeque<Vec<RecognitionEvent>>>,
    permission: AtomicBool,
    started: AtomicUsize,
    stopped: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new(passes: Vec<Vec<RecognitionEvent>>) -> Self {
        Self {
            passes: Mutex::new(passes.into()),
            permission: AtomicBool::new(true),
            started: AtomicUsize::new(0),
            stopped: AtomicUsize::new(0),
        }
    }

    pub fn without_permission(self) -> Self {
        self.permission.store(false, Ordering::SeqCst);
        self
    }

    pub fn set_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::SeqCst);
    }

    pub fn passes_started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn passes_stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechEnginePort for ScriptedEngine {
    fn microphone_permission_granted(&self) -> bool {
        self.permission.load(Ordering::SeqCst)
    }

    async fn start_pass(&self) -> Result<mpsc::Receiver<RecognitionEvent>> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let script = self
            .passes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();

        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            for event in script {
                if tx.send(event).await.is_err() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            // Keep the pass open; a pass ends through its script, not by
            // the channel closing under the listener
            tokio::time::sleep(Duration::from_secs(60)).await;
            drop(tx);
        });
        Ok(rx)
    }

    async fn stop_pass(&self) {
        self.stopped.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-memory preferences recording every voice-trigger write.
pub struct MemoryPrefs {
    inner: Mutex<UserPreferences>,
    writes: Mutex<Vec<(bool, String)>>,
}

impl MemoryPrefs {
    pub fn new(prefs: UserPreferences) -> Self {
        Self {
            inner: Mutex::new(prefs),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> UserPreferences {
        self.inner.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<(bool, String)> {
        self.writes.lock().unwrap().clone()
    }
}

impl Default for MemoryPrefs {
    fn default() -> Self {
        Self::new(UserPreferences::default())
    }
}

#[async_trait]
impl PreferencesPort for MemoryPrefs {
    async fn load(&self) -> Result<UserPreferences> {
        Ok(self.inner.lock().unwrap().clone())
    }

    async fn set_voice_trigger(&self, enabled: bool, phrase: &str) -> Result<()> {
        let mut prefs = self.inner.lock().unwrap();
        prefs.voice_trigger_enabled = enabled;
        prefs.voice_trigger_phrase = phrase.to_string();
        self.writes
            .lock()
            .unwrap()
            .push((enabled, phrase.to_string()));
        Ok(())
    }
}

/// Notifier recording deliveries in order.
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyEvent {
    Sms { number: String, text: String },
    Call { number: String },
}

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotifyEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NotifyEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn sms_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, NotifyEvent::Sms { .. }))
            .count()
    }

    pub fn call_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, NotifyEvent::Call { .. }))
            .count()
    }
}

#[async_trait]
impl NotifierPort for RecordingNotifier {
    async fn send_sms(&self, phone_number: &str, text: &str) -> Result<()> {
        self.events.lock().unwrap().push(NotifyEvent::Sms {
            number: phone_number.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn make_call(&self, phone_number: &str) -> Result<()> {
        self.events.lock().unwrap().push(NotifyEvent::Call {
            number: phone_number.to_string(),
        });
        Ok(())
    }
}

/// Location port with a configurable answer and artificial latency.
pub struct FakeLocation {
    pub granted: bool,
    pub location: Option<LocationSnapshot>,
    pub delay: Duration,
}

impl FakeLocation {
    pub fn granted(location: LocationSnapshot) -> Self {
        Self {
            granted: true,
            location: Some(location),
            delay: Duration::ZERO,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            granted: false,
            location: None,
            delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl LocationPort for FakeLocation {
    fn location_permission_granted(&self) -> bool {
        self.granted
    }

    async fn current_location(&self) -> Option<LocationSnapshot> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.location.clone()
    }
}

pub fn contact(
    id: &str,
    name: &str,
    number: &str,
    priority: i32,
    send_sms: bool,
    make_call: bool,
) -> EmergencyContact {
    EmergencyContact {
        id: id.to_string(),
        name: name.to_string(),
        phone_number: number.to_string(),
        photo_uri: None,
        priority,
        send_sms,
        make_call,
    }
}

pub fn sample_location() -> LocationSnapshot {
    LocationSnapshot {
        latitude: 12.34,
        longitude: 56.78,
        accuracy: Some(5.0),
        address: None,
    }
}

/// Wait until the listener state satisfies `pred`, or give up after
/// `timeout`.
pub async fn wait_for_state<F>(
    rx: &mut watch::Receiver<ListenerState>,
    timeout: Duration,
    mut pred: F,
) -> bool
where
    F: FnMut(&ListenerState) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if pred(&rx.borrow_and_update()) {
            return true;
        }
        let Some(remaining) = deadline.checked_duration_since(tokio::time::Instant::now())
        else {
            return false;
        };
        match tokio::time::timeout(remaining, rx.changed()).await {
            Ok(Ok(())) => continue,
            _ => return false,
        }
    }
}
