//! End-to-end: spoken phrase → trigger → alert → countdown → fan-out.

mod common;

use std::sync::Arc;
use std::time::Duration;

use haven_core::{
    AlertConfig, AlertStatus, Haven, ListenerConfig, ListenerState, RecognitionEvent,
    UserPreferences,
};

use common::{contact, wait_for_state, FakeLocation, MemoryPrefs, RecordingNotifier, ScriptedEngine};

fn armed_prefs() -> UserPreferences {
    UserPreferences {
        voice_trigger_enabled: true,
        voice_trigger_phrase: "help me".to_string(),
        location_sharing_enabled: false,
        alert_countdown_seconds: 2,
        emergency_contacts: vec![contact("c1", "Alice", "+15550100", 0, true, false)],
    }
}

#[tokio::test]
async fn test_spoken_phrase_becomes_a_dispatched_alert() {
    let engine = Arc::new(ScriptedEngine::new(vec![vec![
        RecognitionEvent::Ready,
        RecognitionEvent::Final("could you help me please".to_string()),
    ]]));
    let prefs = Arc::new(MemoryPrefs::new(armed_prefs()));
    let notifier = Arc::new(RecordingNotifier::new());

    let mut haven = Haven::new(
        engine.clone(),
        prefs.clone(),
        Arc::new(FakeLocation::unavailable()),
        notifier.clone(),
        AlertConfig {
            location_timeout: Duration::from_millis(50),
            sms_phrase: "EMERGENCY ALERT: I need help!".to_string(),
        },
        ListenerConfig {
            default_phrase: "help me".to_string(),
            trigger_buffer: 8,
        },
    );

    // Start resumes listening from the persisted preference and bridges
    // triggers into alert creation
    haven.start().await.unwrap();

    // The scripted utterance should produce a pending alert
    let alert = {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        loop {
            if let Some(alert) = haven.orchestrator.current_alert().await {
                break alert;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "no alert was created from the trigger"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    assert_eq!(alert.status, AlertStatus::Pending);

    // Detection must not stop the listener; it goes straight back to work
    let mut state = haven.listener.state();
    assert!(
        wait_for_state(&mut state, Duration::from_millis(500), |s| {
            *s == ListenerState::Listening
        })
        .await
    );
    assert!(engine.passes_started() >= 2);

    // Host-side 1s ticker, compressed for the test
    haven.orchestrator.tick().await;
    assert!(notifier.events().is_empty(), "one tick left on the countdown");
    haven.orchestrator.tick().await;

    let sent = haven.orchestrator.alert(&alert.id).unwrap();
    assert_eq!(sent.status, AlertStatus::Sent);
    assert_eq!(sent.contacts_notified.len(), 1);
    assert_eq!(notifier.sms_count(), 1);
    assert_eq!(notifier.call_count(), 0);

    // Wrap up the incident
    assert_eq!(
        haven.orchestrator.complete_alert(&alert.id),
        Some(alert.id.clone())
    );

    haven.shutdown().await;
}

#[tokio::test]
async fn test_start_leaves_listener_idle_when_preference_is_off() {
    let engine = Arc::new(ScriptedEngine::new(vec![]));
    let prefs = Arc::new(MemoryPrefs::default());
    let notifier = Arc::new(RecordingNotifier::new());

    let mut haven = Haven::new(
        engine.clone(),
        prefs,
        Arc::new(FakeLocation::unavailable()),
        notifier,
        AlertConfig {
            location_timeout: Duration::from_millis(50),
            sms_phrase: "EMERGENCY ALERT: I need help!".to_string(),
        },
        ListenerConfig::default(),
    );
    haven.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(haven.listener.current_state(), ListenerState::Idle);
    assert_eq!(engine.passes_started(), 0);

    haven.shutdown().await;
}
