mod config;
mod sim;

use std::sync::Arc;
use std::time::Duration;

use config::SosAgentConfig;
use haven_core::{
    AlertConfig, AlertStatus, CountdownState, Haven, ListenerConfig, UserPreferences,
};
use sim::{ConsoleNotifier, FixedLocation, MemoryPrefs, SimSpeechEngine};
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging / tracing
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,haven_core=info,sos_agent=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        target = "sos_agent",
        "Starting SOS agent demo: Voice trigger → Countdown → Fan-out"
    );

    // Load configuration (defaults + env + optional TOML overlay)
    let cfg = SosAgentConfig::load();

    // Simulated ports standing in for the platform
    let engine = Arc::new(SimSpeechEngine::new(
        cfg.spoken_line.clone(),
        Duration::from_millis(cfg.speak_after_ms),
    ));
    let prefs = Arc::new(MemoryPrefs::new(UserPreferences {
        voice_trigger_enabled: true,
        voice_trigger_phrase: cfg.trigger_phrase.clone(),
        location_sharing_enabled: cfg.location.is_some(),
        alert_countdown_seconds: cfg.countdown_secs,
        emergency_contacts: cfg.contacts.clone(),
    }));
    let location = Arc::new(FixedLocation::new(cfg.location.clone()));
    let notifier = Arc::new(ConsoleNotifier);

    // Core runtime: arbiter + listener + orchestrator
    let mut haven = Haven::new(
        engine,
        prefs,
        location,
        notifier,
        AlertConfig::default(),
        ListenerConfig {
            default_phrase: cfg.trigger_phrase.clone(),
            trigger_buffer: 8,
        },
    );
    haven.start().await?;

    // Surface listener state changes as they happen
    let mut state_rx = haven.listener.state();
    tokio::spawn(async move {
        loop {
            let state = *state_rx.borrow_and_update();
            info!(target = "sos_agent", ?state, "Listener state");
            if state_rx.changed().await.is_err() {
                break;
            }
        }
    });

    // Host-side countdown ticker, one tick per second
    let orchestrator = Arc::clone(&haven.orchestrator);
    let ticker = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            match orchestrator.tick().await {
                CountdownState::Counting { alert_id, remaining } => {
                    info!(target = "sos_agent", %alert_id, remaining, "Countdown");
                    if remaining == 0 {
                        break;
                    }
                }
                CountdownState::Inactive => {}
            }
        }
    });

    // Run until the scripted alert goes out, or the user interrupts
    tokio::select! {
        _ = ticker => {}
        _ = signal::ctrl_c() => {
            info!(target = "sos_agent", "Interrupted");
            haven.shutdown().await;
            return Ok(());
        }
    }

    // Close out the incident and show the history
    if let Some(alert) = haven.orchestrator.current_alert().await {
        if alert.status == AlertStatus::Sent {
            haven.orchestrator.complete_alert(&alert.id);
        }
    }
    for alert in haven.orchestrator.alerts() {
        info!(
            target = "sos_agent",
            alert_id = %alert.id,
            status = ?alert.status,
            contacts = alert.contacts_notified.len(),
            has_location = alert.location.is_some(),
            "Alert summary"
        );
    }

    haven.shutdown().await;
    Ok(())
}
