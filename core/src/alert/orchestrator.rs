//! Alert orchestrator: drives one alert at a time from creation to a
//! terminal state and performs the notification fan-out at most once.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::alert::model::{Alert, AlertId, AlertStatus, LocationSnapshot};
use crate::config::AlertConfig;
use crate::ports::{EmergencyContact, LocationPort, NotifierPort, PreferencesPort, UserPreferences};
use crate::{HavenError, Result};

/// Countdown position of the current alert, as observed after a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountdownState {
    /// No current alert, or the current alert was cancelled
    Inactive,
    /// Seconds remaining; stays at zero once elapsed
    Counting { alert_id: AlertId, remaining: u32 },
}

/// Countdown bookkeeping for the current alert, including the contact
/// snapshot taken at creation time.
struct CurrentAlert {
    id: AlertId,
    remaining: u32,
    contacts: Vec<EmergencyContact>,
}

pub struct AlertOrchestrator {
    cfg: AlertConfig,
    prefs: Arc<dyn PreferencesPort>,
    location: Arc<dyn LocationPort>,
    notifier: Arc<dyn NotifierPort>,
    // Alert history; writes come from this orchestrator only
    alerts: DashMap<AlertId, Alert>,
    current: Mutex<Option<CurrentAlert>>,
}

impl AlertOrchestrator {
    pub fn new(
        cfg: AlertConfig,
        prefs: Arc<dyn PreferencesPort>,
        location: Arc<dyn LocationPort>,
        notifier: Arc<dyn NotifierPort>,
    ) -> Self {
        Self {
            cfg,
            prefs,
            location,
            notifier,
            alerts: DashMap::new(),
            current: Mutex::new(None),
        }
    }

    /// Create a new pending alert and make it current.
    ///
    /// Location is best effort: when no hint is given, a fetch runs only if
    /// sharing is enabled and permitted, and is abandoned after the
    /// configured timeout. The previous current alert is superseded, not
    /// mutated.
    pub async fn create_alert(&self, location_hint: Option<LocationSnapshot>) -> Alert {
        let prefs = match self.prefs.load().await {
            Ok(p) => p,
            Err(e) => {
                warn!(target: "alert", error = %e, "Failed to load preferences; using defaults");
                UserPreferences::default()
            }
        };

        let location = match location_hint {
            Some(loc) => Some(loc),
            None if prefs.location_sharing_enabled
                && self.location.location_permission_granted() =>
            {
                match tokio::time::timeout(
                    self.cfg.location_timeout,
                    self.location.current_location(),
                )
                .await
                {
                    Ok(loc) => loc,
                    Err(_) => {
                        warn!(target: "alert", "Location fetch timed out; continuing without location");
                        None
                    }
                }
            }
            None => None,
        };

        let alert = Alert::new(location);
        self.alerts.insert(alert.id.clone(), alert.clone());

        {
            let mut current = self.current.lock().await;
            *current = Some(CurrentAlert {
                id: alert.id.clone(),
                remaining: prefs.alert_countdown_seconds,
                contacts: prefs.emergency_contacts,
            });
        }

        info!(
            target: "alert",
            alert_id = %alert.id,
            countdown = prefs.alert_countdown_seconds,
            has_location = alert.location.is_some(),
            "Alert created"
        );
        alert
    }

    /// Advance the countdown by one unit.
    ///
    /// Saturates at zero; the 1→0 transition dispatches the alert exactly
    /// once. Ticks against a cancelled or absent current alert are no-ops.
    pub async fn tick(&self) -> CountdownState {
        let mut fire: Option<(AlertId, Vec<EmergencyContact>)> = None;
        let state = {
            let mut guard = self.current.lock().await;
            match guard.as_mut() {
                None => CountdownState::Inactive,
                Some(current) => {
                    let status = self.alerts.get(&current.id).map(|a| a.status);
                    if matches!(status, Some(AlertStatus::Cancelled)) {
                        CountdownState::Inactive
                    } else {
                        current.remaining = current.remaining.saturating_sub(1);
                        // Fire on the transition to zero; a dispatched or
                        // cancelled alert leaves later zero-ticks inert
                        if current.remaining == 0 && matches!(status, Some(AlertStatus::Pending)) {
                            fire = Some((current.id.clone(), current.contacts.clone()));
                        }
                        CountdownState::Counting {
                            alert_id: current.id.clone(),
                            remaining: current.remaining,
                        }
                    }
                }
            }
        };

        if let Some((alert_id, contacts)) = fire {
            debug!(target: "alert", alert_id = %alert_id, "Countdown elapsed; dispatching");
            if let Err(e) = self.send_alert(&alert_id, &contacts, None).await {
                warn!(target: "alert", alert_id = %alert_id, error = %e, "Auto-dispatch failed");
            }
        }

        state
    }

    /// Dispatch the alert to its contacts.
    ///
    /// Fails only for an unknown id. An already dispatched or terminal alert
    /// is left untouched, so racing callers cause at most one fan-out.
    /// Delivery runs as two ordered passes over the priority-sorted list:
    /// SMS to every `send_sms` contact, then calls to every `make_call`
    /// contact. Per-contact failures are logged and do not stop the
    /// broadcast.
    pub async fn send_alert(
        &self,
        alert_id: &str,
        contacts: &[EmergencyContact],
        location: Option<LocationSnapshot>,
    ) -> Result<()> {
        let (body, ordered) = {
            let mut entry = self
                .alerts
                .get_mut(alert_id)
                .ok_or_else(|| HavenError::AlertNotFound(alert_id.to_string()))?;

            if entry.status != AlertStatus::Pending {
                debug!(
                    target: "alert",
                    alert_id,
                    status = ?entry.status,
                    "Alert already dispatched or closed; ignoring"
                );
                return Ok(());
            }

            let mut ordered = contacts.to_vec();
            // Stable sort: equal priorities keep their configured order
            ordered.sort_by_key(|c| c.priority);

            if let Some(loc) = location {
                entry.location = Some(loc);
            }
            entry.status = AlertStatus::Sent;
            entry.contacts_notified = ordered.clone();

            (self.alert_message(entry.location.as_ref()), ordered)
        };

        for contact in ordered.iter().filter(|c| c.send_sms) {
            if let Err(e) = self.notifier.send_sms(&contact.phone_number, &body).await {
                warn!(
                    target: "alert",
                    alert_id,
                    contact = %contact.name,
                    error = %e,
                    "SMS delivery failed"
                );
            }
        }

        for contact in ordered.iter().filter(|c| c.make_call) {
            if let Err(e) = self.notifier.make_call(&contact.phone_number).await {
                warn!(
                    target: "alert",
                    alert_id,
                    contact = %contact.name,
                    error = %e,
                    "Call placement failed"
                );
            }
        }

        info!(target: "alert", alert_id, contacts = ordered.len(), "Alert dispatched");
        Ok(())
    }

    /// Close out a dispatched alert. Returns `None` when the alert does not
    /// exist or is not in `Sent`.
    pub fn complete_alert(&self, alert_id: &str) -> Option<AlertId> {
        let mut entry = self.alerts.get_mut(alert_id)?;
        if entry.status != AlertStatus::Sent {
            return None;
        }
        entry.status = AlertStatus::Completed;
        info!(target: "alert", alert_id, "Alert completed");
        Some(entry.id.clone())
    }

    /// Cancel a pending or dispatched alert and drop the current pointer.
    /// A no-op for terminal or unknown alerts; messages already delivered
    /// are not recalled.
    pub async fn cancel_alert(&self, alert_id: &str) {
        let cancelled = {
            match self.alerts.get_mut(alert_id) {
                Some(mut entry) if !entry.status.is_terminal() => {
                    entry.status = AlertStatus::Cancelled;
                    true
                }
                _ => false,
            }
        };
        if cancelled {
            info!(target: "alert", alert_id, "Alert cancelled");
        }

        let mut current = self.current.lock().await;
        if current.as_ref().map(|c| c.id.as_str()) == Some(alert_id) {
            *current = None;
        }
    }

    /// The alert currently owning the countdown, if any.
    pub async fn current_alert(&self) -> Option<Alert> {
        let current = self.current.lock().await;
        let id = current.as_ref()?.id.clone();
        drop(current);
        self.alert(&id)
    }

    pub fn alert(&self, alert_id: &str) -> Option<Alert> {
        self.alerts.get(alert_id).map(|a| a.clone())
    }

    /// History snapshot, oldest first.
    pub fn alerts(&self) -> Vec<Alert> {
        let mut all: Vec<Alert> = self.alerts.iter().map(|a| a.clone()).collect();
        all.sort_by_key(|a| a.created_at);
        all
    }

    fn alert_message(&self, location: Option<&LocationSnapshot>) -> String {
        match location {
            Some(loc) => format!(
                "{} My current location: {}",
                self.cfg.sms_phrase,
                loc.maps_url()
            ),
            None => self.cfg.sms_phrase.clone(),
        }
    }
}
