use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ports::EmergencyContact;

pub type AlertId = String;

/// Geographic snapshot attached to an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f32>,
    #[serde(default)]
    pub address: Option<String>,
}

impl LocationSnapshot {
    /// Map link embedded in outgoing SMS bodies.
    pub fn maps_url(&self) -> String {
        format!(
            "https://www.google.com/maps/search/?api=1&query={},{}",
            self.latitude, self.longitude
        )
    }
}

/// Lifecycle status of an alert.
///
/// `Pending → Sent → {Completed | Cancelled}`, with `Cancelled` also
/// reachable from `Pending`. No transition leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertStatus {
    Pending,
    Sent,
    Completed,
    Cancelled,
}

impl AlertStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// A single alert, retained in history after it reaches a terminal state.
///
/// `contacts_notified` stays empty until the alert is dispatched and is not
/// modified afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub created_at: DateTime<Utc>,
    pub location: Option<LocationSnapshot>,
    pub status: AlertStatus,
    pub contacts_notified: Vec<EmergencyContact>,
}

impl Alert {
    pub(crate) fn new(location: Option<LocationSnapshot>) -> Self {
        Self {
            id: gen_alert_id(),
            created_at: Utc::now(),
            location,
            status: AlertStatus::Pending,
            contacts_notified: Vec::new(),
        }
    }
}

fn gen_alert_id() -> AlertId {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("alert_{:x}", nanos)
}
