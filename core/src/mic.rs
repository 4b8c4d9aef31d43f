//! Microphone arbitration.
//!
//! The microphone is the one piece of hardware shared between the
//! continuous voice-trigger listener and short-lived availability probes.
//! The arbiter hands out at most one lease at a time; this module owns the
//! only constructor of `MicrophoneLease`, so holding the value is the proof
//! of access.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{HavenError, Result};

/// Who is holding (or requesting) the microphone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseHolder {
    VoiceTrigger,
    AvailabilityProbe,
}

impl fmt::Display for LeaseHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VoiceTrigger => write!(f, "voice trigger"),
            Self::AvailabilityProbe => write!(f, "availability probe"),
        }
    }
}

/// Exclusive grant of the microphone. Only the arbiter constructs these;
/// give it back with `MicrophoneArbiter::release`.
#[derive(Debug)]
pub struct MicrophoneLease {
    id: u64,
    holder: LeaseHolder,
    acquired_at: DateTime<Utc>,
}

impl MicrophoneLease {
    pub fn holder(&self) -> LeaseHolder {
        self.holder
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }
}

struct SlotEntry {
    lease_id: u64,
    holder: LeaseHolder,
}

/// Exclusive-lease manager for the microphone.
pub struct MicrophoneArbiter {
    slot: Mutex<Option<SlotEntry>>,
    next_id: AtomicU64,
}

impl MicrophoneArbiter {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Grant a lease if none is outstanding. Never queues or blocks; a
    /// caller that loses the race must retry later or report unavailability.
    pub fn acquire(&self, holder: LeaseHolder) -> Result<MicrophoneLease> {
        let mut slot = self.lock_slot();
        if let Some(active) = slot.as_ref() {
            debug!(
                target: "mic",
                requested = %holder,
                held_by = %active.holder,
                "Microphone busy"
            );
            return Err(HavenError::ResourceUnavailable(format!(
                "microphone held by {}",
                active.holder
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        *slot = Some(SlotEntry {
            lease_id: id,
            holder,
        });
        debug!(target: "mic", holder = %holder, "Microphone lease granted");
        Ok(MicrophoneLease {
            id,
            holder,
            acquired_at: Utc::now(),
        })
    }

    /// Return a lease. Releasing a lease that is no longer current is a
    /// no-op; the arbiter never revokes a lease it did not issue.
    pub fn release(&self, lease: MicrophoneLease) {
        let mut slot = self.lock_slot();
        match slot.as_ref() {
            Some(active) if active.lease_id == lease.id => {
                *slot = None;
                debug!(target: "mic", holder = %lease.holder, "Microphone lease released");
            }
            _ => {
                debug!(target: "mic", holder = %lease.holder, "Ignoring stale lease release");
            }
        }
    }

    /// Diagnostic check: is the microphone currently free? Acquires and
    /// immediately releases a probe lease, so it can never displace an
    /// active holder.
    pub fn probe(&self) -> bool {
        match self.acquire(LeaseHolder::AvailabilityProbe) {
            Ok(lease) => {
                self.release(lease);
                true
            }
            Err(_) => false,
        }
    }

    pub fn current_holder(&self) -> Option<LeaseHolder> {
        self.lock_slot().as_ref().map(|s| s.holder)
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, Option<SlotEntry>> {
        // Slot updates cannot panic mid-write, so a poisoned lock still
        // carries a consistent value
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MicrophoneArbiter {
    fn default() -> Self {
        Self::new()
    }
}
