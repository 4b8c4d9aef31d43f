//! Microphone arbitration: exclusivity, release, probing.

use haven_core::{HavenError, LeaseHolder, MicrophoneArbiter};

#[test]
fn test_second_acquire_fails_while_held() {
    let arbiter = MicrophoneArbiter::new();

    let lease = arbiter.acquire(LeaseHolder::VoiceTrigger).unwrap();
    assert_eq!(lease.holder(), LeaseHolder::VoiceTrigger);

    let err = arbiter.acquire(LeaseHolder::AvailabilityProbe).unwrap_err();
    assert!(matches!(err, HavenError::ResourceUnavailable(_)));

    // The same holder kind does not get a second lease either
    assert!(arbiter.acquire(LeaseHolder::VoiceTrigger).is_err());

    arbiter.release(lease);
}

#[test]
fn test_release_then_reacquire() {
    let arbiter = MicrophoneArbiter::new();

    let lease = arbiter.acquire(LeaseHolder::VoiceTrigger).unwrap();
    arbiter.release(lease);

    let lease = arbiter.acquire(LeaseHolder::AvailabilityProbe).unwrap();
    assert_eq!(lease.holder(), LeaseHolder::AvailabilityProbe);
    arbiter.release(lease);
}

#[test]
fn test_probe_reports_free_microphone() {
    let arbiter = MicrophoneArbiter::new();

    assert!(arbiter.probe());
    // The probe's own lease was returned, so acquisition still works
    let lease = arbiter.acquire(LeaseHolder::VoiceTrigger).unwrap();
    arbiter.release(lease);
}

#[test]
fn test_probe_never_preempts_active_lease() {
    let arbiter = MicrophoneArbiter::new();

    let lease = arbiter.acquire(LeaseHolder::VoiceTrigger).unwrap();
    assert!(!arbiter.probe());
    // The active lease survives a failed probe
    assert_eq!(arbiter.current_holder(), Some(LeaseHolder::VoiceTrigger));

    arbiter.release(lease);
    assert!(arbiter.probe());
}

#[test]
fn test_current_holder_tracks_slot() {
    let arbiter = MicrophoneArbiter::new();
    assert_eq!(arbiter.current_holder(), None);

    let lease = arbiter.acquire(LeaseHolder::AvailabilityProbe).unwrap();
    assert_eq!(arbiter.current_holder(), Some(LeaseHolder::AvailabilityProbe));

    arbiter.release(lease);
    assert_eq!(arbiter.current_holder(), None);
}
