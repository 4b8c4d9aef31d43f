//! Voice trigger: continuous phrase spotting on top of the speech engine
//! port and the microphone arbiter.

pub mod listener;
pub mod phrase;

pub use listener::{
    DisableReason, ListenerHandle, ListenerState, TriggerDetected, VoiceTriggerListener,
};
pub use phrase::phrase_matches;
