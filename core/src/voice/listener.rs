//! Continuous voice-trigger listener.
//!
//! A single task owns the listener state machine. It consumes commands from
//! the handle and recognition events from the speech engine, chains
//! recognition passes while enabled, and emits at most one trigger per
//! pass. Transient pass endings restart the loop; fatal engine faults and
//! permission loss disable it until the user re-enables, with the persisted
//! preference written back so the UI stays consistent.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ListenerConfig;
use crate::mic::{LeaseHolder, MicrophoneArbiter, MicrophoneLease};
use crate::ports::{EngineFault, PassEnd, PreferencesPort, RecognitionEvent, SpeechEnginePort};
use crate::voice::phrase::phrase_matches;
use crate::{HavenError, Result};

/// Why the listener switched itself off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableReason {
    PermissionDenied,
    MicrophoneUnavailable,
    FatalRecognitionError,
}

/// Listener lifecycle state, published on a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Idle,
    Listening,
    Restarting,
    Disabled(DisableReason),
}

/// Emitted once per recognition pass when the trigger phrase is heard.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerDetected {
    pub phrase: String,
    pub heard: String,
    pub at: DateTime<Utc>,
}

enum Command {
    Enable { phrase: Option<String> },
    Disable,
}

enum PassOutcome {
    Triggered,
    Ended(PassEnd),
    Fault(EngineFault),
    StartFailed,
    UserDisabled,
    Shutdown,
}

pub struct VoiceTriggerListener;

impl VoiceTriggerListener {
    /// Spawn the listener task and return its handle. The task runs until
    /// the handle is dropped or aborted.
    pub fn spawn(
        engine: Arc<dyn SpeechEnginePort>,
        prefs: Arc<dyn PreferencesPort>,
        arbiter: Arc<MicrophoneArbiter>,
        cfg: ListenerConfig,
    ) -> ListenerHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (trigger_tx, trigger_rx) = mpsc::channel(cfg.trigger_buffer);
        let (state_tx, state_rx) = watch::channel(ListenerState::Idle);

        let task = ListenerTask {
            engine,
            prefs,
            arbiter,
            phrase: cfg.default_phrase.clone(),
            enabled: false,
            lease: None,
            state_tx,
            trigger_tx,
        };
        let join = tokio::spawn(task.run(cmd_rx));

        ListenerHandle {
            cmd_tx,
            state_rx,
            triggers: Some(trigger_rx),
            join,
        }
    }
}

/// Host-side handle to the listener task.
pub struct ListenerHandle {
    cmd_tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<ListenerState>,
    triggers: Option<mpsc::Receiver<TriggerDetected>>,
    join: JoinHandle<()>,
}

impl ListenerHandle {
    /// Switch the trigger on with the given phrase.
    pub async fn enable(&self, phrase: impl Into<String>) -> Result<()> {
        self.send(Command::Enable {
            phrase: Some(phrase.into()),
        })
        .await
    }

    /// Switch the trigger off. Lands in `Idle`, not `Disabled`: switching
    /// off is the user's choice, not a loss of capability.
    pub async fn disable(&self) -> Result<()> {
        self.send(Command::Disable).await
    }

    /// Stream of detected triggers. Can be taken once.
    pub fn take_triggers(&mut self) -> Option<mpsc::Receiver<TriggerDetected>> {
        self.triggers.take()
    }

    /// Subscribe to listener state changes.
    pub fn state(&self) -> watch::Receiver<ListenerState> {
        self.state_rx.clone()
    }

    /// Current state without subscribing.
    pub fn current_state(&self) -> ListenerState {
        *self.state_rx.borrow()
    }

    /// Kill the listener task outright (process teardown).
    pub fn abort(&self) {
        self.join.abort();
    }

    async fn send(&self, cmd: Command) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| HavenError::ChannelClosed("listener command channel".into()))
    }
}

struct ListenerTask {
    engine: Arc<dyn SpeechEnginePort>,
    prefs: Arc<dyn PreferencesPort>,
    arbiter: Arc<MicrophoneArbiter>,
    phrase: String,
    enabled: bool,
    lease: Option<MicrophoneLease>,
    state_tx: watch::Sender<ListenerState>,
    trigger_tx: mpsc::Sender<TriggerDetected>,
}

impl ListenerTask {
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<Command>) {
        loop {
            if !self.enabled {
                match cmd_rx.recv().await {
                    Some(Command::Enable { phrase }) => self.handle_enable(phrase).await,
                    Some(Command::Disable) => self.handle_disable().await,
                    None => break,
                }
                continue;
            }

            match self.run_pass(&mut cmd_rx).await {
                PassOutcome::Triggered | PassOutcome::Ended(_) => {
                    // Continuous loop: listen → result → listen again
                    self.set_state(ListenerState::Restarting);
                }
                PassOutcome::Fault(EngineFault::PermissionDenied) => {
                    self.disable_with(DisableReason::PermissionDenied).await;
                }
                PassOutcome::Fault(fault) => {
                    warn!(target: "voice", ?fault, "Fatal recognition fault; disabling trigger");
                    self.disable_with(DisableReason::FatalRecognitionError).await;
                }
                PassOutcome::StartFailed => {
                    self.disable_with(DisableReason::FatalRecognitionError).await;
                }
                PassOutcome::UserDisabled => self.handle_disable().await,
                PassOutcome::Shutdown => break,
            }
        }

        self.release_lease();
        debug!(target: "voice", "Listener task finished");
    }

    /// Run one recognition pass to completion, staying responsive to
    /// commands. Emits at most one trigger, even when both a partial and
    /// the final hypothesis contain the phrase.
    async fn run_pass(&mut self, cmd_rx: &mut mpsc::Receiver<Command>) -> PassOutcome {
        let mut pass_rx = match self.engine.start_pass().await {
            Ok(rx) => rx,
            Err(e) => {
                warn!(target: "voice", error = %e, "Failed to start recognition pass");
                return PassOutcome::StartFailed;
            }
        };
        self.set_state(ListenerState::Listening);

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(Command::Disable) => {
                        self.engine.stop_pass().await;
                        return PassOutcome::UserDisabled;
                    }
                    Some(Command::Enable { phrase }) => {
                        // Already listening; just pick up a phrase change
                        if let Some(p) = phrase {
                            self.phrase = p;
                        }
                    }
                    None => {
                        self.engine.stop_pass().await;
                        return PassOutcome::Shutdown;
                    }
                },
                event = pass_rx.recv() => match event {
                    Some(RecognitionEvent::Ready) => {
                        debug!(target: "voice", "Engine ready");
                    }
                    Some(RecognitionEvent::Partial(text)) | Some(RecognitionEvent::Final(text)) => {
                        if phrase_matches(&self.phrase, &text) {
                            // First match wins for this pass
                            self.engine.stop_pass().await;
                            self.emit_trigger(text).await;
                            return PassOutcome::Triggered;
                        }
                    }
                    Some(RecognitionEvent::Ended(end)) => {
                        debug!(target: "voice", ?end, "Pass ended; restarting");
                        return PassOutcome::Ended(end);
                    }
                    Some(RecognitionEvent::Fault(fault)) => {
                        return PassOutcome::Fault(fault);
                    }
                    // Engine dropped the channel without a terminal event;
                    // treat like a benign end and restart
                    None => return PassOutcome::Ended(PassEnd::EndOfSpeech),
                }
            }
        }
    }

    async fn handle_enable(&mut self, phrase: Option<String>) {
        if let Some(p) = phrase {
            self.phrase = p;
        }
        self.set_state(ListenerState::Idle);

        if !self.engine.microphone_permission_granted() {
            warn!(target: "voice", "Microphone permission not granted; disabling trigger");
            self.persist_enabled(false).await;
            self.set_state(ListenerState::Disabled(DisableReason::PermissionDenied));
            return;
        }

        match self.arbiter.acquire(LeaseHolder::VoiceTrigger) {
            Ok(lease) => {
                self.lease = Some(lease);
                self.enabled = true;
                self.persist_enabled(true).await;
                info!(target: "voice", phrase = %self.phrase, "Voice trigger enabled");
            }
            Err(e) => {
                warn!(target: "voice", error = %e, "Microphone busy; trigger not enabled");
                self.set_state(ListenerState::Disabled(DisableReason::MicrophoneUnavailable));
            }
        }
    }

    async fn handle_disable(&mut self) {
        self.engine.stop_pass().await;
        self.release_lease();
        self.enabled = false;
        self.persist_enabled(false).await;
        self.set_state(ListenerState::Idle);
        info!(target: "voice", "Voice trigger disabled");
    }

    async fn disable_with(&mut self, reason: DisableReason) {
        self.release_lease();
        self.enabled = false;
        // Microphone contention is retryable and does not rewrite the
        // user's choice; the other reasons do, so the UI reflects them
        if reason != DisableReason::MicrophoneUnavailable {
            self.persist_enabled(false).await;
        }
        self.set_state(ListenerState::Disabled(reason));
    }

    async fn emit_trigger(&self, heard: String) {
        info!(target: "voice", phrase = %self.phrase, heard = %heard, "Trigger phrase detected");
        let trigger = TriggerDetected {
            phrase: self.phrase.clone(),
            heard,
            at: Utc::now(),
        };
        if self.trigger_tx.send(trigger).await.is_err() {
            warn!(target: "voice", "No trigger consumer; event dropped");
        }
    }

    async fn persist_enabled(&self, enabled: bool) {
        if let Err(e) = self.prefs.set_voice_trigger(enabled, &self.phrase).await {
            warn!(target: "voice", error = %e, "Failed to persist voice-trigger preference");
        }
    }

    fn release_lease(&mut self) {
        if let Some(lease) = self.lease.take() {
            self.arbiter.release(lease);
        }
    }

    fn set_state(&self, state: ListenerState) {
        let _ = self.state_tx.send(state);
    }
}
