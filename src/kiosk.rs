//! Kiosk controller
//!
//! Owns the current [`Session`] and carries out the effects its transitions
//! request: starting and cancelling sequencer runs, narrating prompts and
//! launching the external application. Sequencer milestones arrive on a
//! channel and are fed back through the same transition function, so every
//! state change goes through one place. The presentation layer watches the
//! session through [`Kiosk::subscribe`].

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::config::{KioskConfig, SpeechEngineKind};
use crate::external::{ExternalAppLauncher, UrlSchemeLauncher};
use crate::narration::{
    LogSpeechEngine, NarrationChannel, ProcessSpeechEngine, SilentSpeechEngine, SpeechEngine,
};
use crate::observability::{KioskMetrics, OperationTimer};
use crate::prompts;
use crate::registry::PatientRegistry;
use crate::sequencer::{
    Choreography, Sequencer, SequencerHandle, SequencerMessage, SimulatedStepDriver, StepDriver,
};
use crate::session::{Phase, Session, SessionEffect, SessionEvent, VerificationError};
use crate::telemetry;

const HISTORY_LIMIT: usize = 256;

/// Collaborators the kiosk drives
pub struct KioskServices {
    pub registry: Arc<PatientRegistry>,
    pub speech: Arc<dyn SpeechEngine>,
    pub launcher: Arc<dyn ExternalAppLauncher>,
    pub step_driver: Arc<dyn StepDriver>,
}

impl KioskServices {
    /// Production collaborators as described by `config`
    pub fn from_config(config: &KioskConfig, registry: PatientRegistry) -> Self {
        let speech: Arc<dyn SpeechEngine> = match config.narration.engine {
            SpeechEngineKind::Log => Arc::new(LogSpeechEngine),
            SpeechEngineKind::Silent => Arc::new(SilentSpeechEngine),
            SpeechEngineKind::Command => Arc::new(ProcessSpeechEngine::new(
                config.narration.command.clone(),
                config.narration.voice_flag.clone(),
            )),
        };

        Self {
            registry: Arc::new(registry),
            speech,
            launcher: Arc::new(UrlSchemeLauncher::from_config(&config.external_app)),
            step_driver: Arc::new(SimulatedStepDriver),
        }
    }
}

/// One applied phase change, kept for diagnostics
#[derive(Debug, Clone)]
pub struct TransitionRecord {
    pub at: DateTime<Utc>,
    pub from: Phase,
    pub to: Phase,
    pub event: &'static str,
}

/// Single-user kiosk driving one session at a time
pub struct Kiosk {
    session_id: String,
    span: tracing::Span,
    registry: Arc<PatientRegistry>,
    session: Session,
    narration: NarrationChannel,
    launcher: Arc<dyn ExternalAppLauncher>,
    sequencer: Sequencer,
    active_run: Option<SequencerHandle>,
    run_timer: Option<OperationTimer>,
    milestones_tx: mpsc::UnboundedSender<SequencerMessage>,
    milestones_rx: mpsc::UnboundedReceiver<SequencerMessage>,
    state_tx: watch::Sender<Session>,
    history: VecDeque<TransitionRecord>,
    metrics: Arc<KioskMetrics>,
}

impl Kiosk {
    pub fn new(config: &KioskConfig, services: KioskServices) -> Self {
        let session_id = telemetry::generate_correlation_id();
        let span = telemetry::create_session_span(
            "kiosk",
            &session_id,
            &config.kiosk.hospital_name,
        );
        let metrics = Arc::new(KioskMetrics::new());
        let narration = NarrationChannel::new(
            services.speech,
            config.kiosk.locale.clone(),
            &config.narration,
            Arc::clone(&metrics),
        );
        let sequencer = Sequencer::new(
            Choreography::from_timing(&config.timing),
            services.step_driver,
        );
        let (milestones_tx, milestones_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(Session::new());

        Self {
            session_id,
            span,
            registry: services.registry,
            session: Session::new(),
            narration,
            launcher: services.launcher,
            sequencer,
            active_run: None,
            run_timer: None,
            milestones_tx,
            milestones_rx,
            state_tx,
            history: VecDeque::new(),
            metrics,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    pub fn registry(&self) -> &PatientRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &KioskMetrics {
        &self.metrics
    }

    pub fn history(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.history.iter()
    }

    /// Whether a sequencer run is currently live
    pub fn is_sequencer_running(&self) -> bool {
        self.active_run
            .as_ref()
            .is_some_and(SequencerHandle::is_active)
    }

    /// Watch the session; a new value is published after every applied event
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state_tx.subscribe()
    }

    /// Speak the prompt for the current phase (the welcome message on power-on)
    pub fn announce(&mut self) {
        let _enter = self.span.clone().entered();
        self.narration.speak(prompts::phase_prompt(&self.session));
    }

    pub fn start(&mut self) -> Phase {
        self.dispatch(SessionEvent::Start)
    }

    pub fn enter_bpjs(&mut self, value: impl Into<String>) -> Phase {
        self.dispatch(SessionEvent::EditBpjs(value.into()))
    }

    pub fn enter_booking(&mut self, value: impl Into<String>) -> Phase {
        self.dispatch(SessionEvent::EditBooking(value.into()))
    }

    pub fn submit(&mut self) -> Phase {
        self.dispatch(SessionEvent::Submit)
    }

    pub fn try_again(&mut self) -> Phase {
        self.dispatch(SessionEvent::TryAgain)
    }

    pub fn start_over(&mut self) -> Phase {
        self.dispatch(SessionEvent::StartOver)
    }

    pub fn open_external_app(&mut self) -> Phase {
        self.dispatch(SessionEvent::OpenExternalApp)
    }

    /// Apply one event and perform the effects it requests
    pub fn dispatch(&mut self, event: SessionEvent) -> Phase {
        let span = self.span.clone();
        let _enter = span.enter();

        let transition = self.session.transition(&event, &self.registry);
        if !transition.applied {
            return self.session.phase();
        }

        let from = self.session.phase();
        self.session = transition.session;
        let to = self.session.phase();

        if from != to {
            self.record(from, to, event.name());
        }

        for effect in transition.effects {
            self.perform(effect);
        }

        self.state_tx.send_replace(self.session.clone());
        to
    }

    /// Wait for the next sequencer milestone and apply it
    pub async fn process_next_milestone(&mut self) -> Phase {
        // The kiosk holds a sender itself, so the channel never closes
        if let Some(message) = self.milestones_rx.recv().await {
            return self.dispatch(message.into());
        }
        self.session.phase()
    }

    /// Apply milestones until the session leaves `Verifying`
    pub async fn run_until_settled(&mut self) -> Phase {
        while self.session.phase() == Phase::Verifying {
            self.process_next_milestone().await;
        }
        self.session.phase()
    }

    /// Wait until the latest prompt has been handed to the speech engine
    pub async fn flush_narration(&mut self) {
        self.narration.flush().await;
    }

    /// Stop any run and any speech, then log usage
    pub fn shutdown(&mut self) {
        let _enter = self.span.clone().entered();
        self.cancel_active_run();
        self.narration.silence();
        self.metrics.log_stats();
        info!(session_id = %self.session_id, "Kiosk shut down");
    }

    fn perform(&mut self, effect: SessionEffect) {
        match effect {
            SessionEffect::Narrate(utterance) => self.narration.speak(utterance),
            SessionEffect::StartSequencer(run_id) => {
                // A new run always replaces the old one
                self.cancel_active_run();
                self.run_timer = Some(OperationTimer::new("verification_run"));
                self.active_run = Some(self.sequencer.start(run_id, self.milestones_tx.clone()));
            }
            SessionEffect::CancelSequencer => self.cancel_active_run(),
            SessionEffect::LaunchExternalApp { national_id } => {
                self.metrics.record_external_launch();
                self.launcher.notify(&national_id);
            }
        }
    }

    fn cancel_active_run(&mut self) {
        if let Some(handle) = self.active_run.take() {
            handle.cancel();
        }
        if let Some(timer) = self.run_timer.take() {
            timer.finish("cancelled");
        }
    }

    fn record(&mut self, from: Phase, to: Phase, event: &'static str) {
        match to {
            Phase::AwaitingInput if from == Phase::Idle => self.metrics.record_session_started(),
            Phase::Success => {
                self.metrics.record_verification_succeeded();
                self.active_run = None;
                if let Some(timer) = self.run_timer.take() {
                    timer.finish("success");
                }
            }
            Phase::Error => {
                self.metrics.record_verification_failed();
                if self.session.error() == Some(&VerificationError::PatientNotFound) {
                    self.metrics.record_lookup_miss();
                }
                if let Some(timer) = self.run_timer.take() {
                    timer.finish("error");
                }
            }
            _ => {}
        }

        debug!(from = %from, to = %to, event, "Recording transition");
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(TransitionRecord {
            at: Utc::now(),
            from,
            to,
            event,
        });
    }
}
