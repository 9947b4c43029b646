use std::sync::Arc;
use tracing::{debug, info, warn};

use super::types::*;
use crate::prompts;
use crate::registry::{Patient, PatientRegistry};

/// Mutable state of one verification attempt
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    phase: Phase,
    input_bpjs: String,
    input_booking: String,
    matched_patient: Option<Arc<Patient>>,
    error: Option<VerificationError>,
    sub_steps: SubStepStatuses,
    run_id: Option<RunId>,
}

/// Result of applying one event: the next session plus the effects to perform
#[derive(Debug, Clone)]
pub struct Transition {
    pub session: Session,
    pub effects: Vec<SessionEffect>,
    pub applied: bool,
}

impl Transition {
    fn to(session: Session, effects: Vec<SessionEffect>) -> Self {
        Self {
            session,
            effects,
            applied: true,
        }
    }

    fn ignored(session: &Session) -> Self {
        Self {
            session: session.clone(),
            effects: Vec::new(),
            applied: false,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn input_bpjs(&self) -> &str {
        &self.input_bpjs
    }

    pub fn input_booking(&self) -> &str {
        &self.input_booking
    }

    pub fn matched_patient(&self) -> Option<&Patient> {
        self.matched_patient.as_deref()
    }

    pub fn error(&self) -> Option<&VerificationError> {
        self.error.as_ref()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }

    pub fn sub_steps(&self) -> &SubStepStatuses {
        &self.sub_steps
    }

    pub fn sub_step(&self, step: SubStep) -> SubStepStatus {
        self.sub_steps.get(step)
    }

    pub fn run_id(&self) -> Option<RunId> {
        self.run_id
    }

    /// A fresh session sitting in `phase`
    fn reset_to(phase: Phase) -> Self {
        Self {
            phase,
            ..Default::default()
        }
    }

    fn enter_error(error: VerificationError) -> Self {
        Self {
            error: Some(error),
            ..Self::reset_to(Phase::Error)
        }
    }

    fn announce(next: Session, mut effects: Vec<SessionEffect>) -> Transition {
        effects.push(SessionEffect::Narrate(prompts::phase_prompt(&next)));
        Transition::to(next, effects)
    }

    /// Apply `event` to this session.
    ///
    /// Pure apart from minting a fresh [`RunId`] on a successful submit: the
    /// current session is never mutated and every side effect is returned as
    /// a [`SessionEffect`] for the caller to perform.
    pub fn transition(&self, event: &SessionEvent, registry: &PatientRegistry) -> Transition {
        let outcome = match (self.phase, event) {
            (Phase::Idle, SessionEvent::Start) => {
                Self::announce(Self::reset_to(Phase::AwaitingInput), vec![])
            }

            (Phase::AwaitingInput, SessionEvent::EditBpjs(value)) => {
                let mut next = self.clone();
                next.input_bpjs = value.clone();
                Transition::to(next, vec![])
            }

            (Phase::AwaitingInput, SessionEvent::EditBooking(value)) => {
                let mut next = self.clone();
                next.input_booking = value.clone();
                Transition::to(next, vec![])
            }

            (Phase::AwaitingInput, SessionEvent::Submit) => self.submit(registry),

            (Phase::Verifying, SessionEvent::Sequencer { run_id, event }) => {
                if self.run_id != Some(*run_id) {
                    debug!(
                        run_id = %run_id,
                        active_run = ?self.run_id.map(|id| id.to_string()),
                        "Ignoring milestone from inactive run"
                    );
                    return Transition::ignored(self);
                }
                self.apply_milestone(event)
            }

            (Phase::Error, SessionEvent::TryAgain) => Self::announce(
                Self::reset_to(Phase::AwaitingInput),
                vec![SessionEffect::CancelSequencer],
            ),

            (
                Phase::AwaitingInput | Phase::Verifying | Phase::Success | Phase::Error,
                SessionEvent::StartOver,
            ) => Self::announce(
                Self::reset_to(Phase::Idle),
                vec![SessionEffect::CancelSequencer],
            ),

            (Phase::Success, SessionEvent::OpenExternalApp) => match &self.matched_patient {
                Some(patient) => Transition::to(
                    self.clone(),
                    vec![SessionEffect::LaunchExternalApp {
                        national_id: patient.national_id.clone(),
                    }],
                ),
                None => Transition::ignored(self),
            },

            _ => Transition::ignored(self),
        };

        if outcome.applied && outcome.session.phase != self.phase {
            info!(
                from = %self.phase,
                to = %outcome.session.phase,
                event = event.name(),
                "Session phase transition"
            );
        } else if !outcome.applied {
            debug!(phase = %self.phase, event = event.name(), "Event not applicable in phase");
        }

        outcome
    }

    fn submit(&self, registry: &PatientRegistry) -> Transition {
        if self.input_bpjs.is_empty() && self.input_booking.is_empty() {
            return Self::announce(Self::enter_error(VerificationError::EmptyInput), vec![]);
        }

        let Some(patient) = registry.lookup(&self.input_bpjs, &self.input_booking) else {
            return Self::announce(Self::enter_error(VerificationError::PatientNotFound), vec![]);
        };

        let run_id = RunId::new();
        let next = Self {
            phase: Phase::Verifying,
            matched_patient: Some(Arc::clone(patient)),
            sub_steps: SubStepStatuses::default(),
            run_id: Some(run_id),
            ..Default::default()
        };
        Self::announce(next, vec![SessionEffect::StartSequencer(run_id)])
    }

    fn apply_milestone(&self, event: &SequencerEvent) -> Transition {
        let mut next = self.clone();

        match event {
            SequencerEvent::StepStarted(step) => {
                if !self.sub_steps.ready_to_start(*step) {
                    warn!(step = ?step, "Sub-step started out of order, ignoring");
                    return Transition::ignored(self);
                }
                if next.sub_steps.advance(*step, SubStepStatus::InProgress).is_err() {
                    return Transition::ignored(self);
                }
                // Already announced by the verifying prompt or the previous completion cue
                Transition::to(next, vec![])
            }

            SequencerEvent::StepSucceeded(step) => {
                if let Err(e) = next.sub_steps.advance(*step, SubStepStatus::Succeeded) {
                    warn!(error = %e, "Rejected sub-step status update");
                    return Transition::ignored(self);
                }
                let effects = prompts::step_succeeded_cue(*step)
                    .map(|cue| vec![SessionEffect::Narrate(cue.to_string())])
                    .unwrap_or_default();
                Transition::to(next, effects)
            }

            SequencerEvent::StepFailed { step, reason } => {
                if let Err(e) = next.sub_steps.advance(*step, SubStepStatus::Failed) {
                    warn!(error = %e, "Rejected sub-step status update");
                    return Transition::ignored(self);
                }
                // Keep the per-step statuses so the failed step stays visible
                let failed = Self {
                    phase: Phase::Error,
                    error: Some(VerificationError::SubStepFailure {
                        step: *step,
                        reason: reason.clone(),
                    }),
                    sub_steps: next.sub_steps,
                    ..Default::default()
                };
                Self::announce(failed, vec![SessionEffect::CancelSequencer])
            }

            SequencerEvent::Completed => {
                if !self.sub_steps.all_succeeded() {
                    warn!("Sequencer reported completion before every sub-step succeeded");
                    return Transition::ignored(self);
                }
                next.phase = Phase::Success;
                next.run_id = None;
                Self::announce(next, vec![])
            }
        }
    }
}
