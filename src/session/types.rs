// Core types for the verification session state machine

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Top-level phase of a verification session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Welcome screen, nothing entered yet
    #[default]
    Idle,
    /// Waiting for a BPJS or booking number
    AwaitingInput,
    /// Patient matched, sub-steps running
    Verifying,
    /// All sub-steps completed
    Success,
    /// Input rejected or a sub-step failed
    Error,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::AwaitingInput => "awaiting_input",
            Phase::Verifying => "verifying",
            Phase::Success => "success",
            Phase::Error => "error",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the simulated verification actions, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubStep {
    Login,
    Fingerprint,
    Print,
}

impl SubStep {
    pub const ALL: [SubStep; 3] = [SubStep::Login, SubStep::Fingerprint, SubStep::Print];

    /// Position in the pipeline
    pub fn index(&self) -> usize {
        match self {
            SubStep::Login => 0,
            SubStep::Fingerprint => 1,
            SubStep::Print => 2,
        }
    }

    /// Label shown on the progress screen
    pub fn label(&self) -> &'static str {
        match self {
            SubStep::Login => "Login Aplikasi",
            SubStep::Fingerprint => "Verifikasi Sidik Jari",
            SubStep::Print => "Cetak Tiket",
        }
    }

    /// Steps that must have succeeded before this one may start
    pub fn predecessors(&self) -> &'static [SubStep] {
        &Self::ALL[..self.index()]
    }
}

impl fmt::Display for SubStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-step progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubStepStatus {
    #[default]
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

impl SubStepStatus {
    /// Statuses only move forward: Pending -> InProgress -> {Succeeded | Failed}
    pub fn can_advance_to(&self, next: SubStepStatus) -> bool {
        matches!(
            (self, next),
            (SubStepStatus::Pending, SubStepStatus::InProgress)
                | (SubStepStatus::InProgress, SubStepStatus::Succeeded)
                | (SubStepStatus::InProgress, SubStepStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubStepStatus::Succeeded | SubStepStatus::Failed)
    }
}

/// Raised when a status update would move a step backwards or skip ahead
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Sub-step {step:?} cannot move from {from:?} to {to:?}")]
pub struct StatusRegression {
    pub step: SubStep,
    pub from: SubStepStatus,
    pub to: SubStepStatus,
}

/// Status of all three sub-steps of one verification run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubStepStatuses {
    statuses: [SubStepStatus; 3],
}

impl SubStepStatuses {
    pub fn get(&self, step: SubStep) -> SubStepStatus {
        self.statuses[step.index()]
    }

    pub fn advance(&mut self, step: SubStep, to: SubStepStatus) -> Result<(), StatusRegression> {
        let from = self.get(step);
        if !from.can_advance_to(to) {
            return Err(StatusRegression { step, from, to });
        }
        self.statuses[step.index()] = to;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (SubStep, SubStepStatus)> + '_ {
        SubStep::ALL.iter().map(move |step| (*step, self.get(*step)))
    }

    pub fn all_succeeded(&self) -> bool {
        self.statuses.iter().all(|s| *s == SubStepStatus::Succeeded)
    }

    /// True when `step` may be started: pending, with every predecessor succeeded
    pub fn ready_to_start(&self, step: SubStep) -> bool {
        self.get(step) == SubStepStatus::Pending
            && step
                .predecessors()
                .iter()
                .all(|p| self.get(*p) == SubStepStatus::Succeeded)
    }

    /// True when the succeeded steps form a prefix of the pipeline
    pub fn succeeded_form_prefix(&self) -> bool {
        let prefix = self
            .statuses
            .iter()
            .take_while(|s| **s == SubStepStatus::Succeeded)
            .count();
        self.statuses[prefix..]
            .iter()
            .all(|s| *s != SubStepStatus::Succeeded)
    }
}

/// Identifies one run of the sub-step sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Recoverable verification errors. The display text is what the kiosk shows and speaks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("Mohon isi Nomor BPJS atau Nomor Booking.")]
    EmptyInput,
    #[error("Data pasien tidak ditemukan.")]
    PatientNotFound,
    #[error("{step} gagal: {reason}")]
    SubStepFailure { step: SubStep, reason: String },
}

/// Milestones reported by the sequencer while a run is active
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerEvent {
    StepStarted(SubStep),
    StepSucceeded(SubStep),
    StepFailed { step: SubStep, reason: String },
    Completed,
}

/// Inputs to the session state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Start,
    EditBpjs(String),
    EditBooking(String),
    Submit,
    Sequencer { run_id: RunId, event: SequencerEvent },
    TryAgain,
    StartOver,
    OpenExternalApp,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Start => "start",
            SessionEvent::EditBpjs(_) => "edit_bpjs",
            SessionEvent::EditBooking(_) => "edit_booking",
            SessionEvent::Submit => "submit",
            SessionEvent::Sequencer { event, .. } => match event {
                SequencerEvent::StepStarted(_) => "step_started",
                SequencerEvent::StepSucceeded(_) => "step_succeeded",
                SequencerEvent::StepFailed { .. } => "step_failed",
                SequencerEvent::Completed => "sequence_completed",
            },
            SessionEvent::TryAgain => "try_again",
            SessionEvent::StartOver => "start_over",
            SessionEvent::OpenExternalApp => "open_external_app",
        }
    }
}

/// Side effects requested by a transition, carried out by the kiosk controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    Narrate(String),
    StartSequencer(RunId),
    CancelSequencer,
    LaunchExternalApp { national_id: String },
}
