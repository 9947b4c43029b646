// Verification Session Module - Pure State Machine
//
// Phases, sub-step progress and the transition function. Side effects
// (narration, sequencer runs, external launches) are returned as data and
// carried out by the kiosk controller.

pub mod state_machine;
pub mod types;

pub use state_machine::{Session, Transition};
pub use types::{
    Phase, RunId, SequencerEvent, SessionEffect, SessionEvent, StatusRegression, SubStep,
    SubStepStatus, SubStepStatuses, VerificationError,
};
