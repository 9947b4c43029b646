// BPJS Kiosk Library - self-service patient verification
// This exposes the core components for testing and integration

pub mod cli;
pub mod config;
pub mod external;
pub mod kiosk;
pub mod narration;
pub mod observability;
pub mod prompts;
pub mod registry;
pub mod sequencer;
pub mod session;
pub mod shutdown;
pub mod telemetry;

// Re-export key types for easy access
pub use config::KioskConfig;
pub use external::{ExternalAppLauncher, UrlSchemeLauncher};
pub use kiosk::{Kiosk, KioskServices, TransitionRecord};
pub use narration::{NarrationChannel, SpeechEngine};
pub use observability::{KioskMetrics, KioskStats, OperationTimer};
pub use registry::{Patient, PatientRegistry, RegistryError};
pub use sequencer::{Choreography, Sequencer, SequencerHandle, StepDriver, StepOutcome, StepPlan};
pub use session::{
    Phase, RunId, SequencerEvent, Session, SessionEffect, SessionEvent, SubStep, SubStepStatus,
    Transition, VerificationError,
};
pub use telemetry::{create_session_span, generate_correlation_id, init_telemetry};
