//! Sub-step sequencer
//!
//! Drives one verification run through login, fingerprint and print. Each run
//! is a single tokio task that walks an explicit step list, awaiting the
//! lead-in and the step itself in turn, and reports milestones over a channel.
//! Every emission is gated on the run's [`RunGuard`], so a cancelled run never
//! reaches the session again.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::TimingConfig;
use crate::session::{RunId, SequencerEvent, SessionEvent, SubStep};

#[cfg(test)]
use mockall::automock;

/// Timing of one sub-step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPlan {
    pub step: SubStep,
    /// Pause before the step is marked in progress
    pub lead_in: Duration,
    /// How long the step itself takes
    pub duration: Duration,
}

/// Ordered list of sub-steps for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choreography {
    steps: Vec<StepPlan>,
}

impl Choreography {
    pub fn from_timing(timing: &TimingConfig) -> Self {
        let gap = Duration::from_millis(timing.step_gap_ms);
        Self {
            steps: vec![
                StepPlan {
                    step: SubStep::Login,
                    lead_in: Duration::ZERO,
                    duration: Duration::from_millis(timing.login_ms),
                },
                StepPlan {
                    step: SubStep::Fingerprint,
                    lead_in: gap,
                    duration: Duration::from_millis(timing.fingerprint_ms),
                },
                StepPlan {
                    step: SubStep::Print,
                    lead_in: gap,
                    duration: Duration::from_millis(timing.print_ms),
                },
            ],
        }
    }

    pub fn steps(&self) -> &[StepPlan] {
        &self.steps
    }

    /// Wall time of a run in which every step succeeds
    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|plan| plan.lead_in + plan.duration).sum()
    }
}

impl Default for Choreography {
    fn default() -> Self {
        Self::from_timing(&TimingConfig::default())
    }
}

/// Outcome of performing one sub-step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,
    Failed { reason: String },
}

/// Performs a single sub-step. Real hardware backends plug in here.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StepDriver: Send + Sync {
    async fn perform(&self, plan: &StepPlan) -> StepOutcome;
}

/// Waits the planned duration and succeeds
pub struct SimulatedStepDriver;

#[async_trait]
impl StepDriver for SimulatedStepDriver {
    async fn perform(&self, plan: &StepPlan) -> StepOutcome {
        tokio::time::sleep(plan.duration).await;
        StepOutcome::Succeeded
    }
}

/// A milestone tagged with the run that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerMessage {
    pub run_id: RunId,
    pub event: SequencerEvent,
}

impl From<SequencerMessage> for SessionEvent {
    fn from(message: SequencerMessage) -> Self {
        SessionEvent::Sequencer {
            run_id: message.run_id,
            event: message.event,
        }
    }
}

/// Liveness flag shared between a run's task and its handle
#[derive(Debug, Clone)]
pub struct RunGuard(Arc<AtomicBool>);

impl RunGuard {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn deactivate(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Handle to a running sequencer task. Dropping it cancels the run.
#[derive(Debug)]
pub struct SequencerHandle {
    run_id: RunId,
    guard: RunGuard,
    task: JoinHandle<()>,
}

impl SequencerHandle {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn is_active(&self) -> bool {
        self.guard.is_active() && !self.task.is_finished()
    }

    /// Stop the run. No milestone is emitted after this returns.
    pub fn cancel(&self) {
        if self.guard.is_active() {
            debug!(run_id = %self.run_id, "Cancelling sequencer run");
        }
        self.guard.deactivate();
        self.task.abort();
    }
}

impl Drop for SequencerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Starts sequencer runs with a shared choreography and step driver
#[derive(Clone)]
pub struct Sequencer {
    choreography: Arc<Choreography>,
    driver: Arc<dyn StepDriver>,
}

impl Sequencer {
    pub fn new(choreography: Choreography, driver: Arc<dyn StepDriver>) -> Self {
        Self {
            choreography: Arc::new(choreography),
            driver,
        }
    }

    pub fn simulated(choreography: Choreography) -> Self {
        Self::new(choreography, Arc::new(SimulatedStepDriver))
    }

    pub fn choreography(&self) -> &Choreography {
        &self.choreography
    }

    /// Spawn a run on the current runtime, reporting milestones to `milestones`
    pub fn start(
        &self,
        run_id: RunId,
        milestones: mpsc::UnboundedSender<SequencerMessage>,
    ) -> SequencerHandle {
        let guard = RunGuard::new();
        let task = tokio::spawn(drive(
            run_id,
            Arc::clone(&self.choreography),
            Arc::clone(&self.driver),
            guard.clone(),
            milestones,
        ));

        info!(run_id = %run_id, "Sequencer run started");
        SequencerHandle {
            run_id,
            guard,
            task,
        }
    }
}

async fn drive(
    run_id: RunId,
    choreography: Arc<Choreography>,
    driver: Arc<dyn StepDriver>,
    guard: RunGuard,
    milestones: mpsc::UnboundedSender<SequencerMessage>,
) {
    let emit = |event: SequencerEvent| -> bool {
        if !guard.is_active() {
            debug!(run_id = %run_id, event = ?event, "Dropping milestone from cancelled run");
            return false;
        }
        milestones
            .send(SequencerMessage { run_id, event })
            .is_ok()
    };

    for plan in choreography.steps() {
        if !plan.lead_in.is_zero() {
            tokio::time::sleep(plan.lead_in).await;
        }
        if !emit(SequencerEvent::StepStarted(plan.step)) {
            return;
        }

        match driver.perform(plan).await {
            StepOutcome::Succeeded => {
                debug!(run_id = %run_id, step = ?plan.step, "Sub-step succeeded");
                if !emit(SequencerEvent::StepSucceeded(plan.step)) {
                    return;
                }
            }
            StepOutcome::Failed { reason } => {
                warn!(run_id = %run_id, step = ?plan.step, reason = %reason, "Sub-step failed");
                emit(SequencerEvent::StepFailed {
                    step: plan.step,
                    reason,
                });
                return;
            }
        }
    }

    if emit(SequencerEvent::Completed) {
        info!(run_id = %run_id, "Sequencer run completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn drain(rx: &mut mpsc::UnboundedReceiver<SequencerMessage>) -> Vec<SequencerEvent> {
        let mut events = Vec::new();
        while let Ok(message) = rx.try_recv() {
            events.push(message.event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_emits_milestones_in_order_with_original_timing() {
        let sequencer = Sequencer::simulated(Choreography::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let run_id = RunId::new();
        let started = Instant::now();
        let _handle = sequencer.start(run_id, tx);

        let mut received = Vec::new();
        while let Some(message) = rx.recv().await {
            assert_eq!(message.run_id, run_id);
            let done = message.event == SequencerEvent::Completed;
            received.push((message.event, started.elapsed()));
            if done {
                break;
            }
        }

        let expected = vec![
            (SequencerEvent::StepStarted(SubStep::Login), 0),
            (SequencerEvent::StepSucceeded(SubStep::Login), 1500),
            (SequencerEvent::StepStarted(SubStep::Fingerprint), 2500),
            (SequencerEvent::StepSucceeded(SubStep::Fingerprint), 4500),
            (SequencerEvent::StepStarted(SubStep::Print), 5500),
            (SequencerEvent::StepSucceeded(SubStep::Print), 7000),
            (SequencerEvent::Completed, 7000),
        ];
        assert_eq!(received.len(), expected.len());
        for ((event, at), (expected_event, expected_ms)) in received.iter().zip(expected) {
            assert_eq!(*event, expected_event);
            assert_eq!(at.as_millis(), expected_ms);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_run_emits_nothing_further() {
        let sequencer = Sequencer::simulated(Choreography::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = sequencer.start(RunId::new(), tx);

        // Let login start and finish
        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert_eq!(
            drain(&mut rx),
            vec![
                SequencerEvent::StepStarted(SubStep::Login),
                SequencerEvent::StepSucceeded(SubStep::Login),
            ]
        );

        handle.cancel();
        assert!(!handle.is_active());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_cancels_run() {
        let sequencer = Sequencer::simulated(Choreography::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = sequencer.start(RunId::new(), tx);
        tokio::task::yield_now().await;
        drop(handle);

        tokio::time::sleep(Duration::from_secs(30)).await;
        let events = drain(&mut rx);
        assert!(!events.contains(&SequencerEvent::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_step_short_circuits_remaining_steps() {
        let mut driver = MockStepDriver::new();
        driver.expect_perform().returning(|plan| match plan.step {
            SubStep::Fingerprint => StepOutcome::Failed {
                reason: "sidik jari tidak terbaca".to_string(),
            },
            _ => StepOutcome::Succeeded,
        });

        let sequencer = Sequencer::new(Choreography::default(), Arc::new(driver));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = sequencer.start(RunId::new(), tx);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(
            drain(&mut rx),
            vec![
                SequencerEvent::StepStarted(SubStep::Login),
                SequencerEvent::StepSucceeded(SubStep::Login),
                SequencerEvent::StepStarted(SubStep::Fingerprint),
                SequencerEvent::StepFailed {
                    step: SubStep::Fingerprint,
                    reason: "sidik jari tidak terbaca".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_choreography_follows_timing_config() {
        let timing = TimingConfig {
            login_ms: 10,
            fingerprint_ms: 20,
            print_ms: 30,
            step_gap_ms: 5,
        };
        let choreography = Choreography::from_timing(&timing);
        let steps: Vec<SubStep> = choreography.steps().iter().map(|p| p.step).collect();
        assert_eq!(steps, SubStep::ALL.to_vec());
        assert_eq!(choreography.steps()[0].lead_in, Duration::ZERO);
        assert_eq!(choreography.total_duration(), Duration::from_millis(70));
    }
}
