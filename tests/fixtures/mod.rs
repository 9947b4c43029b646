//! Test doubles for driving a kiosk without speakers, devices or a desktop

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::sleep;

use bpjs_kiosk::config::KioskConfig;
use bpjs_kiosk::external::ExternalAppLauncher;
use bpjs_kiosk::kiosk::{Kiosk, KioskServices};
use bpjs_kiosk::narration::SpeechEngine;
use bpjs_kiosk::registry::PatientRegistry;
use bpjs_kiosk::sequencer::{SimulatedStepDriver, StepDriver, StepOutcome, StepPlan};
use bpjs_kiosk::session::SubStep;

/// Speech engine that records what it was asked to say
#[derive(Default)]
pub struct FakeSpeechEngine {
    spoken: Mutex<Vec<(String, String)>>,
    speaking: AtomicBool,
    cancellations: AtomicUsize,
}

impl FakeSpeechEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Pretend an earlier utterance is still playing
    pub fn set_speaking(&self, speaking: bool) {
        self.speaking.store(speaking, Ordering::SeqCst);
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .map(|(utterance, _)| utterance.clone())
            .collect()
    }

    pub fn locales(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .map(|(_, locale)| locale.clone())
            .collect()
    }

    pub fn cancellations(&self) -> usize {
        self.cancellations.load(Ordering::SeqCst)
    }
}

impl SpeechEngine for FakeSpeechEngine {
    fn cancel_all(&self) {
        self.cancellations.fetch_add(1, Ordering::SeqCst);
    }

    fn speak(&self, utterance: &str, locale: &str) {
        self.spoken
            .lock()
            .unwrap()
            .push((utterance.to_string(), locale.to_string()));
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }
}

/// Launcher that remembers every national ID it was handed
#[derive(Default)]
pub struct RecordingLauncher {
    launched: Mutex<Vec<String>>,
}

impl RecordingLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn launched(&self) -> Vec<String> {
        self.launched.lock().unwrap().clone()
    }
}

impl ExternalAppLauncher for RecordingLauncher {
    fn notify(&self, national_id: &str) {
        self.launched.lock().unwrap().push(national_id.to_string());
    }
}

/// Step driver that fails one chosen step after its normal duration
pub struct FailingStepDriver {
    pub failing_step: SubStep,
    pub reason: String,
}

#[async_trait]
impl StepDriver for FailingStepDriver {
    async fn perform(&self, plan: &StepPlan) -> StepOutcome {
        sleep(plan.duration).await;
        if plan.step == self.failing_step {
            StepOutcome::Failed {
                reason: self.reason.clone(),
            }
        } else {
            StepOutcome::Succeeded
        }
    }
}

/// Kiosk plus handles on its test doubles
pub struct TestKiosk {
    pub kiosk: Kiosk,
    pub speech: Arc<FakeSpeechEngine>,
    pub launcher: Arc<RecordingLauncher>,
}

pub fn test_kiosk() -> TestKiosk {
    test_kiosk_with_driver(Arc::new(SimulatedStepDriver))
}

pub fn test_kiosk_with_driver(step_driver: Arc<dyn StepDriver>) -> TestKiosk {
    let speech = FakeSpeechEngine::new();
    let launcher = RecordingLauncher::new();
    let services = KioskServices {
        registry: Arc::new(PatientRegistry::builtin()),
        speech: speech.clone(),
        launcher: launcher.clone(),
        step_driver,
    };

    TestKiosk {
        kiosk: Kiosk::new(&KioskConfig::default(), services),
        speech,
        launcher,
    }
}
