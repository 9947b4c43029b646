use anyhow::{bail, Result};
use serde::Serialize;

use super::{build_kiosk, Command};
use crate::cli::render;
use crate::config::{KioskConfig, SpeechEngineKind};
use crate::registry::Patient;
use crate::session::{Phase, Session, SubStepStatus};

/// Final state of a non-interactive verification
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub phase: Phase,
    pub patient: Option<Patient>,
    pub error: Option<String>,
    pub steps: Vec<StepReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: &'static str,
    pub status: SubStepStatus,
}

impl VerificationReport {
    pub fn from_session(session: &Session) -> Self {
        Self {
            phase: session.phase(),
            patient: session.matched_patient().cloned(),
            error: session.error_message(),
            steps: session
                .sub_steps()
                .iter()
                .map(|(step, status)| StepReport {
                    step: step.label(),
                    status,
                })
                .collect(),
        }
    }
}

pub struct VerifyCommand {
    pub config: KioskConfig,
    pub bpjs: String,
    pub booking: String,
    pub open_app: bool,
    pub json: bool,
}

impl VerifyCommand {
    pub fn new(config: KioskConfig) -> Self {
        Self {
            config,
            bpjs: String::new(),
            booking: String::new(),
            open_app: false,
            json: false,
        }
    }

    pub fn with_identifiers(mut self, bpjs: impl Into<String>, booking: impl Into<String>) -> Self {
        self.bpjs = bpjs.into();
        self.booking = booking.into();
        self
    }

    pub fn with_open_app(mut self, open_app: bool) -> Self {
        self.open_app = open_app;
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

impl Command for VerifyCommand {
    async fn execute(&self) -> Result<()> {
        let mut config = self.config.clone();
        if self.json {
            // Stdout carries only the report
            config.narration.engine = SpeechEngineKind::Silent;
        }
        let mut kiosk = build_kiosk(&config)?;

        if !self.json {
            println!(
                "{}",
                render::render_header(&self.config.kiosk.hospital_name, chrono::Local::now())
            );
            println!("🔍 Verifying patient...");
            println!();
        }

        kiosk.start();
        kiosk.enter_bpjs(self.bpjs.as_str());
        kiosk.enter_booking(self.booking.as_str());
        kiosk.submit();

        let mut shown = kiosk.session().sub_steps().clone();
        while kiosk.phase() == Phase::Verifying {
            kiosk.process_next_milestone().await;
            if !self.json {
                for line in render::render_progress(&shown, kiosk.session()) {
                    println!("{line}");
                }
            }
            shown = kiosk.session().sub_steps().clone();
        }
        let phase = kiosk.phase();

        if phase == Phase::Success && self.open_app {
            kiosk.open_external_app();
        }
        kiosk.flush_narration().await;

        let report = VerificationReport::from_session(kiosk.session());
        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!();
            println!("{}", render::render_session(kiosk.session()));
        }

        kiosk.shutdown();

        if phase != Phase::Success {
            bail!(
                "Verification failed: {}",
                report.error.unwrap_or_else(|| phase.to_string())
            );
        }
        Ok(())
    }
}
