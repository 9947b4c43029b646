use anyhow::Result;

use super::{load_registry, Command};
use crate::config::KioskConfig;

pub struct PatientsCommand {
    pub config: KioskConfig,
    pub json: bool,
}

impl PatientsCommand {
    pub fn new(config: KioskConfig) -> Self {
        Self {
            config,
            json: false,
        }
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

impl Command for PatientsCommand {
    async fn execute(&self) -> Result<()> {
        let registry = load_registry(&self.config)?;

        if self.json {
            let patients: Vec<_> = registry.patients().collect();
            println!("{}", serde_json::to_string_pretty(&patients)?);
            return Ok(());
        }

        if registry.is_empty() {
            println!("📋 No patients registered");
            return Ok(());
        }

        println!("📋 Registered patients ({}):", registry.len());
        println!();
        for patient in registry.patients() {
            println!("   👤 {}", patient.name);
            println!("      No. BPJS   : {}", patient.bpjs_number);
            println!("      No. Booking: {}", patient.booking_number);
            println!("      NIK        : {}", patient.national_id);
        }
        Ok(())
    }
}
