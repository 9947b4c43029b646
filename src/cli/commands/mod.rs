use anyhow::{Context, Result};
use std::path::Path;

use crate::config::KioskConfig;
use crate::kiosk::{Kiosk, KioskServices};
use crate::registry::PatientRegistry;

pub mod init_config;
pub mod kiosk;
pub mod patients;
pub mod verify;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

/// Registry named by the configuration, or the built-in one
pub fn load_registry(config: &KioskConfig) -> Result<PatientRegistry> {
    match &config.registry.path {
        Some(path) => PatientRegistry::load_from_file(Path::new(path))
            .with_context(|| format!("Failed to load patient registry from {path}")),
        None => Ok(PatientRegistry::builtin()),
    }
}

/// Kiosk wired with the production collaborators
pub fn build_kiosk(config: &KioskConfig) -> Result<Kiosk> {
    let registry = load_registry(config)?;
    tracing::debug!(patients = registry.len(), "Patient registry loaded");
    Ok(Kiosk::new(config, KioskServices::from_config(config, registry)))
}

pub async fn show_how_to_use() -> Result<()> {
    println!("🏥 BPJS Kiosk - Self-service patient verification");
    println!();
    println!("To get started:");
    println!("  🖥️  bpjs-kiosk kiosk                     # Run the interactive kiosk");
    println!("  🔍 bpjs-kiosk verify --bpjs <nomor>      # Verify one patient");
    println!("  📋 bpjs-kiosk patients                   # List registered patients");
    println!();
    println!("Admin commands:");
    println!("  ⚙️  bpjs-kiosk init-config               # Write the default configuration");
    println!();
    println!("💡 Start with 'bpjs-kiosk kiosk' to open the kiosk screen!");
    Ok(())
}
