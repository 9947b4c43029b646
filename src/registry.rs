//! Patient registry
//!
//! A static, read-only table of patients searchable by BPJS number or booking
//! number. Records are loaded once at start-up (either the built-in seed or a
//! JSON/TOML data file) and shared behind `Arc` with every session.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// A registered patient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub bpjs_number: String,
    pub booking_number: String,
    pub name: String,
    #[serde(alias = "nik")]
    pub national_id: String,
}

impl Patient {
    pub fn new(
        bpjs_number: impl Into<String>,
        booking_number: impl Into<String>,
        name: impl Into<String>,
        national_id: impl Into<String>,
    ) -> Self {
        Self {
            bpjs_number: bpjs_number.into(),
            booking_number: booking_number.into(),
            name: name.into(),
            national_id: national_id.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Duplicate BPJS number in registry: {0}")]
    DuplicateBpjsNumber(String),
    #[error("Duplicate booking number in registry: {0}")]
    DuplicateBookingNumber(String),
    #[error("Failed to read registry file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON registry: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid TOML registry: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Unsupported registry format '{0}' (expected .json or .toml)")]
    UnsupportedFormat(String),
}

#[derive(Debug, Deserialize)]
struct TomlRegistry {
    #[serde(default)]
    patients: Vec<Patient>,
}

/// In-memory lookup table of patients
#[derive(Debug, Clone, Default)]
pub struct PatientRegistry {
    patients: Vec<Arc<Patient>>,
}

impl PatientRegistry {
    /// Build a registry, rejecting duplicate identifiers.
    ///
    /// Empty identifiers are never matched by [`lookup`](Self::lookup), so they
    /// are exempt from the uniqueness check.
    pub fn from_records(records: Vec<Patient>) -> Result<Self, RegistryError> {
        let mut bpjs_seen = HashSet::new();
        let mut booking_seen = HashSet::new();

        for record in &records {
            if !record.bpjs_number.is_empty() && !bpjs_seen.insert(record.bpjs_number.as_str()) {
                return Err(RegistryError::DuplicateBpjsNumber(record.bpjs_number.clone()));
            }
            if !record.booking_number.is_empty()
                && !booking_seen.insert(record.booking_number.as_str())
            {
                return Err(RegistryError::DuplicateBookingNumber(
                    record.booking_number.clone(),
                ));
            }
        }

        Ok(Self {
            patients: records.into_iter().map(Arc::new).collect(),
        })
    }

    /// The seed data shipped with the kiosk
    pub fn builtin() -> Self {
        Self {
            patients: vec![
                Arc::new(Patient::new(
                    "000111222333",
                    "BOOK001",
                    "Budi Santoso",
                    "3201010101900001",
                )),
                Arc::new(Patient::new(
                    "000444555666",
                    "BOOK002",
                    "Siti Aminah",
                    "3201020202920002",
                )),
                Arc::new(Patient::new(
                    "000777888999",
                    "BOOK003",
                    "Agus Setiawan",
                    "3201030303880003",
                )),
            ],
        }
    }

    /// Load records from a `.json` array or a `.toml` file with `[[patients]]` tables.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let records = match extension.as_str() {
            "json" => serde_json::from_str::<Vec<Patient>>(&contents)?,
            "toml" => toml::from_str::<TomlRegistry>(&contents)?.patients,
            other => return Err(RegistryError::UnsupportedFormat(other.to_string())),
        };

        let registry = Self::from_records(records)?;
        info!(
            path = %path.display(),
            patients = registry.len(),
            "Loaded patient registry"
        );
        Ok(registry)
    }

    /// Find the first record whose BPJS number equals the non-empty `bpjs_number`
    /// or whose booking number equals the non-empty `booking_number`.
    pub fn lookup(&self, bpjs_number: &str, booking_number: &str) -> Option<&Arc<Patient>> {
        let found = self.patients.iter().find(|patient| {
            (!bpjs_number.is_empty() && patient.bpjs_number == bpjs_number)
                || (!booking_number.is_empty() && patient.booking_number == booking_number)
        });

        debug!(
            bpjs_supplied = !bpjs_number.is_empty(),
            booking_supplied = !booking_number.is_empty(),
            found = found.is_some(),
            "Registry lookup"
        );
        found
    }

    pub fn patients(&self) -> impl Iterator<Item = &Patient> {
        self.patients.iter().map(|patient| patient.as_ref())
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }
}
