use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name (without extension), looked up in the working directory
pub const DEFAULT_CONFIG_NAME: &str = "bpjs-kiosk";

/// Main configuration structure for the kiosk
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct KioskConfig {
    /// Kiosk identity and locale
    pub kiosk: KioskSettings,
    /// Simulated sub-step timings
    pub timing: TimingConfig,
    /// Speech narration settings
    pub narration: NarrationConfig,
    /// External application launch settings
    pub external_app: ExternalAppConfig,
    /// Patient registry source
    pub registry: RegistryConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct KioskSettings {
    /// Locale tag handed to the speech engine
    pub locale: String,
    /// Hospital name shown in the header
    pub hospital_name: String,
}

impl Default for KioskSettings {
    fn default() -> Self {
        Self {
            locale: "id-ID".to_string(),
            hospital_name: "RS. Oto Iskandar Dinata".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Application login duration
    pub login_ms: u64,
    /// Fingerprint verification duration
    pub fingerprint_ms: u64,
    /// Ticket printing duration
    pub print_ms: u64,
    /// Pause between one step succeeding and the next starting
    pub step_gap_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            login_ms: 1500,
            fingerprint_ms: 2000,
            print_ms: 1500,
            step_gap_ms: 1000,
        }
    }
}

/// Which speech engine backs the narration channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechEngineKind {
    /// Print utterances to the terminal and the log
    Log,
    /// Drive a command-line TTS program
    Command,
    /// Discard utterances
    Silent,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NarrationConfig {
    pub engine: SpeechEngineKind,
    /// Interval between "still speaking?" polls after a cancel
    pub poll_interval_ms: u64,
    /// Give up waiting for the engine to go idle after this long
    pub max_wait_ms: u64,
    /// TTS program for the `command` engine
    pub command: String,
    /// Flag used to pass the voice/language to the TTS program
    pub voice_flag: String,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            engine: SpeechEngineKind::Log,
            poll_interval_ms: 100,
            max_wait_ms: 5000,
            command: "espeak-ng".to_string(),
            voice_flag: "-v".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExternalAppConfig {
    /// Custom URL scheme of the external application
    pub scheme: String,
    /// Program that opens URLs; unset means launches are only logged
    pub opener: Option<String>,
}

impl Default for ExternalAppConfig {
    fn default() -> Self {
        Self {
            scheme: "frista".to_string(),
            opener: Some("xdg-open".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// JSON or TOML patient file; the built-in registry is used when unset
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            json_logs: false,
        }
    }
}

impl KioskConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (`path`, or bpjs-kiosk.toml in the working directory)
    /// 3. Environment variables (BPJS_KIOSK__SECTION__KEY)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&KioskConfig::default())?);

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path).required(true));
            }
            None => {
                if Path::new(&format!("{DEFAULT_CONFIG_NAME}.toml")).exists() {
                    builder = builder.add_source(File::with_name(DEFAULT_CONFIG_NAME));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("BPJS_KIOSK")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;
        let kiosk_config: KioskConfig = config
            .try_deserialize()
            .context("Failed to parse configuration")?;

        Ok(kiosk_config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists; returns whether one was loaded.
    ///
    /// Runs before logging is set up, so the caller reports the outcome.
    pub fn load_env_file() -> Result<bool> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            return Ok(true);
        }
        Ok(false)
    }
}
