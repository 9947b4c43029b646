use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;
pub mod render;

#[derive(Parser)]
#[command(name = "bpjs-kiosk")]
#[command(about = "Self-service BPJS patient verification kiosk")]
#[command(long_about = "Verifies a patient by BPJS or booking number, walks through application \
                       login, fingerprint check and ticket printing, and narrates every step. \
                       Run 'bpjs-kiosk kiosk' for the interactive terminal kiosk.")]
pub struct Cli {
    /// Configuration file (defaults to bpjs-kiosk.toml in the working directory)
    #[arg(long, global = true, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the interactive terminal kiosk
    Kiosk,
    /// Run one verification session without interaction
    Verify {
        /// BPJS insurance number
        #[arg(long, default_value = "", help = "BPJS insurance number of the patient")]
        bpjs: String,
        /// Booking number
        #[arg(long, default_value = "", help = "Booking number of the appointment")]
        booking: String,
        /// Open the external application after a successful verification
        #[arg(long, help = "Launch the external application for the verified patient")]
        open_app: bool,
        /// Print the final result as JSON
        #[arg(long, help = "Print the verification report as JSON")]
        json: bool,
    },
    /// List the patients in the registry
    Patients {
        /// Print the registry as JSON
        #[arg(long, help = "Print patients as JSON")]
        json: bool,
    },
    /// Write the default configuration to a file
    InitConfig {
        /// Destination file
        #[arg(long, default_value = "bpjs-kiosk.toml", help = "Where to write the configuration")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long, help = "Overwrite the file if it already exists")]
        force: bool,
    },
}
