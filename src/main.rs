use anyhow::Result;
use clap::Parser;

use bpjs_kiosk::cli::commands::init_config::InitConfigCommand;
use bpjs_kiosk::cli::commands::kiosk::KioskCommand;
use bpjs_kiosk::cli::commands::patients::PatientsCommand;
use bpjs_kiosk::cli::commands::verify::VerifyCommand;
use bpjs_kiosk::cli::commands::{show_how_to_use, Command};
use bpjs_kiosk::cli::{Cli, Commands};
use bpjs_kiosk::config::KioskConfig;
use bpjs_kiosk::telemetry::init_telemetry;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_file_loaded = KioskConfig::load_env_file()?;
    let config = KioskConfig::load(cli.config.as_deref())?;
    init_telemetry(&config.observability)?;
    if env_file_loaded {
        tracing::info!("Loaded environment variables from .env file");
    }

    // The kiosk serves one user; a single-threaded runtime is enough
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match cli.command {
        // Default behavior: no subcommand - explain how to use the kiosk
        None => runtime.block_on(async { show_how_to_use().await }),
        Some(Commands::Kiosk) => {
            runtime.block_on(async { KioskCommand::new(config).execute().await })
        }
        Some(Commands::Verify {
            bpjs,
            booking,
            open_app,
            json,
        }) => runtime.block_on(async {
            VerifyCommand::new(config)
                .with_identifiers(bpjs, booking)
                .with_open_app(open_app)
                .with_json(json)
                .execute()
                .await
        }),
        Some(Commands::Patients { json }) => runtime.block_on(async {
            PatientsCommand::new(config).with_json(json).execute().await
        }),
        Some(Commands::InitConfig { path, force }) => runtime.block_on(async {
            InitConfigCommand::new(path).with_force(force).execute().await
        }),
    }
}
