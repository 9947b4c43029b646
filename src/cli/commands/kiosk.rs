use anyhow::{anyhow, Result};
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use super::{build_kiosk, Command};
use crate::cli::render;
use crate::config::KioskConfig;
use crate::kiosk::Kiosk;
use crate::session::Phase;
use crate::shutdown;

/// One line typed at the kiosk prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KioskInput {
    Start,
    Bpjs(String),
    Booking(String),
    Submit,
    Retry,
    Restart,
    Open,
    Status,
    Help,
    Quit,
}

impl FromStr for KioskInput {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let input = match word.to_lowercase().as_str() {
            "start" | "mulai" => KioskInput::Start,
            // An empty value clears the field
            "bpjs" => KioskInput::Bpjs(rest.to_string()),
            "booking" => KioskInput::Booking(rest.to_string()),
            "submit" | "verify" => KioskInput::Submit,
            "retry" => KioskInput::Retry,
            "restart" | "reset" => KioskInput::Restart,
            "open" => KioskInput::Open,
            "status" => KioskInput::Status,
            "help" | "?" => KioskInput::Help,
            "quit" | "exit" => KioskInput::Quit,
            other => return Err(anyhow!("Unknown command '{other}'")),
        };
        Ok(input)
    }
}

pub struct KioskCommand {
    pub config: KioskConfig,
}

impl KioskCommand {
    pub fn new(config: KioskConfig) -> Self {
        Self { config }
    }

    fn print_help() {
        println!("Perintah:");
        println!("  start              Mulai verifikasi");
        println!("  bpjs <nomor>       Isi Nomor BPJS");
        println!("  booking <nomor>    Isi Nomor Booking");
        println!("  submit             Verifikasi data pasien");
        println!("  retry              Coba lagi setelah gagal");
        println!("  restart            Kembali ke layar awal");
        println!("  open               Buka aplikasi eksternal");
        println!("  status             Tampilkan layar saat ini");
        println!("  quit               Keluar");
    }

    fn show(&self, kiosk: &Kiosk) {
        println!();
        println!(
            "{}",
            render::render_header(&self.config.kiosk.hospital_name, chrono::Local::now())
        );
        println!("{}", render::render_session(kiosk.session()));
        println!();
    }

    /// Apply one input; returns false when the kiosk should close
    fn handle(&self, kiosk: &mut Kiosk, input: KioskInput) -> bool {
        let before = kiosk.session().clone();
        match input {
            KioskInput::Start => {
                kiosk.start();
            }
            KioskInput::Bpjs(value) => {
                kiosk.enter_bpjs(value);
            }
            KioskInput::Booking(value) => {
                kiosk.enter_booking(value);
            }
            KioskInput::Submit => {
                kiosk.submit();
            }
            KioskInput::Retry => {
                kiosk.try_again();
            }
            KioskInput::Restart => {
                kiosk.start_over();
            }
            KioskInput::Open => {
                // Launching leaves the session untouched
                if kiosk.phase() == Phase::Success {
                    kiosk.open_external_app();
                    println!("🚀 Membuka aplikasi eksternal...");
                } else {
                    println!("⚠️  Aplikasi hanya dapat dibuka setelah verifikasi berhasil");
                }
                return true;
            }
            KioskInput::Status => {
                self.show(kiosk);
                return true;
            }
            KioskInput::Help => {
                Self::print_help();
                return true;
            }
            KioskInput::Quit => return false,
        }

        if *kiosk.session() == before {
            println!("⚠️  Perintah tidak tersedia di layar ini (ketik 'help')");
        } else {
            self.show(kiosk);
        }
        true
    }
}

impl Command for KioskCommand {
    async fn execute(&self) -> Result<()> {
        let mut kiosk = build_kiosk(&self.config)?;
        debug!(session_id = kiosk.session_id(), "Interactive kiosk starting");

        self.show(&kiosk);
        kiosk.announce();
        println!("💡 Ketik 'help' untuk daftar perintah");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let shutdown = shutdown::wait_for_shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match line.parse::<KioskInput>() {
                        Ok(input) => {
                            if !self.handle(&mut kiosk, input) {
                                break;
                            }
                        }
                        Err(e) => println!("❌ {e} (ketik 'help')"),
                    }
                }
                _ = kiosk.process_next_milestone(), if kiosk.phase() == Phase::Verifying => {
                    self.show(&kiosk);
                }
                result = &mut shutdown => {
                    if let Err(e) = result {
                        warn!(error = %e, "Signal handler failed");
                    }
                    break;
                }
            }
        }

        kiosk.shutdown();
        println!("👋 Sampai jumpa!");
        Ok(())
    }
}
