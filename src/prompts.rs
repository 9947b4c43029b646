// Spoken prompts for each phase and sub-step milestone (Indonesian, id-ID)

use crate::session::{Phase, Session, SubStep};

pub const WELCOME: &str =
    "Selamat datang. Silakan tekan tombol Mulai Verifikasi untuk memulai.";

pub const ENTER_IDENTIFIER: &str = "Silakan masukkan nomor BPJS atau nomor booking Anda pada kolom yang tersedia. Anda dapat menggunakan keyboard atau pemindai barcode.";

pub const PROCESSING: &str = "Sedang memproses. Mohon tunggu.";

/// Prompt announced when a session enters its current phase
pub fn phase_prompt(session: &Session) -> String {
    match session.phase() {
        Phase::Idle => WELCOME.to_string(),
        Phase::AwaitingInput => ENTER_IDENTIFIER.to_string(),
        Phase::Verifying => PROCESSING.to_string(),
        Phase::Success => {
            let name = session
                .matched_patient()
                .map(|patient| patient.name.as_str())
                .unwrap_or_default();
            format!(
                "Verifikasi untuk pasien {name} berhasil. Tiket Anda akan segera dicetak. Silakan ambil tiket Anda."
            )
        }
        Phase::Error => {
            let message = session.error_message().unwrap_or_default();
            format!("Terjadi kesalahan. {message} Silakan coba lagi.")
        }
    }
}

/// Cue spoken when a sub-step succeeds. It also announces the step that starts next,
/// so starting a step speaks nothing of its own.
pub fn step_succeeded_cue(step: SubStep) -> Option<&'static str> {
    match step {
        SubStep::Login => {
            Some("Login berhasil. Silakan letakkan jari Anda pada pemindai sidik jari.")
        }
        SubStep::Fingerprint => Some("Verifikasi sidik jari berhasil. Sedang mencetak tiket."),
        // The success prompt follows immediately
        SubStep::Print => None,
    }
}
