// Terminal rendering of the kiosk screens

use chrono::{DateTime, Local};

use crate::session::{Phase, Session, SubStep, SubStepStatus, SubStepStatuses};

/// Header line with hospital name and the current date
pub fn render_header(hospital_name: &str, now: DateTime<Local>) -> String {
    format!("🏥 {}  |  {}", hospital_name, now.format("%d-%m-%Y"))
}

pub fn status_marker(status: SubStepStatus) -> &'static str {
    match status {
        SubStepStatus::Pending => "⏳ Menunggu",
        SubStepStatus::InProgress => "🔄 Diproses",
        SubStepStatus::Succeeded => "✅ Berhasil",
        SubStepStatus::Failed => "❌ Gagal",
    }
}

/// Render the screen for the session's current phase
pub fn render_session(session: &Session) -> String {
    let mut lines = Vec::new();

    match session.phase() {
        Phase::Idle => {
            lines.push("BPJS Verification".to_string());
            lines.push("   Ketik 'start' untuk memulai verifikasi".to_string());
        }
        Phase::AwaitingInput => {
            lines.push("📝 Masukkan Data Pasien".to_string());
            lines.push(format!("   Nomor BPJS   : {}", session.input_bpjs()));
            lines.push(format!("   Nomor Booking: {}", session.input_booking()));
            lines.push("   Ketik 'bpjs <nomor>' atau 'booking <nomor>', lalu 'submit'".to_string());
        }
        Phase::Verifying => {
            lines.push("🔍 Proses Verifikasi".to_string());
            lines.extend(render_steps(session));
        }
        Phase::Success => {
            lines.push("✅ Verifikasi Berhasil!".to_string());
            if let Some(patient) = session.matched_patient() {
                lines.push(format!("   👤 Nama Pasien: {}", patient.name));
                lines.push(format!("   📄 No. BPJS   : {}", patient.bpjs_number));
                lines.push(format!("   📄 NIK        : {}", patient.national_id));
            }
            lines.push("   Ketik 'open' untuk membuka aplikasi, 'restart' untuk mulai dari awal".to_string());
        }
        Phase::Error => {
            lines.push("❌ Verifikasi Gagal".to_string());
            lines.push(format!(
                "   {}",
                session
                    .error_message()
                    .unwrap_or_else(|| "Terjadi kesalahan yang tidak diketahui.".to_string())
            ));
            lines.push("   Ketik 'retry' untuk mencoba lagi".to_string());
        }
    }

    lines.join("\n")
}

fn step_line(step: SubStep, status: SubStepStatus) -> String {
    format!("   {:<24} {}", step.label(), status_marker(status))
}

/// One line per sub-step with its status
pub fn render_steps(session: &Session) -> Vec<String> {
    session
        .sub_steps()
        .iter()
        .map(|(step, status)| step_line(step, status))
        .collect()
}

/// Lines for the sub-steps whose status changed since `previous`
pub fn render_progress(previous: &SubStepStatuses, session: &Session) -> Vec<String> {
    session
        .sub_steps()
        .iter()
        .filter(|(step, status)| previous.get(*step) != *status)
        .map(|(step, status)| step_line(step, status))
        .collect()
}
