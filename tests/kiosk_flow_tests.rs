//! End-to-end kiosk sessions on paused tokio time
//!
//! Sub-step timings run on the virtual clock, so a full verification takes
//! exactly its configured 7 seconds without any real waiting.

mod fixtures;

use std::sync::Arc;
use tokio::time::{timeout, Duration, Instant};

use bpjs_kiosk::prompts;
use bpjs_kiosk::session::{Phase, Session, SubStep, SubStepStatus, VerificationError};
use fixtures::{test_kiosk, test_kiosk_with_driver, FailingStepDriver};

#[tokio::test(start_paused = true)]
async fn test_budi_verifies_by_bpjs_number() {
    let mut t = test_kiosk();

    assert_eq!(t.kiosk.start(), Phase::AwaitingInput);
    t.kiosk.enter_bpjs("000111222333");
    let started = Instant::now();
    assert_eq!(t.kiosk.submit(), Phase::Verifying);
    assert!(t.kiosk.is_sequencer_running());

    let phase = t.kiosk.run_until_settled().await;
    let elapsed = started.elapsed();

    assert_eq!(phase, Phase::Success);
    assert!(elapsed >= Duration::from_millis(7000), "took {elapsed:?}");
    assert!(elapsed < Duration::from_millis(7100), "took {elapsed:?}");

    let session = t.kiosk.session();
    assert_eq!(session.matched_patient().unwrap().name, "Budi Santoso");
    assert!(session.sub_steps().all_succeeded());
    assert!(session.run_id().is_none());

    t.kiosk.flush_narration().await;
    let spoken = t.speech.spoken();
    assert!(spoken.last().unwrap().contains("Budi Santoso"));
    assert!(t.speech.locales().iter().all(|locale| locale == "id-ID"));
}

#[tokio::test(start_paused = true)]
async fn test_verifies_by_booking_number_alone() {
    let mut t = test_kiosk();

    t.kiosk.start();
    t.kiosk.enter_booking("BOOK002");
    t.kiosk.submit();

    assert_eq!(t.kiosk.run_until_settled().await, Phase::Success);
    assert_eq!(
        t.kiosk.session().matched_patient().unwrap().name,
        "Siti Aminah"
    );
}

#[tokio::test(start_paused = true)]
async fn test_unknown_booking_is_reported_without_running_steps() {
    let mut t = test_kiosk();

    t.kiosk.start();
    t.kiosk.enter_booking("BOOK999");
    assert_eq!(t.kiosk.submit(), Phase::Error);

    assert_eq!(
        t.kiosk.session().error(),
        Some(&VerificationError::PatientNotFound)
    );
    assert!(!t.kiosk.is_sequencer_running());
    assert!(t
        .kiosk
        .session()
        .sub_steps()
        .iter()
        .all(|(_, status)| status == SubStepStatus::Pending));

    t.kiosk.flush_narration().await;
    let spoken = t.speech.spoken();
    assert_eq!(
        spoken.last().unwrap(),
        "Terjadi kesalahan. Data pasien tidak ditemukan. Silakan coba lagi."
    );

    let stats = t.kiosk.metrics().get_stats();
    assert_eq!(stats.lookup_misses, 1);
    assert_eq!(stats.verifications_failed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_input_asks_for_an_identifier() {
    let mut t = test_kiosk();

    t.kiosk.start();
    t.kiosk.enter_bpjs("");
    assert_eq!(t.kiosk.submit(), Phase::Error);
    assert_eq!(
        t.kiosk.session().error_message().as_deref(),
        Some("Mohon isi Nomor BPJS atau Nomor Booking.")
    );
}

#[tokio::test(start_paused = true)]
async fn test_sub_steps_progress_in_order() {
    let mut t = test_kiosk();
    let mut screens = t.kiosk.subscribe();

    t.kiosk.start();
    t.kiosk.enter_bpjs("000444555666");
    t.kiosk.submit();

    let mut observed = Vec::new();
    while t.kiosk.phase() == Phase::Verifying {
        t.kiosk.process_next_milestone().await;
        let session = screens.borrow_and_update().clone();
        assert!(session.sub_steps().succeeded_form_prefix());
        observed.push(
            SubStep::ALL
                .iter()
                .map(|step| session.sub_step(*step))
                .collect::<Vec<_>>(),
        );
    }

    use SubStepStatus::*;
    assert_eq!(observed.first().unwrap(), &vec![InProgress, Pending, Pending]);
    assert_eq!(observed[1], vec![Succeeded, Pending, Pending]);
    assert_eq!(observed.last().unwrap(), &vec![Succeeded, Succeeded, Succeeded]);
    assert_eq!(screens.borrow().phase(), Phase::Success);
}

#[tokio::test(start_paused = true)]
async fn test_start_over_mid_run_stops_all_progress() {
    let mut t = test_kiosk();

    t.kiosk.start();
    t.kiosk.enter_bpjs("000111222333");
    t.kiosk.submit();

    // Run until login has succeeded
    while t.kiosk.session().sub_step(SubStep::Login) != SubStepStatus::Succeeded {
        t.kiosk.process_next_milestone().await;
    }

    assert_eq!(t.kiosk.start_over(), Phase::Idle);
    assert!(!t.kiosk.is_sequencer_running());

    let screens = t.kiosk.subscribe();
    let _ = timeout(Duration::from_secs(10), t.kiosk.process_next_milestone()).await;

    assert_eq!(t.kiosk.session(), &Session::new());
    assert_eq!(*screens.borrow(), Session::new());
}

#[tokio::test(start_paused = true)]
async fn test_rapid_transitions_speak_only_the_latest_prompt() {
    let mut t = test_kiosk();
    t.speech.set_speaking(true);

    t.kiosk.start();
    t.kiosk.submit();

    t.speech.set_speaking(false);
    t.kiosk.flush_narration().await;

    assert_eq!(
        t.speech.spoken(),
        vec!["Terjadi kesalahan. Mohon isi Nomor BPJS atau Nomor Booking. Silakan coba lagi."]
    );
    assert!(t.speech.cancellations() >= 2);
    assert_eq!(t.kiosk.metrics().get_stats().utterances_superseded, 1);
}

#[tokio::test(start_paused = true)]
async fn test_busy_engine_is_spoken_over_after_max_wait() {
    let mut t = test_kiosk();
    t.speech.set_speaking(true);

    t.kiosk.announce();
    let started = Instant::now();
    t.kiosk.flush_narration().await;

    assert!(started.elapsed() >= Duration::from_millis(5000));
    assert_eq!(t.speech.spoken().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_announce_speaks_welcome() {
    let mut t = test_kiosk();

    t.kiosk.announce();
    t.kiosk.flush_narration().await;

    assert_eq!(t.speech.spoken(), vec![prompts::WELCOME.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_fingerprint_keeps_step_statuses() {
    let mut t = test_kiosk_with_driver(Arc::new(FailingStepDriver {
        failing_step: SubStep::Fingerprint,
        reason: "sidik jari tidak cocok".to_string(),
    }));

    t.kiosk.start();
    t.kiosk.enter_bpjs("000777888999");
    t.kiosk.submit();

    assert_eq!(t.kiosk.run_until_settled().await, Phase::Error);

    let session = t.kiosk.session();
    assert_eq!(session.sub_step(SubStep::Login), SubStepStatus::Succeeded);
    assert_eq!(session.sub_step(SubStep::Fingerprint), SubStepStatus::Failed);
    assert_eq!(session.sub_step(SubStep::Print), SubStepStatus::Pending);
    assert!(session.matched_patient().is_none());
    assert_eq!(
        session.error(),
        Some(&VerificationError::SubStepFailure {
            step: SubStep::Fingerprint,
            reason: "sidik jari tidak cocok".to_string(),
        })
    );
    assert!(!t.kiosk.is_sequencer_running());
}

#[tokio::test(start_paused = true)]
async fn test_try_again_returns_to_clean_input() {
    let mut t = test_kiosk();

    t.kiosk.start();
    t.kiosk.enter_booking("BOOK999");
    t.kiosk.submit();
    assert_eq!(t.kiosk.try_again(), Phase::AwaitingInput);

    let fresh = Session::new()
        .transition(
            &bpjs_kiosk::session::SessionEvent::Start,
            t.kiosk.registry(),
        )
        .session;
    assert_eq!(t.kiosk.session(), &fresh);

    // A second attempt works normally
    t.kiosk.enter_booking("BOOK001");
    t.kiosk.submit();
    assert_eq!(t.kiosk.run_until_settled().await, Phase::Success);
}

#[tokio::test(start_paused = true)]
async fn test_start_over_after_success_resets_everything() {
    let mut t = test_kiosk();

    t.kiosk.start();
    t.kiosk.enter_bpjs("000111222333");
    t.kiosk.submit();
    t.kiosk.run_until_settled().await;

    assert_eq!(t.kiosk.start_over(), Phase::Idle);
    assert_eq!(t.kiosk.session(), &Session::new());
}

#[tokio::test(start_paused = true)]
async fn test_open_external_app_hands_over_national_id() {
    let mut t = test_kiosk();

    t.kiosk.start();
    t.kiosk.enter_bpjs("000111222333");
    t.kiosk.submit();
    t.kiosk.run_until_settled().await;

    assert_eq!(t.kiosk.open_external_app(), Phase::Success);
    assert_eq!(t.launcher.launched(), vec!["3201010101900001".to_string()]);
    assert_eq!(t.kiosk.metrics().get_stats().external_launches, 1);
}

#[tokio::test(start_paused = true)]
async fn test_open_external_app_is_ignored_before_success() {
    let mut t = test_kiosk();

    t.kiosk.start();
    t.kiosk.open_external_app();
    assert!(t.launcher.launched().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_history_records_phase_changes() {
    let mut t = test_kiosk();

    t.kiosk.start();
    t.kiosk.enter_booking("BOOK003");
    t.kiosk.submit();
    t.kiosk.run_until_settled().await;

    let phases: Vec<(Phase, Phase)> = t
        .kiosk
        .history()
        .map(|record| (record.from, record.to))
        .collect();
    assert_eq!(
        phases,
        vec![
            (Phase::Idle, Phase::AwaitingInput),
            (Phase::AwaitingInput, Phase::Verifying),
            (Phase::Verifying, Phase::Success),
        ]
    );
    assert_eq!(t.kiosk.metrics().get_stats().sessions_started, 1);
    assert_eq!(t.kiosk.metrics().get_stats().verifications_succeeded, 1);
}
