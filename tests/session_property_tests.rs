//! Property-based checks of the session state machine and registry lookup

use proptest::prelude::*;

use bpjs_kiosk::registry::PatientRegistry;
use bpjs_kiosk::session::{Phase, RunId, SequencerEvent, Session, SessionEvent, SubStep};

/// Event template; milestones are bound to the live run when applied
#[derive(Debug, Clone)]
enum Action {
    Event(SessionEvent),
    Milestone(SequencerEvent),
    StaleMilestone(SequencerEvent),
}

fn identifier() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("000111222333".to_string()),
        Just("000444555666".to_string()),
        Just("BOOK003".to_string()),
        Just("BOOK999".to_string()),
        "[A-Z0-9]{0,12}",
    ]
}

fn sub_step() -> impl Strategy<Value = SubStep> {
    prop_oneof![
        Just(SubStep::Login),
        Just(SubStep::Fingerprint),
        Just(SubStep::Print),
    ]
}

fn sequencer_event() -> impl Strategy<Value = SequencerEvent> {
    prop_oneof![
        sub_step().prop_map(SequencerEvent::StepStarted),
        sub_step().prop_map(SequencerEvent::StepSucceeded),
        sub_step().prop_map(|step| SequencerEvent::StepFailed {
            step,
            reason: "perangkat tidak merespons".to_string(),
        }),
        Just(SequencerEvent::Completed),
    ]
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::Event(SessionEvent::Start)),
        identifier().prop_map(|value| Action::Event(SessionEvent::EditBpjs(value))),
        identifier().prop_map(|value| Action::Event(SessionEvent::EditBooking(value))),
        Just(Action::Event(SessionEvent::Submit)),
        Just(Action::Event(SessionEvent::TryAgain)),
        Just(Action::Event(SessionEvent::StartOver)),
        Just(Action::Event(SessionEvent::OpenExternalApp)),
        sequencer_event().prop_map(Action::Milestone),
        sequencer_event().prop_map(Action::StaleMilestone),
    ]
}

fn to_event(action: &Action, session: &Session) -> SessionEvent {
    match action {
        Action::Event(event) => event.clone(),
        Action::Milestone(event) => SessionEvent::Sequencer {
            run_id: session.run_id().unwrap_or_default(),
            event: event.clone(),
        },
        Action::StaleMilestone(event) => SessionEvent::Sequencer {
            run_id: RunId::new(),
            event: event.clone(),
        },
    }
}

proptest! {
    #[test]
    fn prop_session_invariants_hold(actions in prop::collection::vec(action(), 0..40)) {
        let registry = PatientRegistry::builtin();
        let mut session = Session::new();

        for action in &actions {
            let event = to_event(action, &session);
            let transition = session.transition(&event, &registry);

            if !transition.applied {
                prop_assert_eq!(&transition.session, &session);
                prop_assert!(transition.effects.is_empty());
            }
            if matches!(action, Action::StaleMilestone(_)) {
                prop_assert_eq!(&transition.session, &session);
            }

            session = transition.session;

            prop_assert!(session.sub_steps().succeeded_form_prefix());
            match session.phase() {
                Phase::Verifying => {
                    prop_assert!(session.matched_patient().is_some());
                    prop_assert!(session.run_id().is_some());
                }
                Phase::Success => {
                    prop_assert!(session.sub_steps().all_succeeded());
                    prop_assert!(session.matched_patient().is_some());
                }
                Phase::Error => prop_assert!(session.error().is_some()),
                Phase::Idle | Phase::AwaitingInput => {
                    prop_assert!(session.error().is_none());
                    prop_assert!(session.run_id().is_none());
                }
            }
        }
    }

    #[test]
    fn prop_lookup_matches_either_identifier(
        bpjs in identifier(),
        booking in identifier(),
    ) {
        let registry = PatientRegistry::builtin();
        let found = registry.lookup(&bpjs, &booking);

        let expected = registry.patients().find(|patient| {
            (!bpjs.is_empty() && patient.bpjs_number == bpjs)
                || (!booking.is_empty() && patient.booking_number == booking)
        });

        prop_assert_eq!(
            found.map(|patient| patient.name.clone()),
            expected.map(|patient| patient.name.clone())
        );
    }
}
