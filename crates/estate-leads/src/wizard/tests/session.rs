use super::common::*;
use crate::store::RecordId;
use crate::wizard::{
    Completion, Cursor, FieldDisplay, SubmissionError, SubmissionStatus, SubmitAttempt, Transition,
    WizardError,
};

fn current_id(session: &crate::wizard::WizardSession) -> &'static str {
    session.current_step().expect("on a content step").id
}

#[test]
fn advance_with_empty_name_stays_and_shows_error() {
    let mut session = property_session(sale_context());

    let transition = session.advance().expect("advance is allowed");

    let Transition::Blocked(result) = transition else {
        panic!("expected blocked transition, got {transition:?}");
    };
    assert_eq!(result.error("name"), Some("Full name is required"));
    assert_eq!(current_id(&session), "contact");
    assert!(session.is_touched("name"));
    assert_eq!(session.field_display("name"), FieldDisplay::ErrorShown);
    assert_eq!(
        session.visible_error("name").as_deref(),
        Some("Full name is required")
    );
}

#[test]
fn advance_never_moves_while_any_field_is_invalid() {
    let mut session = property_session(rental_context());
    let partial = [
        ("name", "J"),
        ("name", "Jane Doe"),
        ("email", "jane@"),
        ("email", "jane@example.com"),
    ];

    for (field, value) in partial {
        session.set_field_value(field, value).expect("field on step");
        let before = session.cursor();
        assert!(matches!(
            session.advance().expect("advance"),
            Transition::Blocked(_)
        ));
        assert_eq!(session.cursor(), before);
    }

    session
        .set_field_value("phone", "07700 900123")
        .expect("phone on step");
    assert!(matches!(
        session.advance().expect("advance"),
        Transition::Moved {
            from: "contact",
            to: "employment"
        }
    ));
}

#[test]
fn conditional_steps_follow_the_listing_type() {
    let sale = property_session(sale_context());
    let rent = property_session(rental_context());

    assert_eq!(sale.applicable_steps().len(), 1);
    assert!(sale.is_final_step());
    assert_eq!(rent.applicable_steps().len(), 3);
    let ids: Vec<_> = rent
        .applicable_steps()
        .into_iter()
        .map(|index| rent.definition().step(index).id)
        .collect();
    assert_eq!(ids, ["contact", "employment", "viewing"]);
}

#[test]
fn final_advance_goes_through_submitting_before_confirmation() {
    let mut session = property_session(sale_context());
    fill_contact(&mut session);

    let transition = session.advance().expect("advance");
    let Transition::Submit(SubmitAttempt::Started(pending)) = transition else {
        panic!("expected submission to start, got {transition:?}");
    };
    assert_eq!(session.status(), SubmissionStatus::Submitting);
    assert_eq!(session.receipt(), None);
    assert!(matches!(session.cursor(), Cursor::Step(_)));

    let completion =
        session.complete_submission(pending, Ok(RecordId("property_enquiries-000001".into())));

    let Completion::Confirmed(receipt) = completion else {
        panic!("expected confirmation, got {completion:?}");
    };
    assert_eq!(receipt.name, "Jane Doe");
    assert_eq!(receipt.email, "jane@example.com");
    assert_eq!(session.status(), SubmissionStatus::Succeeded);
    assert_eq!(session.cursor(), Cursor::Confirmation);
}

#[test]
fn retreat_then_advance_restores_the_same_state() {
    let mut session = property_session(rental_context());
    fill_contact(&mut session);
    session.advance().expect("advance to employment");
    fill_employment(&mut session);

    let cursor = session.cursor();
    let values = session.values().clone();
    let status = session.status();

    assert!(matches!(
        session.retreat().expect("retreat"),
        Transition::Moved {
            from: "employment",
            to: "contact"
        }
    ));
    session.advance().expect("advance again");

    assert_eq!(session.cursor(), cursor);
    assert_eq!(session.values(), &values);
    assert_eq!(session.status(), status);
}

#[test]
fn retreat_on_first_step_stays_put() {
    let mut session = property_session(rental_context());
    assert!(matches!(
        session.retreat().expect("retreat"),
        Transition::Stayed
    ));
    assert_eq!(current_id(&session), "contact");
}

#[test]
fn submit_while_in_flight_is_a_no_op() {
    let mut session = property_session(sale_context());
    fill_contact(&mut session);
    let Transition::Submit(SubmitAttempt::Started(pending)) = session.advance().expect("advance")
    else {
        panic!("expected submission to start");
    };

    assert!(matches!(
        session.submit().expect("submit"),
        SubmitAttempt::InFlight
    ));
    assert_eq!(
        session.set_field_value("name", "Someone Else"),
        Err(WizardError::SubmissionInFlight)
    );
    assert_eq!(session.values().text("name"), "Jane Doe");

    let completion = session.complete_submission(
        pending,
        Err(SubmissionError::Unavailable("timeout".to_string())),
    );
    assert!(matches!(completion, Completion::Failed(_)));
}

#[test]
fn failed_submission_keeps_values_and_can_be_retried() {
    let mut session = property_session(sale_context());
    fill_contact(&mut session);
    let Transition::Submit(SubmitAttempt::Started(pending)) = session.advance().expect("advance")
    else {
        panic!("expected submission to start");
    };
    let values = session.values().clone();

    session.complete_submission(
        pending,
        Err(SubmissionError::Unavailable("timeout".to_string())),
    );

    assert_eq!(session.status(), SubmissionStatus::Failed);
    assert_eq!(session.values(), &values);
    assert!(session.failure().is_some());
    assert!(session.view().banner.is_some());

    let SubmitAttempt::Started(retry) = session.submit().expect("retry") else {
        panic!("expected retry to start");
    };
    assert_eq!(retry.values(), &values);
    assert!(matches!(
        session.complete_submission(retry, Ok(RecordId("property_enquiries-000002".into()))),
        Completion::Confirmed(_)
    ));
}

#[test]
fn retreat_and_dismiss_clear_the_failure_banner() {
    let mut session = property_session(rental_context());
    fill_contact(&mut session);
    session.advance().expect("to employment");
    fill_employment(&mut session);
    session.advance().expect("to viewing");
    fill_viewing(&mut session);
    let Transition::Submit(SubmitAttempt::Started(pending)) = session.advance().expect("advance")
    else {
        panic!("expected submission to start");
    };
    session.complete_submission(pending, Err(SubmissionError::Rejected("schema".to_string())));

    session.retreat().expect("retreat");
    assert_eq!(session.status(), SubmissionStatus::Idle);
    assert!(session.failure().is_none());
    assert!(!session.dismiss_error());
    assert_eq!(current_id(&session), "employment");
}

#[test]
fn retreat_on_a_single_step_wizard_still_clears_the_failure_banner() {
    let mut session = property_session(sale_context());
    fill_contact(&mut session);
    let Transition::Submit(SubmitAttempt::Started(pending)) = session.advance().expect("advance")
    else {
        panic!("expected submission to start");
    };
    session.complete_submission(
        pending,
        Err(SubmissionError::Unavailable("timeout".to_string())),
    );

    assert!(matches!(
        session.retreat().expect("retreat"),
        Transition::Stayed
    ));
    assert_eq!(session.status(), SubmissionStatus::Idle);
    assert!(session.view().banner.is_none());
    assert_eq!(session.values().text("name"), "Jane Doe");
}

#[test]
fn results_arriving_after_close_or_reset_are_discarded() {
    let mut closed = property_session(sale_context());
    fill_contact(&mut closed);
    let Transition::Submit(SubmitAttempt::Started(pending)) = closed.advance().expect("advance")
    else {
        panic!("expected submission to start");
    };
    closed.close();
    assert!(!closed.is_open());
    assert_eq!(
        closed.complete_submission(pending, Ok(RecordId("late".into()))),
        Completion::Discarded
    );
    assert_eq!(closed.receipt(), None);
    assert_eq!(closed.advance().err(), Some(WizardError::Closed));

    let mut reset = property_session(sale_context());
    fill_contact(&mut reset);
    let Transition::Submit(SubmitAttempt::Started(pending)) = reset.advance().expect("advance")
    else {
        panic!("expected submission to start");
    };
    reset.reset();
    assert_eq!(
        reset.complete_submission(pending, Ok(RecordId("late".into()))),
        Completion::Discarded
    );
    assert_eq!(reset.status(), SubmissionStatus::Idle);
    assert!(reset.values().is_empty());
}

#[test]
fn blur_reveals_errors_and_fixing_the_value_hides_them() {
    let mut session = property_session(sale_context());

    session.set_field_value("email", "jane@").expect("email");
    assert_eq!(session.field_display("email"), FieldDisplay::Untouched);
    assert_eq!(session.visible_error("email"), None);

    assert_eq!(
        session.blur_field("email").expect("blur"),
        FieldDisplay::ErrorShown
    );
    assert_eq!(
        session.visible_error("email").as_deref(),
        Some("Please enter a valid email address")
    );

    session
        .set_field_value("email", "jane@example.com")
        .expect("email");
    assert_eq!(session.field_display("email"), FieldDisplay::Touched);

    session.set_field_value("email", "jane").expect("email");
    assert_eq!(session.visible_error("email"), None);
    assert!(session.errors().contains_key("email"));
}

#[test]
fn blur_trims_text_input() {
    let mut session = property_session(sale_context());
    session.set_field_value("name", "  Jane Doe  ").expect("name");

    assert_eq!(session.blur_field("name").expect("blur"), FieldDisplay::Touched);
    assert_eq!(session.values().text("name"), "Jane Doe");
}

#[test]
fn fields_from_other_steps_are_refused() {
    let mut session = property_session(rental_context());
    assert_eq!(
        session.set_field_value("viewing_date", "2026-04-01"),
        Err(WizardError::FieldNotOnStep("viewing_date".to_string()))
    );
    assert_eq!(
        session.select_option("contact", "sale").err(),
        Some(WizardError::NotSingleChoice("contact".to_string()))
    );
}

#[test]
fn submit_is_refused_before_the_final_step() {
    let mut session = property_session(rental_context());
    fill_contact(&mut session);
    assert_eq!(session.submit().err(), Some(WizardError::NotOnFinalStep));
}

#[test]
fn confirmed_sessions_refuse_edits_until_reset() {
    let mut session = property_session(sale_context());
    fill_contact(&mut session);
    let Transition::Submit(SubmitAttempt::Started(pending)) = session.advance().expect("advance")
    else {
        panic!("expected submission to start");
    };
    session.complete_submission(pending, Ok(RecordId("property_enquiries-000001".into())));

    assert_eq!(
        session.set_field_value("name", "Again"),
        Err(WizardError::AlreadySubmitted)
    );
    assert_eq!(session.submit().err(), Some(WizardError::AlreadySubmitted));

    let generation = session.generation();
    session.reset();
    assert_eq!(session.generation(), generation + 1);
    assert_eq!(current_id(&session), "contact");
    assert_eq!(session.status(), SubmissionStatus::Idle);
    assert_eq!(session.receipt(), None);
}

#[test]
fn view_reports_position_and_affordances() {
    let mut session = property_session(rental_context());
    fill_contact(&mut session);
    session.advance().expect("to employment");

    let view = session.view();
    let step = view.step.expect("content step");
    assert_eq!(view.wizard, "property_enquiry");
    assert_eq!(step.id, "employment");
    assert_eq!(step.position, 1);
    assert_eq!(step.total, 3);
    assert!(step.can_retreat);
    assert!(!step.is_final);
    assert!(!step.busy);

    let status = step
        .fields
        .iter()
        .find(|field| field.name == "employment_status")
        .expect("status field");
    assert_eq!(status.options.len(), 5);
    assert_eq!(status.display, FieldDisplay::Untouched);
    assert_eq!(status.error, None);
}

#[test]
fn view_shows_confirmation_after_success() {
    let mut session = property_session(sale_context());
    fill_contact(&mut session);
    let Transition::Submit(SubmitAttempt::Started(pending)) = session.advance().expect("advance")
    else {
        panic!("expected submission to start");
    };
    session.complete_submission(pending, Ok(RecordId("property_enquiries-000001".into())));

    let view = session.view();
    assert!(view.step.is_none());
    let receipt = view.confirmation.expect("receipt");
    assert_eq!(receipt.record_id, RecordId("property_enquiries-000001".into()));
    assert_eq!(view.status, SubmissionStatus::Succeeded);
}
