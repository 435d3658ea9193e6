use serde_json::json;

use stepform_spec::{
    FormSession, FormSpec,
    render::{RenderStatus, build_render_payload, render_json_ui, render_text},
};

fn fixture() -> FormSpec {
    FormSpec::from_json(include_str!("../tests/fixtures/multi_step_form.json")).expect("fixture")
}

#[test]
fn first_step_shows_sentinel_and_next_button() {
    let session = FormSession::new(fixture()).expect("session");
    let payload = build_render_payload(&session);

    assert_eq!(payload.status, RenderStatus::Editing);
    assert_eq!(payload.step_label, "Personal Data");
    assert!(!payload.navigation.show_back);
    assert_eq!(payload.navigation.primary_label, "Next");

    let job = payload
        .fields
        .iter()
        .find(|field| field.id == "job")
        .expect("job field");
    assert_eq!(job.options[0].value, "EMPTY");
    assert_eq!(job.options.len(), 4);
}

#[test]
fn sentinel_disappears_once_a_choice_is_made() {
    let mut session = FormSession::new(fixture()).expect("session");
    session.edit("job", json!("Part-Time")).expect("edit");
    let ui = render_json_ui(&build_render_payload(&session));

    let fields = ui["fields"].as_array().expect("fields");
    let job = fields.iter().find(|field| field["id"] == "job").expect("job");
    let options = job["options"].as_array().expect("options");
    assert_eq!(options.len(), 3);
    assert!(options.iter().all(|option| option["value"] != "EMPTY"));
    assert_eq!(job["value"], "PART");
}

#[test]
fn json_ui_marks_completed_steps_and_errors() {
    let mut session = FormSession::new(fixture()).expect("session");
    session.edit("firstName", json!("Bruno")).expect("edit");
    session.edit("job", json!("FULL")).expect("edit");
    session.edit("city", json!("Vila Real")).expect("edit");
    session.edit("millionaire", json!(true)).expect("edit");
    session.advance().expect("advance");
    session.edit("money", json!("100")).expect("edit");
    session.advance().expect("advance");

    let ui = render_json_ui(&build_render_payload(&session));
    assert_eq!(ui["step"]["index"], 1);
    assert_eq!(ui["steps"][0]["completed"], true);
    assert_eq!(ui["steps"][1]["active"], true);
    assert_eq!(ui["steps"][2]["completed"], false);
    assert_eq!(ui["navigation"]["back"], true);
    assert_eq!(
        ui["fields"][0]["error"],
        "Because you said you are a millionaire you need to have 1 million"
    );
}

#[test]
fn completed_form_marks_every_step() {
    let mut session = FormSession::new(fixture()).expect("session");
    session.edit("firstName", json!("Bruno")).expect("edit");
    session.edit("job", json!("FULL")).expect("edit");
    session.edit("city", json!("Vila Real")).expect("edit");
    session.advance().expect("advance");
    session.advance().expect("advance");
    assert_eq!(
        build_render_payload(&session).navigation.primary_label,
        "Submit"
    );
    session.advance().expect("advance");
    assert_eq!(
        build_render_payload(&session).navigation.primary_label,
        "Submitting"
    );
    session.finish_submission(Ok(())).expect("finish");

    let payload = build_render_payload(&session);
    assert_eq!(payload.status, RenderStatus::Completed);
    assert!(payload.steps.iter().all(|step| step.completed));

    let text = render_text(&payload);
    assert!(text.contains("[x] More Info"));
    assert!(text.contains("Step 3/3: More Info (completed)"));
}
