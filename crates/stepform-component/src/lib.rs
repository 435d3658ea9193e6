use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use stepform_spec::{
    Advance, FormSession, FormSpec, FormValues, SessionError, SessionSnapshot, SpecError,
    SubmitError, build_render_payload, coerce_values, render_json_ui as spec_render_json_ui,
    render_text as spec_render_text, validate_step as spec_validate_step,
};

/// Form used when the host does not supply one.
pub const DEFAULT_SPEC: &str =
    include_str!("../../stepform-spec/tests/fixtures/multi_step_form.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config: {0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("invalid form spec: {0}")]
    Spec(#[from] SpecError),
    #[error("form '{0}' is not available")]
    FormUnavailable(String),
    #[error("failed to parse session: {0}")]
    SessionParse(#[source] serde_json::Error),
    #[error("failed to parse value: {0}")]
    ValueParse(#[source] serde_json::Error),
    #[error("values must be a JSON object")]
    ValuesNotObject,
    #[error("step {0} does not exist")]
    UnknownStep(usize),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    form_spec_json: Option<String>,
}

/// Outcome reported by the host once its submission operation settles.
#[derive(Debug, Deserialize, Default)]
struct SubmissionOutcome {
    #[serde(default)]
    error: Option<String>,
}

fn load_form_spec(config_json: &str) -> Result<FormSpec, ComponentError> {
    let config = if config_json.trim().is_empty() {
        ComponentConfig::default()
    } else {
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)?
    };

    let spec_json = config.form_spec_json.as_deref().unwrap_or(DEFAULT_SPEC);

    Ok(FormSpec::from_json(spec_json)?)
}

fn ensure_form(form_id: &str, config_json: &str) -> Result<FormSpec, ComponentError> {
    let spec = load_form_spec(config_json)?;
    if spec.id != form_id {
        Err(ComponentError::FormUnavailable(form_id.to_string()))
    } else {
        Ok(spec)
    }
}

fn parse_values(values_json: &str) -> Result<FormValues, ComponentError> {
    if values_json.trim().is_empty() {
        return Ok(FormValues::new());
    }
    let value: Value = serde_json::from_str(values_json).map_err(ComponentError::ValueParse)?;
    FormValues::try_from(value).map_err(|_| ComponentError::ValuesNotObject)
}

fn load_session(
    form_id: &str,
    config_json: &str,
    session_json: &str,
) -> Result<FormSession, ComponentError> {
    let spec = ensure_form(form_id, config_json)?;
    if session_json.trim().is_empty() {
        return Ok(FormSession::new(spec)?);
    }
    let snapshot: SessionSnapshot =
        serde_json::from_str(session_json).map_err(ComponentError::SessionParse)?;
    Ok(FormSession::restore(spec, snapshot)?)
}

fn snapshot_value(session: &FormSession) -> Result<Value, ComponentError> {
    serde_json::to_value(session.snapshot()).map_err(ComponentError::JsonEncode)
}

fn field_report(session: &FormSession, field_id: &str) -> Value {
    json!({
        "id": field_id,
        "error": session.error_for(field_id).map(|error| error.message.clone()),
    })
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => {
            tracing::debug!(%err, "component call failed");
            json!({ "error": err.to_string() }).to_string()
        }
    }
}

fn respond_string(result: Result<String, ComponentError>) -> String {
    match result {
        Ok(value) => value,
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

pub fn describe(form_id: &str, config_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        serde_json::to_value(spec).map_err(ComponentError::JsonEncode)
    }))
}

/// Opens a session, optionally seeded with `values_json`, and returns its snapshot.
pub fn start(form_id: &str, config_json: &str, values_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        let values = parse_values(values_json)?;
        let session = FormSession::with_values(spec, values)?;
        snapshot_value(&session)
    }))
}

pub fn render_json_ui(form_id: &str, config_json: &str, session_json: &str) -> String {
    respond(
        load_session(form_id, config_json, session_json)
            .map(|session| spec_render_json_ui(&build_render_payload(&session))),
    )
}

pub fn render_text(form_id: &str, config_json: &str, session_json: &str) -> String {
    respond_string(
        load_session(form_id, config_json, session_json)
            .map(|session| spec_render_text(&build_render_payload(&session))),
    )
}

/// Applies a field-edit event.
pub fn edit(
    form_id: &str,
    config_json: &str,
    session_json: &str,
    field_id: &str,
    value_json: &str,
) -> String {
    respond(
        load_session(form_id, config_json, session_json).and_then(|mut session| {
            let value: Value =
                serde_json::from_str(value_json).map_err(ComponentError::ValueParse)?;
            session.edit(field_id, value)?;
            Ok(json!({
                "session": snapshot_value(&session)?,
                "field": field_report(&session, field_id),
            }))
        }),
    )
}

/// Applies a field-touched (blur) event.
pub fn touch(form_id: &str, config_json: &str, session_json: &str, field_id: &str) -> String {
    respond(
        load_session(form_id, config_json, session_json).and_then(|mut session| {
            session.touch(field_id)?;
            Ok(json!({
                "session": snapshot_value(&session)?,
                "field": field_report(&session, field_id),
            }))
        }),
    )
}

/// Requests an advance. A `"submit"` status hands the values to the host,
/// which reports back through [`complete_submission`].
pub fn advance(form_id: &str, config_json: &str, session_json: &str) -> String {
    respond(
        load_session(form_id, config_json, session_json).and_then(|mut session| {
            let outcome = session.advance()?;
            let session_value = snapshot_value(&session)?;
            Ok(match outcome {
                Advance::Moved { from, to } => json!({
                    "status": "moved",
                    "from": from,
                    "to": to,
                    "session": session_value,
                }),
                Advance::Invalid(validation) => json!({
                    "status": "invalid",
                    "validation": serde_json::to_value(validation)
                        .map_err(ComponentError::JsonEncode)?,
                    "session": session_value,
                }),
                Advance::Submit(values) => json!({
                    "status": "submit",
                    "values": values.to_value(),
                    "session": session_value,
                }),
            })
        }),
    )
}

pub fn back(form_id: &str, config_json: &str, session_json: &str) -> String {
    respond(
        load_session(form_id, config_json, session_json).and_then(|mut session| {
            let index = session.back()?;
            Ok(json!({
                "index": index,
                "session": snapshot_value(&session)?,
            }))
        }),
    )
}

/// Settles a pending submission. `outcome_json` is `{}` on success or
/// `{"error": "reason"}` on failure.
pub fn complete_submission(
    form_id: &str,
    config_json: &str,
    session_json: &str,
    outcome_json: &str,
) -> String {
    respond(
        load_session(form_id, config_json, session_json).and_then(|mut session| {
            let outcome: SubmissionOutcome = if outcome_json.trim().is_empty() {
                SubmissionOutcome::default()
            } else {
                serde_json::from_str(outcome_json).map_err(ComponentError::ValueParse)?
            };
            let result = match outcome.error {
                Some(reason) => Err(SubmitError::new(reason)),
                None => Ok(()),
            };
            session.finish_submission(result)?;
            Ok(json!({
                "status": if session.is_completed() { "completed" } else { "editing" },
                "submit_error": session.submit_error(),
                "session": snapshot_value(&session)?,
            }))
        }),
    )
}

/// Validates `values_json` against one step without a session.
pub fn validate_step(form_id: &str, config_json: &str, values_json: &str, step: usize) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        if step >= spec.step_count() {
            return Err(ComponentError::UnknownStep(step));
        }
        let mut values = FormValues::from_defaults(&spec);
        values.merge(parse_values(values_json)?);
        let coerced = coerce_values(&spec, &values)?;
        serde_json::to_value(spec_validate_step(&spec, step, &coerced))
            .map_err(ComponentError::JsonEncode)
    }))
}
