use serde_json::{Map, Value, json};

use crate::session::{FormSession, Phase};
use crate::spec::field::{FieldKind, value_to_display};

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// Fields of the active step accept input.
    Editing,
    /// The submission operation is pending.
    Submitting,
    /// The form was submitted.
    Completed,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::Editing => "editing",
            RenderStatus::Submitting => "submitting",
            RenderStatus::Completed => "completed",
        }
    }
}

/// One entry of the stepper header.
#[derive(Debug, Clone)]
pub struct RenderStep {
    pub label: String,
    pub active: bool,
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct RenderOption {
    pub value: String,
    pub label: String,
}

/// Describes a single field of the active step.
#[derive(Debug, Clone)]
pub struct RenderField {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub kind: FieldKind,
    pub value: Option<Value>,
    pub error: Option<String>,
    pub options: Vec<RenderOption>,
}

/// Back/primary button state.
#[derive(Debug, Clone)]
pub struct RenderNavigation {
    pub show_back: bool,
    pub primary_label: &'static str,
    pub disabled: bool,
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub form_id: String,
    pub form_title: String,
    pub status: RenderStatus,
    pub step_index: usize,
    pub step_count: usize,
    pub step_label: String,
    pub steps: Vec<RenderStep>,
    pub fields: Vec<RenderField>,
    pub navigation: RenderNavigation,
    pub submit_error: Option<String>,
}

/// Build the renderer payload for the session's active step.
pub fn build_render_payload(session: &FormSession) -> RenderPayload {
    let spec = session.spec();
    let index = session.index();
    let status = match session.phase() {
        Phase::Editing => RenderStatus::Editing,
        Phase::Submitting => RenderStatus::Submitting,
        Phase::Completed => RenderStatus::Completed,
    };

    let steps = spec
        .steps
        .iter()
        .enumerate()
        .map(|(position, step)| RenderStep {
            label: step.label.clone(),
            active: position == index,
            completed: index > position || session.is_completed(),
        })
        .collect();

    let fields = session
        .step()
        .fields
        .iter()
        .map(|field| {
            let value = session.values().get(&field.id).cloned();
            let mut options = Vec::new();
            if let Some(placeholder) = &field.placeholder
                && value.as_ref().and_then(Value::as_str) == Some(placeholder.value.as_str())
            {
                options.push(RenderOption {
                    value: placeholder.value.clone(),
                    label: placeholder.label.clone(),
                });
            }
            options.extend(field.options.iter().map(|option| RenderOption {
                value: option.value.clone(),
                label: option.label.clone(),
            }));
            RenderField {
                id: field.id.clone(),
                label: field.label.clone(),
                description: field.description.clone(),
                kind: field.kind,
                value,
                error: session
                    .error_for(&field.id)
                    .map(|error| error.message.clone()),
                options,
            }
        })
        .collect();

    let primary_label = if session.is_submitting() {
        "Submitting"
    } else if session.is_last_step() {
        "Submit"
    } else {
        "Next"
    };

    RenderPayload {
        form_id: spec.id.clone(),
        form_title: spec.title.clone(),
        status,
        step_index: index,
        step_count: session.step_count(),
        step_label: session.step().label.clone(),
        steps,
        fields,
        navigation: RenderNavigation {
            show_back: index > 0,
            primary_label,
            disabled: session.is_submitting(),
        },
        submit_error: session.submit_error().map(String::from),
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let steps = payload
        .steps
        .iter()
        .map(|step| {
            json!({
                "label": step.label,
                "active": step.active,
                "completed": step.completed,
            })
        })
        .collect::<Vec<_>>();

    let fields = payload
        .fields
        .iter()
        .map(|field| {
            let mut map = Map::new();
            map.insert("id".into(), Value::String(field.id.clone()));
            map.insert("label".into(), Value::String(field.label.clone()));
            map.insert(
                "description".into(),
                field
                    .description
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            );
            map.insert("type".into(), Value::String(field.kind.as_str().to_string()));
            map.insert("value".into(), field.value.clone().unwrap_or(Value::Null));
            if let Some(error) = &field.error {
                map.insert("error".into(), Value::String(error.clone()));
            }
            if !field.options.is_empty() {
                map.insert(
                    "options".into(),
                    Value::Array(
                        field
                            .options
                            .iter()
                            .map(|option| json!({ "value": option.value, "label": option.label }))
                            .collect(),
                    ),
                );
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "form_id": payload.form_id,
        "form_title": payload.form_title,
        "status": payload.status.as_str(),
        "step": {
            "index": payload.step_index,
            "count": payload.step_count,
            "label": payload.step_label,
        },
        "steps": steps,
        "fields": fields,
        "navigation": {
            "back": payload.navigation.show_back,
            "primary": payload.navigation.primary_label,
            "disabled": payload.navigation.disabled,
        },
        "submit_error": payload.submit_error,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Form: {} ({})", payload.form_title, payload.form_id));
    let stepper = payload
        .steps
        .iter()
        .map(|step| {
            let marker = if step.completed {
                "x"
            } else if step.active {
                ">"
            } else {
                " "
            };
            format!("[{}] {}", marker, step.label)
        })
        .collect::<Vec<_>>()
        .join("  ");
    lines.push(stepper);
    lines.push(format!(
        "Step {}/{}: {} ({})",
        payload.step_index + 1,
        payload.step_count,
        payload.step_label,
        payload.status.as_str()
    ));
    if let Some(error) = &payload.submit_error {
        lines.push(format!("! {}", error));
    }

    for field in &payload.fields {
        let mut entry = format!(" - {} ({})", field.label, field.id);
        if let Some(value) = &field.value
            && !value.is_null()
        {
            entry.push_str(&format!(" = {}", value_to_display(value)));
        }
        lines.push(entry);
        if !field.options.is_empty() {
            let options = field
                .options
                .iter()
                .map(|option| format!("{} [{}]", option.label, option.value))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("   options: {}", options));
        }
        if let Some(error) = &field.error {
            lines.push(format!("   error: {}", error));
        }
    }

    let mut buttons = Vec::new();
    if payload.navigation.show_back {
        buttons.push("Back".to_string());
    }
    buttons.push(payload.navigation.primary_label.to_string());
    lines.push(format!("Actions: {}", buttons.join(" | ")));

    lines.join("\n")
}
