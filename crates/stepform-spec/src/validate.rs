use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::spec::field::{FieldKind, FieldSpec, value_to_display};
use crate::spec::form::FormSpec;
use crate::spec::rule::Check;
use crate::template::{format_number, render_message};
use crate::values::{FormValues, is_blank};

/// A failed check on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    pub code: String,
}

/// Outcome of running one step's ruleset. Holds at most one error per field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<FieldError>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }
}

impl ValidationResult {
    pub fn error_for(&self, field: &str) -> Option<&FieldError> {
        self.errors.iter().find(|error| error.field == field)
    }

    pub fn message(&self, field: &str) -> Option<&str> {
        self.error_for(field).map(|error| error.message.as_str())
    }
}

/// Runs the ruleset of step `index` against the entire record.
///
/// Out-of-range steps have no rules and always pass.
pub fn validate_step(spec: &FormSpec, index: usize, values: &FormValues) -> ValidationResult {
    let Some(step) = spec.steps.get(index) else {
        return ValidationResult::default();
    };

    let mut errors: Vec<FieldError> = Vec::new();
    for rule in &step.rules {
        if errors.iter().any(|error| error.field == rule.field) {
            continue;
        }
        if let Some(error) = evaluate_checks(&rule.field, &rule.checks, values) {
            errors.push(error);
        }
    }

    for field in &step.fields {
        if errors.iter().any(|error| error.field == field.id) {
            continue;
        }
        if let Some(error) = kind_error(field, values.get(&field.id)) {
            errors.push(error);
        }
    }

    ValidationResult {
        valid: errors.is_empty(),
        errors,
    }
}

/// Validates every step in order, one result per step.
pub fn validate_all(spec: &FormSpec, values: &FormValues) -> Vec<ValidationResult> {
    (0..spec.step_count())
        .map(|index| validate_step(spec, index, values))
        .collect()
}

fn evaluate_checks(field: &str, checks: &[Check], values: &FormValues) -> Option<FieldError> {
    let value = values.get(field);
    for check in checks {
        if let Check::When {
            field: other,
            is,
            then,
            otherwise,
        } = check
        {
            let branch = if values.get(other) == Some(is) {
                then
            } else {
                otherwise
            };
            if let Some(error) = evaluate_checks(field, branch, values) {
                return Some(error);
            }
            continue;
        }

        if let Some(error) = enforce_check(field, check, value) {
            return Some(error);
        }
    }
    None
}

fn enforce_check(field: &str, check: &Check, value: Option<&Value>) -> Option<FieldError> {
    if let Check::Required { message } = check {
        return is_blank(value).then(|| failure(field, check, message, Map::new()));
    }
    let value = value.filter(|value| !is_blank(Some(*value)))?;

    match check {
        Check::MinLength { min, message } => {
            let text = value.as_str()?;
            (text.chars().count() < *min)
                .then(|| failure(field, check, message, params([("min", min.to_string())])))
        }
        Check::MaxLength { max, message } => {
            let text = value.as_str()?;
            (text.chars().count() > *max)
                .then(|| failure(field, check, message, params([("max", max.to_string())])))
        }
        Check::Pattern { pattern, message } => {
            let text = value.as_str()?;
            let regex = Regex::new(pattern).ok()?;
            (!regex.is_match(text))
                .then(|| failure(field, check, message, params([("pattern", pattern.clone())])))
        }
        Check::OneOf { values, message } => (!values.contains(value))
            .then(|| failure(field, check, message, params([("values", join(values))]))),
        Check::NotOneOf { values, message } => values
            .contains(value)
            .then(|| failure(field, check, message, params([("values", join(values))]))),
        Check::Number { message } => (!value.is_number()).then(|| type_error(field, message)),
        Check::Min { min, message } => match value.as_f64() {
            Some(number) => (number < *min)
                .then(|| failure(field, check, message, params([("min", format_number(*min))]))),
            None => Some(type_error(field, &None)),
        },
        Check::Max { max, message } => match value.as_f64() {
            Some(number) => (number > *max)
                .then(|| failure(field, check, message, params([("max", format_number(*max))]))),
            None => Some(type_error(field, &None)),
        },
        Check::Required { .. } | Check::When { .. } => None,
    }
}

fn default_message(check: &Check) -> &'static str {
    match check {
        Check::Required { .. } => "{{path}} is a required field",
        Check::MinLength { .. } => "{{path}} must be at least {{min}} characters",
        Check::MaxLength { .. } => "{{path}} must be at most {{max}} characters",
        Check::Pattern { .. } => "{{path}} must match the following: \"{{pattern}}\"",
        Check::OneOf { .. } => "{{path}} must be one of the following values: {{values}}",
        Check::NotOneOf { .. } => "{{path}} must not be one of the following values: {{values}}",
        Check::Number { .. } => "{{path}} must be a `number` type",
        Check::Min { .. } => "{{path}} must be greater than or equal to {{min}}",
        Check::Max { .. } => "{{path}} must be less than or equal to {{max}}",
        Check::When { .. } => "{{path}} is invalid",
    }
}

fn failure(
    field: &str,
    check: &Check,
    custom: &Option<String>,
    mut params: Map<String, Value>,
) -> FieldError {
    params.insert("path".into(), Value::String(field.to_string()));
    let template = custom.as_deref().unwrap_or(default_message(check));
    FieldError {
        field: field.to_string(),
        message: render_message(template, &params),
        code: check.code().to_string(),
    }
}

fn type_error(field: &str, custom: &Option<String>) -> FieldError {
    failure(field, &Check::Number { message: None }, custom, Map::new())
}

/// Rejects stored values that do not fit the field's kind. Blank values pass.
fn kind_error(field: &FieldSpec, value: Option<&Value>) -> Option<FieldError> {
    let value = value.filter(|value| !is_blank(Some(*value)))?;
    match field.kind {
        FieldKind::Choice => match value.as_str() {
            Some(choice) if field.is_known_choice(choice) => None,
            _ => Some(unknown_choice(field)),
        },
        FieldKind::Boolean => (!value.is_boolean()).then(|| boolean_error(&field.id)),
        FieldKind::Number => (!value.is_number()).then(|| type_error(&field.id, &None)),
        FieldKind::Text | FieldKind::LongText => None,
    }
}

fn boolean_error(field: &str) -> FieldError {
    let params = params([("path", field.to_string())]);
    FieldError {
        field: field.to_string(),
        message: render_message("{{path}} must be a `boolean` type", &params),
        code: "boolean".to_string(),
    }
}

fn unknown_choice(field: &FieldSpec) -> FieldError {
    let allowed = field
        .options
        .iter()
        .map(|option| Value::String(option.value.clone()))
        .collect::<Vec<_>>();
    failure(
        &field.id,
        &Check::OneOf {
            values: Vec::new(),
            message: None,
        },
        &None,
        params([("values", join(&allowed))]),
    )
}

fn params<const N: usize>(entries: [(&str, String); N]) -> Map<String, Value> {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), Value::String(value)))
        .collect()
}

fn join(values: &[Value]) -> String {
    values
        .iter()
        .map(value_to_display)
        .collect::<Vec<_>>()
        .join(", ")
}
