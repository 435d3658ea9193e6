use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Supported field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Single-line text.
    Text,
    /// Multi-line free text.
    LongText,
    /// One value out of a fixed option list.
    Choice,
    Boolean,
    Number,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::LongText => "long_text",
            FieldKind::Choice => "choice",
            FieldKind::Boolean => "boolean",
            FieldKind::Number => "number",
        }
    }
}

/// A selectable option for choice fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

/// A single input rendered while its step is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ChoiceOption>,
    /// Sentinel "unselected" option shown only while it is the current value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<ChoiceOption>,
}

impl FieldSpec {
    /// Initial value used when a session starts.
    pub fn initial_value(&self) -> Value {
        if let Some(default) = &self.default {
            return self.coerce(default.clone());
        }
        match self.kind {
            FieldKind::Text | FieldKind::LongText => Value::String(String::new()),
            FieldKind::Choice => self
                .placeholder
                .as_ref()
                .map(|placeholder| Value::String(placeholder.value.clone()))
                .unwrap_or(Value::Null),
            FieldKind::Boolean => Value::Bool(false),
            FieldKind::Number => Value::Null,
        }
    }

    /// Converts a raw edit into the value stored for this field.
    ///
    /// Unparseable input is kept verbatim so validation can report it.
    pub fn coerce(&self, raw: Value) -> Value {
        match self.kind {
            FieldKind::Text | FieldKind::LongText => match raw {
                Value::Null => Value::String(String::new()),
                Value::String(text) => Value::String(text),
                other => Value::String(value_to_display(&other)),
            },
            FieldKind::Choice => match raw {
                Value::String(text) => Value::String(self.resolve_choice(&text)),
                other => other,
            },
            FieldKind::Boolean => match raw {
                Value::String(text) => match parse_boolean(&text) {
                    Some(flag) => Value::Bool(flag),
                    None => Value::String(text),
                },
                other => other,
            },
            FieldKind::Number => match raw {
                Value::String(text) => parse_number(&text),
                other => other,
            },
        }
    }

    /// Whether `value` names one of the declared options or the placeholder.
    pub fn is_known_choice(&self, value: &str) -> bool {
        self.options.iter().any(|option| option.value == value)
            || self
                .placeholder
                .as_ref()
                .is_some_and(|placeholder| placeholder.value == value)
    }

    fn resolve_choice(&self, raw: &str) -> String {
        if self.is_known_choice(raw) {
            return raw.to_string();
        }
        self.options
            .iter()
            .chain(self.placeholder.iter())
            .find(|option| option.label.eq_ignore_ascii_case(raw.trim()))
            .map(|option| option.value.clone())
            .unwrap_or_else(|| raw.to_string())
    }
}

fn parse_boolean(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" | "on" => Some(true),
        "false" | "f" | "no" | "n" | "0" | "off" => Some(false),
        _ => None,
    }
}

fn parse_number(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(integer) = trimmed.parse::<i64>() {
        return Value::Number(Number::from(integer));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

pub(crate) fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(num) => num.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
