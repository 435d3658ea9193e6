use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Checks applied to one field, evaluated against the whole form record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RuleSpec {
    pub field: String,
    pub checks: Vec<Check>,
}

/// A single constraint. Checks run in order and the first failure wins.
///
/// `message` overrides the default text and may use the same
/// `{{path}}`/`{{min}}`/`{{max}}`/`{{values}}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Check {
    Required {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    MinLength {
        min: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    MaxLength {
        max: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Pattern {
        pattern: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    OneOf {
        values: Vec<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    NotOneOf {
        values: Vec<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Min {
        min: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Max {
        max: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Conditional checks keyed on another field of the record.
    When {
        field: String,
        is: Value,
        #[serde(default)]
        then: Vec<Check>,
        #[serde(default)]
        otherwise: Vec<Check>,
    },
}

impl Check {
    /// Stable code reported alongside failures.
    pub fn code(&self) -> &'static str {
        match self {
            Check::Required { .. } => "required",
            Check::MinLength { .. } => "min_length",
            Check::MaxLength { .. } => "max_length",
            Check::Pattern { .. } => "pattern",
            Check::OneOf { .. } => "one_of",
            Check::NotOneOf { .. } => "not_one_of",
            Check::Number { .. } => "number",
            Check::Min { .. } => "min",
            Check::Max { .. } => "max",
            Check::When { .. } => "when",
        }
    }

    /// Fields other than the rule's own that this check reads.
    pub(crate) fn referenced_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Check::When {
            field,
            then,
            otherwise,
            ..
        } = self
        {
            out.push(field);
            for check in then.iter().chain(otherwise) {
                check.referenced_fields(out);
            }
        }
    }

    pub(crate) fn patterns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Check::Pattern { pattern, .. } => out.push(pattern),
            Check::When {
                then, otherwise, ..
            } => {
                for check in then.iter().chain(otherwise) {
                    check.patterns(out);
                }
            }
            _ => {}
        }
    }
}
