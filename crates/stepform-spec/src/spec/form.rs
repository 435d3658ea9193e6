use std::collections::BTreeSet;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spec::field::{FieldKind, FieldSpec};
use crate::spec::step::StepSpec;

/// Problems detected while loading or checking a form definition.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("failed to parse form spec: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("form '{0}' defines no steps")]
    NoSteps(String),
    #[error("field '{0}' is declared more than once")]
    DuplicateField(String),
    #[error("step '{step}' has a rule for unknown field '{field}'")]
    UnknownRuleField { step: String, field: String },
    #[error("step '{step}' has a condition on unknown field '{field}'")]
    UnknownConditionField { step: String, field: String },
    #[error("choice field '{0}' declares no options")]
    MissingOptions(String),
    #[error("invalid pattern for field '{field}': {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },
}

/// Top-level multi-step form definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormSpec {
    pub id: String,
    pub title: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub steps: Vec<StepSpec>,
}

impl FormSpec {
    /// Parses and checks a JSON form definition.
    pub fn from_json(json: &str) -> Result<Self, SpecError> {
        let spec: FormSpec = serde_json::from_str(json)?;
        spec.check()?;
        Ok(spec)
    }

    /// Verifies the structural invariants sessions rely on.
    pub fn check(&self) -> Result<(), SpecError> {
        if self.steps.is_empty() {
            return Err(SpecError::NoSteps(self.id.clone()));
        }

        let mut ids = BTreeSet::new();
        for field in self.fields() {
            if !ids.insert(field.id.as_str()) {
                return Err(SpecError::DuplicateField(field.id.clone()));
            }
            if field.kind == FieldKind::Choice && field.options.is_empty() {
                return Err(SpecError::MissingOptions(field.id.clone()));
            }
        }

        for step in &self.steps {
            for rule in &step.rules {
                if !ids.contains(rule.field.as_str()) {
                    return Err(SpecError::UnknownRuleField {
                        step: step.id.clone(),
                        field: rule.field.clone(),
                    });
                }
                let mut referenced = Vec::new();
                let mut patterns = Vec::new();
                for check in &rule.checks {
                    check.referenced_fields(&mut referenced);
                    check.patterns(&mut patterns);
                }
                if let Some(missing) = referenced.iter().find(|field| !ids.contains(**field)) {
                    return Err(SpecError::UnknownConditionField {
                        step: step.id.clone(),
                        field: missing.to_string(),
                    });
                }
                for pattern in patterns {
                    Regex::new(pattern).map_err(|source| SpecError::InvalidPattern {
                        field: rule.field.clone(),
                        source,
                    })?;
                }
            }
        }

        Ok(())
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Every field of the form, in step order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.steps.iter().flat_map(|step| step.fields.iter())
    }

    pub fn field(&self, id: &str) -> Option<&FieldSpec> {
        self.fields().find(|field| field.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: serde_json::Value) -> Result<FormSpec, SpecError> {
        FormSpec::from_json(&value.to_string())
    }

    #[test]
    fn rejects_empty_forms() {
        let err = spec(json!({ "id": "f", "title": "F", "version": "1", "steps": [] }))
            .expect_err("no steps");
        assert!(matches!(err, SpecError::NoSteps(_)));
    }

    #[test]
    fn rejects_duplicate_fields_across_steps() {
        let err = spec(json!({
            "id": "f", "title": "F", "version": "1",
            "steps": [
                { "id": "a", "label": "A", "fields": [{ "id": "x", "type": "text", "label": "X" }] },
                { "id": "b", "label": "B", "fields": [{ "id": "x", "type": "text", "label": "X" }] }
            ]
        }))
        .expect_err("duplicate");
        assert!(matches!(err, SpecError::DuplicateField(id) if id == "x"));
    }

    #[test]
    fn rejects_conditions_on_unknown_fields() {
        let err = spec(json!({
            "id": "f", "title": "F", "version": "1",
            "steps": [{
                "id": "a", "label": "A",
                "fields": [{ "id": "x", "type": "number", "label": "X" }],
                "rules": [{ "field": "x", "checks": [
                    { "check": "when", "field": "ghost", "is": true, "then": [{ "check": "required" }] }
                ]}]
            }]
        }))
        .expect_err("unknown condition");
        assert!(matches!(err, SpecError::UnknownConditionField { field, .. } if field == "ghost"));
    }

    #[test]
    fn rejects_bad_patterns() {
        let err = spec(json!({
            "id": "f", "title": "F", "version": "1",
            "steps": [{
                "id": "a", "label": "A",
                "fields": [{ "id": "x", "type": "text", "label": "X" }],
                "rules": [{ "field": "x", "checks": [{ "check": "pattern", "pattern": "(" }] }]
            }]
        }))
        .expect_err("bad regex");
        assert!(matches!(err, SpecError::InvalidPattern { .. }));
    }
}
