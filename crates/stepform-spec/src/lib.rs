#![allow(missing_docs)]

pub mod render;
pub mod session;
pub mod spec;
pub mod submit;
pub mod template;
pub mod validate;
pub mod values;

pub use render::{
    RenderField, RenderNavigation, RenderPayload, RenderStatus, RenderStep, build_render_payload,
    render_json_ui, render_text,
};
pub use session::{
    Advance, AdvanceOutcome, FormSession, Phase, SessionError, SessionSnapshot, SessionState,
    coerce_values,
};
pub use spec::{Check, ChoiceOption, FieldKind, FieldSpec, FormSpec, RuleSpec, SpecError, StepSpec};
pub use submit::{DelayedSubmitter, FnSubmitter, SubmitError, Submitter};
pub use validate::{FieldError, ValidationResult, validate_all, validate_step};
pub use values::FormValues;

/// JSON schema describing the form definition format.
pub fn form_spec_schema() -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(schemars::schema_for!(FormSpec))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_names_the_form_spec() {
        let schema = form_spec_schema().expect("schema");
        assert_eq!(schema["title"], "FormSpec");
        assert!(schema["properties"]["steps"].is_object());
    }
}
