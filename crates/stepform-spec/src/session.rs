use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::spec::form::{FormSpec, SpecError};
use crate::spec::step::StepSpec;
use crate::submit::{SubmitError, Submitter};
use crate::validate::{FieldError, ValidationResult, validate_step};
use crate::values::FormValues;

/// Operations the session refuses in its current state.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("field '{0}' is not part of the form")]
    UnknownField(String),
    #[error("a submission is in progress")]
    Submitting,
    #[error("the form has already been submitted")]
    Completed,
    #[error("already on the first step")]
    AtFirstStep,
    #[error("no submission is pending")]
    NotSubmitting,
    #[error("invalid session snapshot: {0}")]
    InvalidSnapshot(String),
    #[error(transparent)]
    Spec(#[from] SpecError),
}

/// Lifecycle phase, independent of the step index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Editing,
    Submitting,
    Completed,
}

/// Externally visible state of the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Editing(usize),
    Submitting(usize),
    Completed,
}

/// Result of [`FormSession::advance`].
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// Validation passed and the next step is now active.
    Moved { from: usize, to: usize },
    /// Validation failed; the index is unchanged.
    Invalid(ValidationResult),
    /// The final step validated; hand these values to the submitter and
    /// report back through [`FormSession::finish_submission`].
    Submit(FormValues),
}

/// Result of [`FormSession::advance_with`].
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    Moved { from: usize, to: usize },
    Invalid(ValidationResult),
    Completed,
    SubmitFailed(SubmitError),
}

/// Serializable view of a session, used to carry it across a stateless host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub values: FormValues,
    pub index: usize,
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub touched: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_error: Option<String>,
}

/// Runtime state of one pass through a multi-step form.
#[derive(Debug, Clone)]
pub struct FormSession {
    spec: Arc<FormSpec>,
    values: FormValues,
    index: usize,
    phase: Phase,
    touched: BTreeSet<String>,
    validation: ValidationResult,
    submit_error: Option<String>,
}

impl FormSession {
    /// Opens a session on the first step with every field at its default.
    pub fn new(spec: impl Into<Arc<FormSpec>>) -> Result<Self, SessionError> {
        let spec = spec.into();
        spec.check()?;
        let values = FormValues::from_defaults(&spec);
        let mut session = Self {
            spec,
            values,
            index: 0,
            phase: Phase::Editing,
            touched: BTreeSet::new(),
            validation: ValidationResult::default(),
            submit_error: None,
        };
        session.revalidate();
        Ok(session)
    }

    /// Opens a session with `initial` layered over the field defaults.
    pub fn with_values(
        spec: impl Into<Arc<FormSpec>>,
        initial: FormValues,
    ) -> Result<Self, SessionError> {
        let mut session = Self::new(spec)?;
        let seeded = coerce_values(&session.spec, &initial)?;
        session.values.merge(seeded);
        session.revalidate();
        Ok(session)
    }

    /// Rebuilds a session from a snapshot taken by [`FormSession::snapshot`].
    pub fn restore(
        spec: impl Into<Arc<FormSpec>>,
        snapshot: SessionSnapshot,
    ) -> Result<Self, SessionError> {
        let mut session = Self::new(spec)?;
        let last = session.last_index();
        if snapshot.index > last {
            return Err(SessionError::InvalidSnapshot(format!(
                "step {} is out of range (form has {} steps)",
                snapshot.index,
                last + 1
            )));
        }
        if snapshot.phase != Phase::Editing && snapshot.index != last {
            return Err(SessionError::InvalidSnapshot(
                "only the final step can be submitting or completed".into(),
            ));
        }
        session.values = snapshot.values;
        session.index = snapshot.index;
        session.phase = snapshot.phase;
        session.touched = snapshot.touched;
        session.submit_error = snapshot.submit_error;
        if session.phase == Phase::Editing {
            session.revalidate();
        }
        Ok(session)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            values: self.values.clone(),
            index: self.index,
            phase: self.phase,
            touched: self.touched.clone(),
            submit_error: self.submit_error.clone(),
        }
    }

    pub fn spec(&self) -> &FormSpec {
        &self.spec
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn step(&self) -> &StepSpec {
        &self.spec.steps[self.index]
    }

    pub fn step_count(&self) -> usize {
        self.spec.step_count()
    }

    pub fn is_last_step(&self) -> bool {
        self.index == self.last_index()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::Editing => SessionState::Editing(self.index),
            Phase::Submitting => SessionState::Submitting(self.index),
            Phase::Completed => SessionState::Completed,
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == Phase::Submitting
    }

    pub fn is_completed(&self) -> bool {
        self.phase == Phase::Completed
    }

    pub fn is_touched(&self, field: &str) -> bool {
        self.touched.contains(field)
    }

    /// Latest validation of the active step, including untouched fields.
    pub fn validation(&self) -> &ValidationResult {
        &self.validation
    }

    /// The error shown next to `field`, if it has been touched.
    pub fn error_for(&self, field: &str) -> Option<&FieldError> {
        if self.is_touched(field) {
            self.validation.error_for(field)
        } else {
            None
        }
    }

    /// Errors of touched fields only.
    pub fn visible_errors(&self) -> Vec<&FieldError> {
        self.validation
            .errors
            .iter()
            .filter(|error| self.is_touched(&error.field))
            .collect()
    }

    /// Step-level message left by a failed submission.
    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    /// Stores a new value for `field`, coerced to the field's kind.
    pub fn edit(&mut self, field: &str, raw: Value) -> Result<(), SessionError> {
        self.ensure_editing()?;
        let spec = self
            .spec
            .field(field)
            .ok_or_else(|| SessionError::UnknownField(field.to_string()))?;
        let value = spec.coerce(raw);
        debug!(field, %value, "field edited");
        self.values.set(field, value);
        self.revalidate();
        Ok(())
    }

    /// Marks `field` as touched (blurred) and returns its visible error.
    pub fn touch(&mut self, field: &str) -> Result<Option<&FieldError>, SessionError> {
        self.ensure_editing()?;
        if self.spec.field(field).is_none() {
            return Err(SessionError::UnknownField(field.to_string()));
        }
        self.touched.insert(field.to_string());
        self.revalidate();
        Ok(self.validation.error_for(field))
    }

    /// Validates the active step and moves forward, or hands the values
    /// over for submission when the final step passes.
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        self.ensure_editing()?;
        self.submit_error = None;
        self.revalidate();
        self.touch_step_fields();

        if !self.validation.valid {
            debug!(
                step = self.index,
                errors = self.validation.errors.len(),
                "step validation failed"
            );
            return Ok(Advance::Invalid(self.validation.clone()));
        }

        if self.is_last_step() {
            self.phase = Phase::Submitting;
            info!(form = %self.spec.id, "submitting form");
            return Ok(Advance::Submit(self.values.clone()));
        }

        let from = self.index;
        self.index += 1;
        self.touched.clear();
        self.revalidate();
        debug!(from, to = self.index, "advanced to next step");
        Ok(Advance::Moved { from, to: self.index })
    }

    /// Settles a submission started by [`FormSession::advance`].
    ///
    /// A failure returns the session to editing the final step with all
    /// values kept and the reason exposed through [`FormSession::submit_error`].
    pub fn finish_submission(&mut self, result: Result<(), SubmitError>) -> Result<(), SessionError> {
        if self.phase != Phase::Submitting {
            return Err(SessionError::NotSubmitting);
        }
        match result {
            Ok(()) => {
                self.phase = Phase::Completed;
                info!(form = %self.spec.id, "form submitted");
            }
            Err(err) => {
                warn!(form = %self.spec.id, %err, "form submission failed");
                self.phase = Phase::Editing;
                self.submit_error = Some(format!("Submission failed: {err}"));
            }
        }
        Ok(())
    }

    /// [`FormSession::advance`] followed by awaiting `submitter` on the final step.
    pub async fn advance_with<S>(&mut self, submitter: &S) -> Result<AdvanceOutcome, SessionError>
    where
        S: Submitter + ?Sized,
    {
        match self.advance()? {
            Advance::Moved { from, to } => Ok(AdvanceOutcome::Moved { from, to }),
            Advance::Invalid(validation) => Ok(AdvanceOutcome::Invalid(validation)),
            Advance::Submit(values) => {
                let result = submitter.submit(&values).await;
                self.finish_submission(result.clone())?;
                Ok(match result {
                    Ok(()) => AdvanceOutcome::Completed,
                    Err(err) => AdvanceOutcome::SubmitFailed(err),
                })
            }
        }
    }

    /// Returns to the previous step without validating.
    pub fn back(&mut self) -> Result<usize, SessionError> {
        self.ensure_editing()?;
        if self.index == 0 {
            return Err(SessionError::AtFirstStep);
        }
        self.index -= 1;
        self.submit_error = None;
        self.validation = ValidationResult::default();
        debug!(to = self.index, "went back a step");
        Ok(self.index)
    }

    fn ensure_editing(&self) -> Result<(), SessionError> {
        match self.phase {
            Phase::Editing => Ok(()),
            Phase::Submitting => Err(SessionError::Submitting),
            Phase::Completed => Err(SessionError::Completed),
        }
    }

    fn last_index(&self) -> usize {
        self.spec.step_count() - 1
    }

    fn revalidate(&mut self) {
        self.validation = validate_step(&self.spec, self.index, &self.values);
    }

    fn touch_step_fields(&mut self) {
        let step = &self.spec.steps[self.index];
        let fields = step
            .field_ids()
            .chain(step.rules.iter().map(|rule| rule.field.as_str()))
            .map(String::from)
            .collect::<Vec<_>>();
        self.touched.extend(fields);
    }
}

/// Coerces every entry of `raw` to its field's kind.
///
/// Keys that are not fields of `spec` are refused, as [`FormSession::edit`] does.
pub fn coerce_values(spec: &FormSpec, raw: &FormValues) -> Result<FormValues, SessionError> {
    let mut values = FormValues::new();
    for (id, value) in raw.as_map() {
        let field = spec
            .field(id)
            .ok_or_else(|| SessionError::UnknownField(id.clone()))?;
        values.set(id.clone(), field.coerce(value.clone()));
    }
    Ok(values)
}
