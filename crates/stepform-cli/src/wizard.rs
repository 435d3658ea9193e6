use std::fmt::Write;

use serde_json::Value;
use stepform_spec::{
    FieldError, FieldKind, FieldSpec, FormValues, RenderPayload, ValidationResult, render_text,
};

/// Controls which bits of state the wizard prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: step headers and field prompts only.
    Clean,
    /// Verbose output: the full step rendering before each prompt round.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Prints step headers, prompts and outcomes for the terminal wizard.
pub struct WizardPresenter {
    verbosity: Verbosity,
    header_printed: bool,
    show_values_json: bool,
}

impl WizardPresenter {
    pub fn new(verbosity: Verbosity, show_values_json: bool) -> Self {
        Self {
            verbosity,
            header_printed: false,
            show_values_json,
        }
    }

    pub fn show_step(&mut self, payload: &RenderPayload) {
        if !self.header_printed {
            println!("Form: {}", payload.form_title);
            println!("Type 'back' to return to the previous step or 'exit' to abort.");
            self.header_printed = true;
        }
        if self.verbosity.is_verbose() {
            println!("{}", render_text(payload));
        } else {
            println!(
                "Step {}/{}: {}",
                payload.step_index + 1,
                payload.step_count,
                payload.step_label
            );
        }
        if let Some(error) = &payload.submit_error {
            eprintln!("{}", error);
        }
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = prompt.label.clone();
        if let Some(hint) = &prompt.hint {
            line.push(' ');
            line.push_str(hint);
        }
        if let Some(current) = &prompt.current {
            line.push_str(&format!(" [{}]", current));
        }
        println!("{}", line);
        if let Some(description) = &prompt.description {
            println!("{}", description);
        }
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if self.verbosity.is_verbose()
            && let Some(debug) = &error.debug_message
        {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_field_error(&self, error: &FieldError) {
        eprintln!("{}", error.message);
    }

    pub fn show_validation(&self, validation: &ValidationResult) {
        eprintln!("Please fix the following before continuing:");
        for error in &validation.errors {
            eprintln!("  {}: {}", error.field, error.message);
        }
    }

    pub fn show_notice(&self, message: &str) {
        println!("{}", message);
    }

    pub fn show_completion(&self, values: &FormValues) {
        println!("Done ✅");
        match values.to_cbor() {
            Ok(bytes) => println!("Values (CBOR hex): {}", encode_hex(&bytes)),
            Err(err) => eprintln!("Failed to serialize values to CBOR: {}", err),
        }
        if self.show_values_json {
            match values.to_json_pretty() {
                Ok(pretty) => println!("{}", pretty),
                Err(err) => eprintln!("Failed to serialize values to JSON: {}", err),
            }
        }
    }
}

/// Context used to format a single prompt.
pub struct PromptContext {
    pub label: String,
    pub description: Option<String>,
    pub hint: Option<String>,
    pub current: Option<String>,
}

impl PromptContext {
    pub fn new(field: &FieldSpec, current: Option<&Value>) -> Self {
        let current = current.and_then(|value| match (field.kind, value) {
            (_, Value::Null) => None,
            (_, Value::String(text)) if text.is_empty() => None,
            (FieldKind::Choice, Value::String(text)) => field
                .options
                .iter()
                .find(|option| &option.value == text)
                .map(|option| option.label.clone()),
            (_, Value::String(text)) => Some(text.clone()),
            (_, other) => Some(other.to_string()),
        });
        Self {
            label: field.label.clone(),
            description: field.description.clone(),
            hint: hint(field),
            current,
        }
    }
}

fn hint(field: &FieldSpec) -> Option<String> {
    match field.kind {
        FieldKind::Boolean => Some("(yes/no)".to_string()),
        FieldKind::Number => Some("(number)".to_string()),
        FieldKind::Choice => Some(format!(
            "({})",
            field
                .options
                .iter()
                .map(|option| option.label.as_str())
                .collect::<Vec<_>>()
                .join("/")
        )),
        FieldKind::Text | FieldKind::LongText => None,
    }
}

/// Error produced when parsing answers from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut encoded, "{:02x}", byte);
    }
    encoded
}
