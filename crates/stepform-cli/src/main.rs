mod wizard;

use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use stepform_component::{
    DEFAULT_SPEC, render_json_ui as component_render_json_ui,
    render_text as component_render_text, start as component_start,
    validate_step as component_validate_step,
};
use stepform_spec::{
    AdvanceOutcome, DelayedSubmitter, FieldKind, FieldSpec, FormSession, FormSpec, FormValues,
    SessionError, SubmitError, Submitter, ValidationResult, build_render_payload,
    form_spec_schema,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use wizard::{AnswerParseError, PromptContext, Verbosity, WizardPresenter};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Multi-step form wizard CLI",
    long_about = "Runs multi-step forms in the terminal and provides describe, render and validation helpers"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Fill in a form step by step in the terminal.
    Wizard {
        /// Path to the FormSpec JSON (defaults to the bundled form).
        #[arg(long, value_name = "SPEC")]
        spec: Option<PathBuf>,
        /// Optional JSON file containing initial values.
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
        /// Show the full step rendering and parse expectations.
        #[arg(long, alias = "debug")]
        verbose: bool,
        /// Also print the submitted values as pretty JSON.
        #[arg(long)]
        values_json: bool,
        /// Simulated submission latency in milliseconds.
        #[arg(long, env = "STEPFORM_SUBMIT_DELAY_MS", default_value_t = 500)]
        submit_delay_ms: u64,
    },
    /// Print the form definition.
    Describe {
        #[arg(long, value_name = "SPEC")]
        spec: Option<PathBuf>,
    },
    /// Print the JSON schema of the form definition format.
    Schema,
    /// Render one step without prompting.
    Render {
        #[arg(long, value_name = "SPEC")]
        spec: Option<PathBuf>,
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
        /// Zero-based step index.
        #[arg(long, default_value_t = 0)]
        step: usize,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Validate values against one step, or every step when --step is omitted.
    Validate {
        #[arg(long, value_name = "SPEC")]
        spec: Option<PathBuf>,
        #[arg(long, value_name = "VALUES")]
        values: PathBuf,
        #[arg(long)]
        step: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> CliResult<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Wizard {
            spec,
            values,
            verbose,
            values_json,
            submit_delay_ms,
        } => {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            run_wizard(
                spec,
                values,
                verbose,
                values_json,
                Duration::from_millis(submit_delay_ms),
                &mut input,
            )
            .await
        }
        Command::Describe { spec } => run_describe(spec),
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&form_spec_schema()?)?);
            Ok(())
        }
        Command::Render {
            spec,
            values,
            step,
            format,
        } => run_render(spec, values, step, format),
        Command::Validate { spec, values, step } => run_validate(spec, values, step),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "stepform=warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_spec_source(path: Option<&Path>) -> CliResult<String> {
    match path {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => Ok(DEFAULT_SPEC.to_string()),
    }
}

fn load_spec(path: Option<&Path>) -> CliResult<FormSpec> {
    Ok(FormSpec::from_json(&load_spec_source(path)?)?)
}

fn read_values(path: Option<&Path>) -> CliResult<FormValues> {
    let Some(path) = path else {
        return Ok(FormValues::new());
    };
    let value: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
    FormValues::try_from(value).map_err(|_| "values file must contain a JSON object".into())
}

fn run_describe(spec_path: Option<PathBuf>) -> CliResult<()> {
    let spec = load_spec(spec_path.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&spec)?);
    Ok(())
}

fn run_render(
    spec_path: Option<PathBuf>,
    values_path: Option<PathBuf>,
    step: usize,
    format: RenderMode,
) -> CliResult<()> {
    let spec_source = load_spec_source(spec_path.as_deref())?;
    let spec = FormSpec::from_json(&spec_source)?;
    let config_json = json!({ "form_spec_json": spec_source }).to_string();
    let values = read_values(values_path.as_deref())?;

    let mut snapshot =
        parse_component_result(&component_start(&spec.id, &config_json, &values.to_value().to_string()))?;
    snapshot["index"] = json!(step);
    let session_json = snapshot.to_string();

    match format {
        RenderMode::Text => {
            let text = component_render_text(&spec.id, &config_json, &session_json);
            if let Ok(value) = serde_json::from_str::<Value>(&text)
                && let Some(error) = value.get("error").and_then(Value::as_str)
            {
                return Err(error.into());
            }
            println!("{}", text);
        }
        RenderMode::Json => {
            let ui = parse_component_result(&component_render_json_ui(
                &spec.id,
                &config_json,
                &session_json,
            ))?;
            println!("{}", serde_json::to_string_pretty(&ui)?);
        }
    }
    Ok(())
}

fn run_validate(
    spec_path: Option<PathBuf>,
    values_path: PathBuf,
    step: Option<usize>,
) -> CliResult<()> {
    let spec_source = load_spec_source(spec_path.as_deref())?;
    let spec = FormSpec::from_json(&spec_source)?;
    let config_json = json!({ "form_spec_json": spec_source }).to_string();
    let values_json = fs::read_to_string(values_path)?;

    let steps = match step {
        Some(step) => vec![step],
        None => (0..spec.step_count()).collect(),
    };

    let mut all_valid = true;
    for index in steps {
        let response = parse_component_result(&component_validate_step(
            &spec.id,
            &config_json,
            &values_json,
            index,
        ))?;
        let result: ValidationResult = serde_json::from_value(response)?;
        let label = spec
            .steps
            .get(index)
            .map(|step| step.label.as_str())
            .unwrap_or("?");
        println!(
            "Step {} ({}): {}",
            index + 1,
            label,
            if result.valid { "valid" } else { "invalid" }
        );
        describe_validation(&result);
        all_valid &= result.valid;
    }

    if all_valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(result: &ValidationResult) {
    for error in &result.errors {
        println!("  {} - {}", error.field, error.message);
    }
}

fn parse_component_result(response: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(response)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        Err(error.into())
    } else {
        Ok(value)
    }
}

/// Prints the submitted values, standing in for a real endpoint.
struct ConsoleSubmitter;

#[async_trait]
impl Submitter for ConsoleSubmitter {
    async fn submit(&self, values: &FormValues) -> Result<(), SubmitError> {
        let encoded =
            serde_json::to_string(values).map_err(|err| SubmitError::new(err.to_string()))?;
        println!("Form Submitted {}", encoded);
        Ok(())
    }
}

enum PromptOutcome {
    Answered,
    Back,
}

async fn run_wizard<R: BufRead>(
    spec_path: Option<PathBuf>,
    values_path: Option<PathBuf>,
    verbose: bool,
    values_json: bool,
    delay: Duration,
    input: &mut R,
) -> CliResult<()> {
    let spec = load_spec(spec_path.as_deref())?;
    let initial = read_values(values_path.as_deref())?;
    let mut session = FormSession::with_values(spec, initial)?;
    let mut presenter = WizardPresenter::new(Verbosity::from_verbose(verbose), values_json);
    let submitter = DelayedSubmitter::new(ConsoleSubmitter, delay);
    tracing::debug!(form = %session.spec().id, steps = session.step_count(), "wizard started");
    let mut pending: Option<Vec<String>> = None;

    loop {
        presenter.show_step(&build_render_payload(&session));
        let fields = pending
            .take()
            .filter(|fields| !fields.is_empty())
            .unwrap_or_else(|| session.step().field_ids().map(String::from).collect());

        let mut went_back = false;
        for field_id in fields {
            if let PromptOutcome::Back = prompt_field(&mut session, &field_id, &presenter, input)? {
                went_back = true;
                break;
            }
        }
        if went_back {
            continue;
        }

        if session.is_last_step() {
            presenter.show_notice("Submitting...");
        }
        match session.advance_with(&submitter).await? {
            AdvanceOutcome::Moved { .. } => {}
            AdvanceOutcome::Invalid(validation) => {
                presenter.show_validation(&validation);
                let step = session.step();
                pending = Some(
                    validation
                        .errors
                        .iter()
                        .filter(|error| step.field(&error.field).is_some())
                        .map(|error| error.field.clone())
                        .collect(),
                );
            }
            AdvanceOutcome::Completed => {
                presenter.show_completion(session.values());
                return Ok(());
            }
            AdvanceOutcome::SubmitFailed(err) => {
                presenter.show_notice(&format!("Submission failed: {}", err));
                if !prompt_retry(input)? {
                    return Err("submission failed".into());
                }
                pending = Some(Vec::new());
            }
        }
    }
}

fn prompt_field<R: BufRead>(
    session: &mut FormSession,
    field_id: &str,
    presenter: &WizardPresenter,
    input: &mut R,
) -> CliResult<PromptOutcome> {
    let field = session
        .spec()
        .field(field_id)
        .cloned()
        .ok_or_else(|| format!("field '{}' not found", field_id))?;

    loop {
        presenter.show_prompt(&PromptContext::new(&field, session.values().get(field_id)));
        let line = read_line(input)?;
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("exit") {
            return Err("wizard aborted by user".into());
        }
        if trimmed.eq_ignore_ascii_case("back") {
            match session.back() {
                Ok(_) => return Ok(PromptOutcome::Back),
                Err(SessionError::AtFirstStep) => {
                    presenter.show_notice("Already on the first step.");
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }

        if !trimmed.is_empty() {
            match parse_answer(&field, trimmed) {
                Ok(value) => session.edit(field_id, value)?,
                Err(err) => {
                    presenter.show_parse_error(&err);
                    continue;
                }
            }
        }

        match session.touch(field_id)? {
            Some(error) => presenter.show_field_error(error),
            None => return Ok(PromptOutcome::Answered),
        }
    }
}

fn prompt_retry<R: BufRead>(input: &mut R) -> CliResult<bool> {
    loop {
        println!("Retry submission? (yes/no)");
        let line = read_line(input)?;
        match line.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" | "exit" => return Ok(false),
            _ => continue,
        }
    }
}

fn read_line<R: BufRead>(input: &mut R) -> CliResult<String> {
    print!("> ");
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err("input closed before the form was completed".into());
    }
    Ok(line)
}

fn parse_answer(field: &FieldSpec, raw: &str) -> Result<Value, AnswerParseError> {
    let value = field.coerce(Value::String(raw.to_string()));
    match (field.kind, &value) {
        (FieldKind::Text | FieldKind::LongText, _)
        | (FieldKind::Boolean, Value::Bool(_))
        | (FieldKind::Number, Value::Number(_)) => Ok(value),
        (FieldKind::Choice, Value::String(choice))
            if field.options.iter().any(|option| &option.value == choice) =>
        {
            Ok(value)
        }
        (FieldKind::Boolean, _) => Err(AnswerParseError::new(
            "Please enter yes or no.",
            Some("expected boolean (yes/no/true/false/on/off)".to_string()),
        )),
        (FieldKind::Number, _) => Err(AnswerParseError::new(
            "Please enter a number.",
            Some("expected a finite number".to_string()),
        )),
        (FieldKind::Choice, _) => Err(choice_error(field)),
    }
}

fn choice_error(field: &FieldSpec) -> AnswerParseError {
    let labels = field
        .options
        .iter()
        .map(|option| option.label.as_str())
        .collect::<Vec<_>>();
    let values = field
        .options
        .iter()
        .map(|option| option.value.as_str())
        .collect::<Vec<_>>();
    AnswerParseError::new(
        format!("Choose one of: {}.", labels.join(", ")),
        Some(format!("allowed values: {}", values.join(", "))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn bundled_field(id: &str) -> FieldSpec {
        FormSpec::from_json(DEFAULT_SPEC)
            .expect("bundled spec")
            .field(id)
            .cloned()
            .expect("field")
    }

    #[test]
    fn parse_answer_boolean_accepts_yes() {
        let field = bundled_field("millionaire");
        assert_eq!(parse_answer(&field, "yes").unwrap(), Value::Bool(true));
        assert!(parse_answer(&field, "maybe").is_err());
        assert_eq!(parse_answer(&field, "on").unwrap(), Value::Bool(true));
        assert_eq!(parse_answer(&field, "off").unwrap(), Value::Bool(false));
    }

    #[test]
    fn parse_answer_number_keeps_integers() {
        let field = bundled_field("money");
        assert_eq!(parse_answer(&field, "1000000").unwrap(), json!(1000000));
        assert_eq!(parse_answer(&field, "2.5").unwrap(), json!(2.5));
        assert!(parse_answer(&field, "lots").is_err());
    }

    #[test]
    fn parse_answer_choice_matches_labels_and_values() {
        let field = bundled_field("job");
        assert_eq!(parse_answer(&field, "full-time").unwrap(), json!("FULL"));
        assert_eq!(parse_answer(&field, "PART").unwrap(), json!("PART"));
        assert!(parse_answer(&field, "Select your job situation").is_err());
        let err = parse_answer(&field, "retired").unwrap_err();
        assert_eq!(
            err.user_message,
            "Choose one of: Full-Time, Part-Time, Unemployed."
        );
    }

    #[test]
    fn prompt_field_retries_until_valid() {
        let spec = FormSpec::from_json(DEFAULT_SPEC).expect("bundled spec");
        let mut session = FormSession::new(spec).expect("session");
        let presenter = WizardPresenter::new(Verbosity::Clean, false);
        let mut input = Cursor::new("Carlos\nBruno\n");

        let outcome = prompt_field(&mut session, "firstName", &presenter, &mut input)
            .expect("prompt");

        assert!(matches!(outcome, PromptOutcome::Answered));
        assert_eq!(session.values().get("firstName"), Some(&json!("Bruno")));
    }

    #[test]
    fn back_on_first_step_keeps_prompting() {
        let spec = FormSpec::from_json(DEFAULT_SPEC).expect("bundled spec");
        let mut session = FormSession::new(spec).expect("session");
        let presenter = WizardPresenter::new(Verbosity::Clean, false);
        let mut input = Cursor::new("back\nAna\n");

        let outcome = prompt_field(&mut session, "firstName", &presenter, &mut input)
            .expect("prompt");

        assert!(matches!(outcome, PromptOutcome::Answered));
        assert_eq!(session.index(), 0);
    }

    #[test]
    fn read_values_requires_an_object() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("values.json");
        fs::write(&path, "[1, 2]").expect("write values");
        let err = read_values(Some(&path)).expect_err("array rejected");
        assert_eq!(err.to_string(), "values file must contain a JSON object");

        fs::write(&path, r#"{"firstName": "Bruno"}"#).expect("write values");
        let values = read_values(Some(&path)).expect("object accepted");
        assert_eq!(values.get("firstName"), Some(&json!("Bruno")));
    }

    #[tokio::test]
    async fn wizard_walks_back_and_completes() {
        let script = [
            "Bruno",
            "Full-Time",
            "Vila Real",
            "yes",
            "back",
            "",
            "",
            "",
            "",
            "1000000",
            "hello",
        ]
        .join("\n");
        let mut input = Cursor::new(format!("{}\n", script));

        run_wizard(None, None, false, false, Duration::ZERO, &mut input)
            .await
            .expect("wizard completes");
    }

    #[tokio::test]
    async fn wizard_stops_when_input_ends() {
        let mut input = Cursor::new("Bruno\n");
        let err = run_wizard(None, None, false, false, Duration::ZERO, &mut input)
            .await
            .expect_err("input ends early");
        assert_eq!(err.to_string(), "input closed before the form was completed");
    }
}
