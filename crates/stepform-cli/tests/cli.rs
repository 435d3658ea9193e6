use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use serde_json::Value;

fn stepform() -> Command {
    let mut cmd = Command::cargo_bin("stepform").expect("binary");
    cmd.env_remove("STEPFORM_SUBMIT_DELAY_MS");
    cmd
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn describe_prints_bundled_form() {
    let output = stepform().arg("describe").output().expect("run");
    assert!(output.status.success());
    let spec: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(spec["id"], "multi-step-form");
    assert_eq!(spec["steps"].as_array().map(Vec::len), Some(3));
}

#[test]
fn schema_describes_form_spec() {
    let output = stepform().arg("schema").output().expect("run");
    assert!(output.status.success());
    let schema: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(schema["title"], "FormSpec");
}

#[test]
fn validate_reports_first_step_errors() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let values = temp.child("values.json");
    values.write_str(r#"{"firstName": "", "city": "Porto", "job": "EMPTY"}"#)?;

    let output = stepform()
        .args(["validate", "--step", "0", "--values"])
        .arg(values.path())
        .output()?;

    assert!(!output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Step 1 (Personal Data): invalid"));
    assert!(stdout.contains("firstName - Your First Name is Required"));
    assert!(stdout.contains("city - city must be at least 8 characters"));
    assert!(stdout.contains("job - You need to select your job situation"));
    Ok(())
}

#[test]
fn validate_accepts_complete_values() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let values = temp.child("values.json");
    values.write_str(
        r#"{"firstName": "Bruno", "job": "FULL", "city": "Vila Real", "millionaire": true, "money": 1000000, "description": "hello"}"#,
    )?;

    let output = stepform().arg("validate").arg("--values").arg(values.path()).output()?;

    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Step 2 (Bank Accounts): valid"));
    assert!(stdout.contains("Step 3 (More Info): valid"));
    Ok(())
}

#[test]
fn render_json_marks_requested_step() {
    let output = stepform()
        .args(["render", "--step", "1", "--format", "json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let ui: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(ui["step"]["index"], 1);
    assert_eq!(ui["step"]["label"], "Bank Accounts");
    assert_eq!(ui["navigation"]["back"], true);
    assert_eq!(ui["navigation"]["primary"], "Next");
}

#[test]
fn render_text_shows_stepper() {
    let output = stepform().arg("render").output().expect("run");
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("[>] Personal Data"));
    assert!(stdout.contains("Step 1/3: Personal Data (editing)"));
}

#[test]
fn wizard_completes_the_bundled_form() {
    let stdin = ["Bruno", "Full-Time", "Vila Real", "yes", "1000000", "hello", ""].join("\n");
    let output = stepform()
        .args(["wizard", "--submit-delay-ms", "0", "--values-json"])
        .write_stdin(stdin)
        .output()
        .expect("run");

    let stdout = stdout_of(&output);
    assert!(output.status.success(), "stdout: {stdout}");
    assert!(stdout.contains("Step 2/3: Bank Accounts"));
    assert!(stdout.contains(
        r#"Form Submitted {"city":"Vila Real","description":"hello","firstName":"Bruno","job":"FULL","millionaire":true,"money":1000000}"#
    ));
    assert!(stdout.contains("Done ✅"));
}

#[test]
fn wizard_reprompts_on_invalid_answers() {
    let stdin = [
        "Bruno", "Full-Time", "Vila Real", "yes", "500", "1000000", "hello",
    ]
    .join("\n");
    let output = stepform()
        .args(["wizard", "--values-json"])
        .env("STEPFORM_SUBMIT_DELAY_MS", "0")
        .write_stdin(format!("{stdin}\n"))
        .output()
        .expect("run");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Because you said you are a millionaire you need to have 1 million"));
}

#[test]
fn wizard_fails_when_input_ends() {
    let output = stepform()
        .args(["wizard", "--submit-delay-ms", "0"])
        .write_stdin("Bruno\n")
        .output()
        .expect("run");
    assert!(!output.status.success());
}
