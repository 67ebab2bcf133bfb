//! Shared output formatting for td commands.
//!
//! Every command renders either a JSON envelope (`--json`) or a short
//! human-readable report.

use serde::Serialize;

use crate::error::{exit_codes, Error, Result};
use crate::splitter::SplitError;

pub const SCHEMA_VERSION: &str = "td.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }
}

#[derive(Serialize)]
struct SuccessEnvelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    data: &'a T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    next_steps: Vec<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    error: ErrorBody,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    next_steps: Vec<String>,
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let payload = SuccessEnvelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data,
            warnings: human.map(|h| h.warnings.clone()).unwrap_or_default(),
            next_steps: human.map(|h| h.next_steps.clone()).unwrap_or_default(),
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if options.quiet {
        return Ok(());
    }

    if let Some(human) = human {
        println!("{}", format_human(human));
    }

    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&error_envelope(command, err))?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Some(hint) = error_next_steps(err).first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

fn error_envelope<'a>(command: &'a str, err: &Error) -> ErrorEnvelope<'a> {
    ErrorEnvelope {
        schema_version: SCHEMA_VERSION,
        command,
        status: "error",
        error: ErrorBody {
            message: err.to_string(),
            code: err.exit_code(),
            kind: error_kind(err),
            details: err.details(),
        },
        next_steps: error_next_steps(err),
    }
}

pub fn format_human(output: &HumanOutput) -> String {
    let mut lines = vec![output.header.clone()];

    push_summary(&mut lines, &output.summary);
    push_section(&mut lines, "Details", &output.details);
    push_section(&mut lines, "Warnings", &output.warnings);
    push_section(&mut lines, "Next steps", &output.next_steps);

    lines.join("\n")
}

/// Best-effort command name for error reporting before clap has parsed.
pub fn infer_command_name_from_args() -> String {
    command_name_from(std::env::args().skip(1))
}

fn command_name_from(args: impl IntoIterator<Item = String>) -> String {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        // Global options that take a value
        if matches!(arg.as_str(), "--data-dir" | "--config") {
            args.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        return arg;
    }
    "td".to_string()
}

fn error_kind(err: &Error) -> &'static str {
    match err.exit_code() {
        exit_codes::USER_ERROR => "user_error",
        _ => "operation_failed",
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    match err {
        Error::TaskNotFound(_) => vec!["td list".to_string()],
        Error::InvalidConfig(_) => vec!["fix config.toml (or --config) then retry".to_string()],
        Error::LockFailed(_) => vec!["retry once the other td process finishes".to_string()],
        Error::Split(SplitError::MissingCredential) => vec![
            "td split <id> --api-key <key>".to_string(),
            "td split <id> --mode mock".to_string(),
        ],
        Error::Split(_) => vec!["td split <id> --mode mock".to_string()],
        _ => Vec::new(),
    }
}

fn push_summary(lines: &mut Vec<String>, summary: &[(String, String)]) {
    if summary.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push("Summary:".to_string());
    for (key, value) in summary {
        if value.is_empty() {
            lines.push(format!("- {key}"));
        } else {
            lines.push(format!("- {key}: {value}"));
        }
    }
}

fn push_section(lines: &mut Vec<String>, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push(format!("{title}:"));
    for item in items {
        lines.push(format!("- {item}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskId;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn command_name_skips_global_options() {
        assert_eq!(command_name_from(args(&[])), "td");
        assert_eq!(command_name_from(args(&["--json", "list"])), "list");
        assert_eq!(
            command_name_from(args(&["--data-dir", "/tmp/x", "-q", "add", "milk"])),
            "add"
        );
    }

    #[test]
    fn human_output_sections_render_in_order() {
        let mut human = HumanOutput::new("td list: 2 tasks");
        human.push_summary("remaining", "1");
        human.push_detail("[ ] Buy milk");
        human.push_warning("config ignored");
        human.push_next_step("td add <title>");

        let text = format_human(&human);
        let summary = text.find("Summary:").unwrap();
        let details = text.find("Details:").unwrap();
        let warnings = text.find("Warnings:").unwrap();
        let next = text.find("Next steps:").unwrap();
        assert!(text.starts_with("td list: 2 tasks"));
        assert!(summary < details && details < warnings && warnings < next);
        assert!(text.contains("- remaining: 1"));
    }

    #[test]
    fn error_hints_follow_error_type() {
        assert_eq!(
            error_next_steps(&Error::TaskNotFound(TaskId(1))),
            vec!["td list".to_string()]
        );
        assert_eq!(
            error_next_steps(&Error::Split(SplitError::MissingCredential)).len(),
            2
        );
        assert_eq!(error_kind(&Error::InvalidArgument("x".into())), "user_error");
        assert_eq!(
            error_kind(&Error::OperationFailed("x".into())),
            "operation_failed"
        );
    }

    #[test]
    fn error_envelope_has_status_and_error_body() {
        let err = Error::TaskNotFound(TaskId(42));
        let value = serde_json::to_value(error_envelope("rm", &err)).unwrap();

        assert_eq!(value["schema_version"], SCHEMA_VERSION);
        assert_eq!(value["command"], "rm");
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"]["message"], "Task not found: 42");
        assert_eq!(value["error"]["code"], exit_codes::USER_ERROR);
        assert_eq!(value["error"]["kind"], "user_error");
        assert_eq!(value["error"]["details"]["id"], 42);
        assert_eq!(value["next_steps"][0], "td list");
        assert!(value.get("data").is_none());
    }

    #[test]
    fn success_envelope_omits_empty_lists() {
        let data = serde_json::json!({ "count": 0 });
        let payload = SuccessEnvelope {
            schema_version: SCHEMA_VERSION,
            command: "clear",
            status: "success",
            data: &data,
            warnings: Vec::new(),
            next_steps: vec!["td list".to_string()],
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["data"]["count"], 0);
        assert!(value.get("warnings").is_none());
        assert_eq!(value["next_steps"][0], "td list");
    }
}
