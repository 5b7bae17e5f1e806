//! The binary's surface: argument handling, settings layering, exit codes.
//! None of these reach GitHub; they fail on configuration or on an unreachable API URL.

use std::{io::Write as _, process::Command};

use crate::tracing_utils::TraceLog;

fn command() -> Command {
	let mut cmd = Command::new(env!("CARGO_BIN_EXE_tasks2subissues"));
	for var in ["GITHUB_TOKEN", "TASKS2SUBISSUES_TOKEN", "TASKS2SUBISSUES_REF_REPO", "TASKS2SUBISSUES_CONFIG", "TASKS2SUBISSUES_TRACE_FILE", "RUST_LOG"] {
		cmd.env_remove(var);
	}
	cmd
}

fn stderr(output: &std::process::Output) -> String {
	String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_help_lists_flags() {
	let output = command().arg("--help").output().unwrap();
	assert!(output.status.success());
	let help = String::from_utf8_lossy(&output.stdout);
	for flag in ["--token", "--issueurl", "--refrepo", "--link-delay-ms", "--config"] {
		assert!(help.contains(flag), "missing {flag} in:\n{help}");
	}
}

#[test]
fn test_issueurl_is_required() {
	let output = command().args(["--token", "t"]).output().unwrap();
	assert!(!output.status.success());
	assert!(stderr(&output).contains("--issueurl"));
}

#[test]
fn test_missing_token() {
	let output = command().args(["--issueurl", "https://github.com/acme/repo/issues/1"]).output().unwrap();
	assert_eq!(output.status.code(), Some(2));
	assert!(stderr(&output).contains("no GitHub token provided"), "{}", stderr(&output));
	assert!(output.stdout.is_empty());
}

#[test]
fn test_invalid_issue_url() {
	let output = command().args(["--token", "t", "--issueurl", "https://github.com/acme/repo/pull/1"]).output().unwrap();
	assert_eq!(output.status.code(), Some(2));
	assert!(stderr(&output).contains("invalid target issue URL"), "{}", stderr(&output));
}

#[test]
fn test_token_from_environment_and_refrepo_from_config_file() {
	let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
	writeln!(file, "ref_repo = \"https://github.com/acme\"").unwrap();

	let output = command()
		.env("GITHUB_TOKEN", "t")
		.args(["--issueurl", "https://github.com/acme/repo/issues/1", "--config"])
		.arg(file.path())
		.output()
		.unwrap();
	assert_eq!(output.status.code(), Some(2));
	assert!(stderr(&output).contains("invalid reference repo URL"), "{}", stderr(&output));
}

#[test]
fn test_unreachable_api_is_fatal_and_traced() {
	let dir = tempfile::tempdir().unwrap();
	let trace_file = dir.path().join("trace.jsonl");

	let output = command()
		.env("TASKS2SUBISSUES_TRACE_FILE", &trace_file)
		.env("RUST_LOG", "tasks2subissues=debug")
		.args(["--token", "t", "--issueurl", "https://github.com/acme/repo/issues/1", "--api-url", "http://127.0.0.1:1"])
		.output()
		.unwrap();
	assert_eq!(output.status.code(), Some(2));
	assert!(stderr(&output).contains("failed to fetch target issue"), "{}", stderr(&output));

	let trace = TraceLog::from_file(&trace_file);
	assert!(trace.has_event("DEBUG", "settings resolved"));
}
