//! Agent executor interface.
//!
//! Runs the agent CLI in headless mode (`-p --output-format json`) with the
//! prompt on stdin, and parses its structured output. This is the single
//! narrow interface through which decomposition, execution, compliance, and
//! classification all reach the external agent; a non-zero exit code is the
//! universal failure signal every caller checks.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::{hlog_debug, hlog_error};

/// Default timeout for one executor call (10 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// One request to the agent executor.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// The prompt text, sent on stdin.
    pub prompt: String,
    /// Optional system instruction.
    pub system_prompt: Option<String>,
    /// Optional output-schema constraint.
    pub json_schema: Option<Value>,
    /// Optional turn budget.
    pub max_turns: Option<u32>,
    /// Optional working directory for the call.
    pub cwd: Option<PathBuf>,
}

/// Raw outcome of one executor call.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Raw stdout text.
    pub output: String,
    /// Process exit code; non-zero means the call failed.
    pub exit_code: i32,
    /// Wall-clock elapsed time.
    pub duration: Duration,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Headless agent executor.
#[derive(Debug, Clone)]
pub struct AgentRunner {
    binary: PathBuf,
    /// Extra flags from the configured command, passed before the
    /// per-request arguments on every call.
    leading_args: Vec<String>,
    timeout: Duration,
}

impl AgentRunner {
    /// Resolve a configured command line. The first token is located on
    /// PATH; any remaining tokens (e.g. a configured
    /// `claude --dangerously-skip-permissions`) are kept and passed through
    /// on every call.
    ///
    /// # Errors
    /// Returns `AgentBinaryNotFound` when the command is not installed.
    /// This is a setup error surfaced to the operator, never retried.
    pub fn new(command: &str) -> Result<Self> {
        let mut tokens = command.split_whitespace();
        let program = tokens.next().unwrap_or("claude");
        let binary = which::which(program).map_err(|_| Error::AgentBinaryNotFound)?;
        Ok(Self {
            binary,
            leading_args: tokens.map(str::to_string).collect(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Use a specific binary path. Useful for tests and non-standard installs.
    pub fn with_binary(binary: PathBuf) -> Self {
        Self {
            binary,
            leading_args: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_leading_args(mut self, leading_args: Vec<String>) -> Self {
        self.leading_args = leading_args;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn leading_args(&self) -> &[String] {
        &self.leading_args
    }

    /// Build the command-line arguments for a request.
    pub fn build_args(request: &RunRequest) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            "--output-format".to_string(),
            "json".to_string(),
        ];
        if let Some(system) = &request.system_prompt {
            args.push("--system-prompt".to_string());
            args.push(system.clone());
        }
        if let Some(schema) = &request.json_schema {
            args.push("--json-schema".to_string());
            args.push(schema.to_string());
        }
        if let Some(turns) = request.max_turns {
            args.push("--max-turns".to_string());
            args.push(turns.to_string());
        }
        args
    }

    /// Execute one request. The prompt goes over stdin; stdout is captured
    /// whole. Returns the raw outcome even on non-zero exit; deciding what
    /// a failure means is the caller's concern.
    pub async fn run(&self, request: &RunRequest) -> Result<RunOutcome> {
        let args = Self::build_args(request);
        hlog_debug!(
            "AgentRunner::run prompt={:.100} args={}",
            request.prompt,
            args.len()
        );

        let start = Instant::now();
        let mut cmd = Command::new(&self.binary);
        cmd.args(&self.leading_args)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &request.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::Executor(format!("failed to spawn agent executor: {}", e)))?;

        // Feed the prompt from a separate task so stdout can be drained at
        // the same time; a prompt larger than the pipe buffer would
        // otherwise deadlock against an executor that streams output early.
        // A write error means the child exited without reading stdin, and
        // the exit status already carries that failure.
        if let Some(mut stdin) = child.stdin.take() {
            let prompt = request.prompt.clone();
            tokio::spawn(async move {
                let _ = stdin.write_all(prompt.as_bytes()).await;
                // Close stdin so the executor sees EOF
                let _ = stdin.shutdown().await;
            });
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| Error::Timeout(self.timeout))?
            .map_err(Error::Io)?;

        let exit_code = output.status.code().unwrap_or(1);
        if exit_code != 0 {
            hlog_error!(
                "agent executor exited with code {}: {}",
                exit_code,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(RunOutcome {
            output: String::from_utf8_lossy(&output.stdout).to_string(),
            exit_code,
            duration: start.elapsed(),
        })
    }
}

/// Parse structured output from a headless executor call.
///
/// The executor's stdout can take several shapes, tried in order:
/// 1. a directly parseable JSON document;
/// 2. newline-delimited JSON records, where the record of interest has
///    `"type": "result"` or carries a `result` field;
/// then, when the chosen document wraps the payload in a `result` field:
/// 3. a `result` string parsed directly as JSON;
/// 4. a `result` string with the JSON inside a markdown code fence.
///
/// Fails with a descriptive executor error only when every attempt fails.
pub fn parse_structured<T: DeserializeOwned>(output: &str) -> Result<T> {
    let envelope = parse_envelope(output)?;

    if let Some(result) = envelope.get("result") {
        return match result {
            Value::String(text) => parse_result_string(text),
            other => serde_json::from_value(other.clone()).map_err(|e| {
                Error::Executor(format!("unexpected result payload shape: {}", e))
            }),
        };
    }

    serde_json::from_value(envelope)
        .map_err(|e| Error::Executor(format!("output does not match expected shape: {}", e)))
}

/// The executor cost reported in the envelope, when present.
pub fn envelope_cost_usd(output: &str) -> Option<f64> {
    parse_envelope(output)
        .ok()?
        .get("total_cost_usd")?
        .as_f64()
}

/// First stage of the chain: whole-document parse, then NDJSON scan.
fn parse_envelope(output: &str) -> Result<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(output) {
        return Ok(value);
    }
    find_result_record(output).ok_or_else(|| {
        Error::Executor("output is not valid JSON or NDJSON".to_string())
    })
}

/// Scan newline-delimited records for the result record.
fn find_result_record(output: &str) -> Option<Value> {
    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        if let Ok(value) = serde_json::from_str::<Value>(line) {
            let is_result = value.get("type").and_then(Value::as_str) == Some("result")
                || value.get("result").is_some();
            if is_result {
                return Some(value);
            }
        }
    }
    None
}

/// Parse a nested result string: direct JSON first, then the contents of a
/// markdown code fence.
fn parse_result_string<T: DeserializeOwned>(text: &str) -> Result<T> {
    if let Ok(parsed) = serde_json::from_str(text) {
        return Ok(parsed);
    }

    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE
        .get_or_init(|| Regex::new(r"```(?:json)?\s*\n?([\s\S]*?)\n?```").expect("static regex"));
    if let Some(captures) = fence.captures(text) {
        if let Ok(parsed) = serde_json::from_str(&captures[1]) {
            return Ok(parsed);
        }
    }

    Err(Error::Executor(format!(
        "failed to extract valid JSON from result: {:.200}",
        text
    )))
}
