/// Execution Engine - runs one piece of code against one input
///
/// **Core Responsibility:**
/// Execute source code with an input string and capture everything it prints.
///
/// **Architectural Boundary:**
/// - Engine knows HOW to execute (interpreter process, harness, timeout)
/// - Engine does NOT know scoring rules or test cases
/// - Engine returns raw output for the evaluator to judge
///
/// Each call spawns a fresh interpreter process, so no captured output can
/// leak between invocations. There is no sandbox: submitted code runs with the
/// privileges of the grading process.

use crate::config::LanguageConfigManager;
use async_trait::async_trait;
use codebank_common::config::{Config, RuntimeErrorPolicy};
use codebank_common::types::{ExecutionRequest, ExecutionResult, Language};
use serde::Deserialize;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Limits applied before anything reaches an interpreter
pub const MAX_SOURCE_CODE_BYTES: usize = 1024 * 1024; // 1MB
pub const MAX_INPUT_BYTES: usize = 10 * 1024 * 1024; // 10MB

const JAVASCRIPT_HARNESS: &str = include_str!("../harness/javascript.js");

#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Whether this engine can run `language` at all
    fn supports(&self, language: Language) -> bool;

    async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult;
}

/// Final line a harness writes to stdout
#[derive(Debug, PartialEq, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum HarnessReport {
    Ok { output: String },
    Error { message: String },
}

/// The harness report is the last non-empty line of stdout. Anything the
/// submitted code wrote to the real stdout comes before it and is ignored.
fn parse_report(stdout: &str) -> Option<HarnessReport> {
    let line = stdout.lines().rev().find(|line| !line.trim().is_empty())?;
    serde_json::from_str(line).ok()
}

fn harness_args(language: Language) -> [&'static str; 2] {
    match language {
        Language::JavaScript => ["-e", JAVASCRIPT_HARNESS],
    }
}

/// Executes code by piping it into a language harness run by a local interpreter
pub struct ProcessEngine {
    languages: LanguageConfigManager,
    timeout: Option<Duration>,
    policy: RuntimeErrorPolicy,
}

impl ProcessEngine {
    pub fn new(
        languages: LanguageConfigManager,
        timeout: Option<Duration>,
        policy: RuntimeErrorPolicy,
    ) -> Self {
        Self {
            languages,
            timeout,
            policy,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let languages = LanguageConfigManager::load_or_builtin(&config.languages_config)?;
        Ok(Self::new(
            languages,
            config.execution_timeout_ms.map(Duration::from_millis),
            config.runtime_error_policy,
        ))
    }

    pub fn languages(&self) -> &LanguageConfigManager {
        &self.languages
    }
}

#[async_trait]
impl CodeExecutor for ProcessEngine {
    fn supports(&self, language: Language) -> bool {
        self.languages.is_enabled(&language)
    }

    #[tracing::instrument(skip(self, request), fields(language = %request.language))]
    async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        let Some(config) = self.languages.get_config(&request.language) else {
            return ExecutionResult::failure(format!(
                "unsupported language: {} has no configured runtime",
                request.language
            ));
        };

        let payload = serde_json::json!({
            "code": request.code,
            "input": request.input,
            "strict": self.policy == RuntimeErrorPolicy::Strict,
        })
        .to_string();

        let start_time = Instant::now();

        let mut child = match Command::new(&config.command)
            .args(&config.args)
            .args(harness_args(request.language))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!(command = %config.command, error = %e, "Failed to start interpreter");
                return ExecutionResult::failure(format!(
                    "failed to start {}: {}",
                    config.command, e
                ));
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                return ExecutionResult::failure(format!("failed to send code to interpreter: {}", e));
            }
            // Closing stdin lets the harness finish reading
            drop(stdin);
        }

        let waiting = child.wait_with_output();
        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, waiting).await {
                Ok(result) => result,
                Err(_) => {
                    // Dropping the future kills the child
                    warn!(timeout_ms = limit.as_millis() as u64, "Execution timed out");
                    return ExecutionResult::failure(format!(
                        "execution timed out after {} ms",
                        limit.as_millis()
                    ));
                }
            },
            None => waiting.await,
        };

        let output = match output {
            Ok(output) => output,
            Err(e) => return ExecutionResult::failure(format!("failed to collect output: {}", e)),
        };

        let execution_ms = start_time.elapsed().as_millis() as u64;
        let stdout = String::from_utf8_lossy(&output.stdout);

        match parse_report(&stdout) {
            Some(HarnessReport::Ok { output }) => {
                debug!(execution_ms, output_bytes = output.len(), "Execution completed");
                ExecutionResult::success(output)
            }
            Some(HarnessReport::Error { message }) => {
                debug!(execution_ms, "Execution raised an error");
                ExecutionResult::failure(message)
            }
            None => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let detail = stderr.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
                warn!(
                    execution_ms,
                    status = %output.status,
                    error_preview = detail,
                    "Interpreter exited without a report"
                );
                ExecutionResult::failure(format!(
                    "interpreter exited with {}: {}",
                    output.status, detail
                ))
            }
        }
    }
}
