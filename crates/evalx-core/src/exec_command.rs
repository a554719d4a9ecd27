use crate::exec::{ExecError, ExecRequest, Executor, TimeLimits, TrustedOutput};
use crate::types::{Input, Status, SuiteResult};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum Mode {
    Check,
    Trusted,
}

#[derive(Serialize)]
struct HarnessRequest<'a> {
    mode: Mode,
    program: &'a str,
    entry_point: &'a str,
    inputs: &'a [Input],
    #[serde(skip_serializing_if = "Option::is_none")]
    expected: Option<&'a [JsonValue]>,
    atol: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_limits: Option<Vec<f64>>,
    fast_check: bool,
}

#[derive(Deserialize)]
struct CheckReply {
    status: Status,
    #[serde(default)]
    details: Vec<bool>,
}

#[derive(Deserialize)]
struct TrustedReply {
    outputs: Vec<JsonValue>,
    times: Vec<f64>,
}

struct HarnessOutcome {
    exit_code: Option<i32>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

/// Executes programs through an external harness process speaking JSON on
/// stdin/stdout. One child process per suite run.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    program: PathBuf,
    args: Vec<String>,
    limits: TimeLimits,
    trusted_timeout: Option<Duration>,
}

impl CommandExecutor {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            limits: TimeLimits::default(),
            trusted_timeout: None,
        }
    }

    pub fn with_limits(mut self, limits: TimeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_trusted_timeout(mut self, timeout: Duration) -> Self {
        self.trusted_timeout = Some(timeout);
        self
    }

    fn spawn(
        &self,
        request: &HarnessRequest<'_>,
        timeout: Option<Duration>,
    ) -> Result<HarnessOutcome, ExecError> {
        let payload = serde_json::to_vec(request)
            .map_err(|err| ExecError::new(format!("encode harness request: {err}")))?;

        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        isolate(&mut command);

        let mut child = command.spawn().map_err(|err| {
            ExecError::new(format!("spawn harness {}: {err}", self.program.display()))
        })?;

        // Pipes are serviced on helper threads; the timeout must hold even when
        // the child stops reading or floods its output.
        let stdin_writer = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || {
                if let Err(err) = stdin.write_all(&payload) {
                    debug!(error = %err, "harness closed stdin early");
                }
            })
        });
        let stdout_reader = child.stdout.take().map(|mut out| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = out.read_to_end(&mut buf);
                buf
            })
        });
        let stderr_reader = child.stderr.take().map(|mut err| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = err.read_to_end(&mut buf);
                buf
            })
        });

        let exit_code = match timeout {
            Some(timeout) => match child
                .wait_timeout(timeout)
                .map_err(|err| ExecError::new(format!("wait harness: {err}")))?
            {
                Some(status) => Some(status.code().unwrap_or(1)),
                None => {
                    kill_group(&mut child);
                    // Pipe threads are left detached: an escaped descendant
                    // may still hold the write ends.
                    return Ok(HarnessOutcome {
                        exit_code: None,
                        stdout: Vec::new(),
                        stderr: Vec::new(),
                    });
                }
            },
            None => {
                let status = child
                    .wait()
                    .map_err(|err| ExecError::new(format!("wait harness: {err}")))?;
                Some(status.code().unwrap_or(1))
            }
        };

        if let Some(handle) = stdin_writer {
            let _ = handle.join();
        }
        let stdout = stdout_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        Ok(HarnessOutcome {
            exit_code,
            stdout,
            stderr,
        })
    }
}

/// Puts the harness in its own process group so a timeout can reach every
/// process it forked.
#[cfg(unix)]
fn isolate(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate(_command: &mut Command) {}

fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pid) = i32::try_from(child.id()) {
            // SAFETY: plain signal delivery; the group id is the child's pid
            // because of `process_group(0)` at spawn.
            unsafe {
                let _ = libc::kill(-pid, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

impl Executor for CommandExecutor {
    fn run(&self, request: &ExecRequest<'_>) -> SuiteResult {
        let harness_request = HarnessRequest {
            mode: Mode::Check,
            program: request.program,
            entry_point: request.entry_point,
            inputs: request.inputs,
            expected: request.expected,
            atol: request.atol,
            time_limits: request.ref_time.map(|times| self.limits.case_limits(times)),
            fast_check: request.fast_check,
        };
        let timeout = self.limits.suite_limit(request.ref_time);

        let outcome = match self.spawn(&harness_request, Some(timeout)) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "execution harness unavailable");
                return SuiteResult::new(Status::Error, Vec::new());
            }
        };
        if outcome.exit_code.is_none() {
            return SuiteResult::new(Status::Timeout, Vec::new());
        }

        match serde_json::from_slice::<CheckReply>(&outcome.stdout) {
            Ok(reply) => SuiteResult::new(reply.status, reply.details),
            Err(err) => {
                warn!(
                    error = %err,
                    exit_code = ?outcome.exit_code,
                    stderr = %String::from_utf8_lossy(&outcome.stderr),
                    "unreadable harness reply"
                );
                SuiteResult::new(Status::Error, Vec::new())
            }
        }
    }

    fn trusted_exec(
        &self,
        program: &str,
        inputs: &[Input],
        entry_point: &str,
    ) -> Result<TrustedOutput, ExecError> {
        let harness_request = HarnessRequest {
            mode: Mode::Trusted,
            program,
            entry_point,
            inputs,
            expected: None,
            atol: 0.0,
            time_limits: None,
            fast_check: false,
        };

        let outcome = self.spawn(&harness_request, self.trusted_timeout)?;
        let Some(exit_code) = outcome.exit_code else {
            return Err(ExecError::new("reference run timed out"));
        };
        if exit_code != 0 {
            return Err(ExecError::new(format!(
                "reference run exited with {exit_code}: {}",
                String::from_utf8_lossy(&outcome.stderr).trim()
            )));
        }

        let reply: TrustedReply = serde_json::from_slice(&outcome.stdout)
            .map_err(|err| ExecError::new(format!("parse reference reply: {err}")))?;
        Ok(TrustedOutput {
            outputs: reply.outputs,
            times: reply.times,
        })
    }
}
