//! External memo pipeline invocation.
//!
//! The pipeline is a black-box process called as
//! `<program> <target> <staged-input> <expected-output> [--today <date>]`.
//! Its standard streams are diagnostics only; the memo is whatever it writes
//! to the expected-output path.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::error::{Diagnostics, GenerationError};
use crate::validation::DATE_FORMAT;

/// How long to keep draining stdout/stderr once the child is gone, capped by
/// the pipeline timeout.
const STREAM_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Arguments for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub reference_date: Option<NaiveDate>,
}

/// What the pipeline did: exit status plus everything it printed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl PipelineOutput {
    /// Exit status 0. Anything on stderr does not change this.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        Diagnostics {
            stdout: self.stdout,
            stderr: self.stderr,
        }
    }
}

/// Runs the memo pipeline once.
///
/// A non-zero exit is *not* an error at this level: implementations return
/// `Ok` with the exit code and let the caller decide. `Err` is reserved for
/// runs that never produced an exit status (spawn failure, timeout, lost
/// child).
#[async_trait]
pub trait PipelineInvoker: Send + Sync {
    async fn invoke(&self, request: &InvocationRequest) -> Result<PipelineOutput, GenerationError>;
}

/// Build the argument vector that follows the program name.
pub fn pipeline_args(target: &str, request: &InvocationRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        target.into(),
        request.input_path.clone().into(),
        request.output_path.clone().into(),
    ];
    if let Some(date) = request.reference_date {
        args.push("--today".into());
        args.push(date.format(DATE_FORMAT).to_string().into());
    }
    args
}

/// Launches the pipeline as a child process via `tokio::process`.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    config: PipelineConfig,
}

impl ProcessInvoker {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PipelineInvoker for ProcessInvoker {
    async fn invoke(&self, request: &InvocationRequest) -> Result<PipelineOutput, GenerationError> {
        let program = &self.config.program;
        let mut command = Command::new(program);
        command
            .args(pipeline_args(&self.config.target, request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &self.config.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|source| {
            error!(%program, target = %self.config.target, "failed to spawn pipeline: {source}");
            GenerationError::Spawn {
                program: program.clone(),
                source,
            }
        })?;
        info!(%program, target = %self.config.target, pid = child.id(), "pipeline started");

        let stdout = StreamCapture::start(child.stdout.take());
        let stderr = StreamCapture::start(child.stderr.take());

        let deadline = self.config.timeout.map(|limit| Instant::now() + limit);
        let waited = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, child.wait()).await.ok(),
            None => Some(child.wait().await),
        };

        let status = match waited {
            Some(Ok(status)) => status,
            Some(Err(source)) => {
                error!(%program, "failed to wait for pipeline: {source}");
                let drain_until = Instant::now() + STREAM_DRAIN_GRACE;
                return Err(GenerationError::Wait {
                    program: program.clone(),
                    source,
                    diagnostics: Diagnostics {
                        stdout: stdout.finish(drain_until).await,
                        stderr: stderr.finish(drain_until).await,
                    },
                });
            }
            None => {
                let limit = self.config.timeout.unwrap_or_default();
                warn!(%program, timeout_secs = limit.as_secs(), "pipeline timed out; killing");
                if let Err(e) = child.kill().await {
                    warn!(%program, "failed to kill pipeline: {e}");
                }
                let drain_until = Instant::now() + STREAM_DRAIN_GRACE;
                return Err(GenerationError::Timeout {
                    timeout: limit,
                    diagnostics: Diagnostics {
                        stdout: stdout.finish(drain_until).await,
                        stderr: stderr.finish(drain_until).await,
                    },
                });
            }
        };

        // Processes the pipeline left running may still hold the pipes open.
        let mut drain_until = Instant::now() + STREAM_DRAIN_GRACE;
        if let Some(deadline) = deadline {
            drain_until = drain_until.min(deadline);
        }
        let output = PipelineOutput {
            exit_code: status.code(),
            stdout: stdout.finish(drain_until).await,
            stderr: stderr.finish(drain_until).await,
        };
        debug!(
            %program,
            exit_code = ?output.exit_code,
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "pipeline finished"
        );
        Ok(output)
    }
}

/// A child stream accumulated on its own task while the child runs.
///
/// Bytes land in a shared buffer as they arrive, so whatever was read is
/// still available when draining has to stop early.
struct StreamCapture {
    buf: Arc<Mutex<Vec<u8>>>,
    task: Option<JoinHandle<()>>,
}

impl StreamCapture {
    fn start<R>(stream: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let task = stream.map(|mut stream| {
            let buf = Arc::clone(&buf);
            tokio::spawn(async move {
                let mut chunk = [0u8; 8192];
                loop {
                    match stream.read(&mut chunk).await {
                        Ok(0) => break,
                        Ok(n) => match buf.lock() {
                            Ok(mut buf) => buf.extend_from_slice(&chunk[..n]),
                            Err(_) => break,
                        },
                        Err(e) => {
                            warn!("pipeline stream read failed: {e}");
                            break;
                        }
                    }
                }
            })
        });
        Self { buf, task }
    }

    /// Wait for end-of-stream until `until`, then return what was captured.
    async fn finish(self, until: Instant) -> String {
        if let Some(mut task) = self.task {
            if tokio::time::timeout_at(until, &mut task).await.is_err() {
                warn!("pipeline stream still open after exit; truncating capture");
                task.abort();
            }
        }
        let bytes = match self.buf.lock() {
            Ok(buf) => buf.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
