//! Builder for executing external tool commands.

use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{ChildStderr, ChildStdout, Command};

use crate::{Error, Result};

/// How much of a tool's stderr is kept for error messages when streaming.
const STDERR_TAIL_LIMIT: usize = 4096;

/// Destination for a subprocess output channel.
pub type OutputSink<'a> = &'a mut (dyn AsyncWrite + Unpin + Send);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8). Empty when streamed to a sink.
    pub stdout: String,
    /// Captured standard error (lossy UTF-8). Only the tail when streamed.
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use clipsplice_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> clipsplice_av::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .args(["-v", "error", "-print_format", "json", "-show_format"])
///     .arg("/path/to/video.mp4")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set (or clear) the maximum execution time.
    pub fn timeout(&mut self, d: Option<Duration>) -> &mut Self {
        self.timeout = d;
        self
    }

    /// The arguments appended so far.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Program and arguments joined with spaces, for logging.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.to_string_lossy().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - [`Error::ToolNotFound`] if the program cannot be located.
    /// - [`Error::ToolFailed`] if spawning fails otherwise, the timeout
    ///   expires, or the process exits non-zero (message includes stderr).
    pub async fn execute(&self) -> Result<ToolOutput> {
        let mut cmd = self.command();
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("exec: {}", self.command_line());
        let child = cmd.spawn().map_err(|e| self.spawn_error(e))?;

        let output = self
            .with_timeout(child.wait_with_output())
            .await?
            .map_err(|e| {
                Error::tool_failed(
                    self.program_name(),
                    format!("I/O error waiting for process: {e}"),
                )
            })?;

        self.check_status(ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Execute the command, streaming its output channels into sinks.
    ///
    /// Stdout goes to `stdout` or is discarded. Stderr goes to `stderr` if
    /// given; its tail is always retained so failures can report the tool's
    /// diagnostics.
    pub async fn execute_streaming(
        &self,
        stdout: Option<OutputSink<'_>>,
        stderr: Option<OutputSink<'_>>,
    ) -> Result<ToolOutput> {
        let mut cmd = self.command();
        cmd.stdout(if stdout.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stderr(Stdio::piped());

        tracing::debug!("exec: {}", self.command_line());
        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;
        let child_stdout = child.stdout.take();
        let child_stderr = child.stderr.take();

        let run = async {
            let (_, tail, status) = tokio::try_join!(
                pump_stdout(child_stdout, stdout),
                pump_stderr(child_stderr, stderr),
                child.wait(),
            )?;
            Ok::<_, std::io::Error>((tail, status))
        };

        let (tail, status) = self.with_timeout(run).await?.map_err(|e| {
            Error::tool_failed(
                self.program_name(),
                format!("I/O error while streaming output: {e}"),
            )
        })?;

        self.check_status(ToolOutput {
            status,
            stdout: String::new(),
            stderr: String::from_utf8_lossy(&tail).to_string(),
        })
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(Stdio::null());
        // A timed-out or abandoned child must not outlive us.
        cmd.kill_on_drop(true);
        cmd
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    fn spawn_error(&self, err: std::io::Error) -> Error {
        if err.kind() == ErrorKind::NotFound {
            Error::tool_not_found(self.program_name())
        } else {
            Error::tool_failed(self.program_name(), format!("failed to spawn: {err}"))
        }
    }

    async fn with_timeout<F: Future>(&self, fut: F) -> Result<F::Output> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                Error::tool_failed(self.program_name(), format!("timed out after {limit:?}"))
            }),
            None => Ok(fut.await),
        }
    }

    fn check_status(&self, output: ToolOutput) -> Result<ToolOutput> {
        if output.status.success() {
            return Ok(output);
        }

        let diagnostics = output.stderr.trim();
        let message = if diagnostics.is_empty() {
            output.status.to_string()
        } else {
            format!("{}: {diagnostics}", output.status)
        };
        Err(Error::tool_failed(self.program_name(), message))
    }
}

async fn pump_stdout(
    src: Option<ChildStdout>,
    sink: Option<OutputSink<'_>>,
) -> std::io::Result<()> {
    if let (Some(mut src), Some(sink)) = (src, sink) {
        tokio::io::copy(&mut src, &mut *sink).await?;
        sink.flush().await?;
    }
    Ok(())
}

async fn pump_stderr(
    src: Option<ChildStderr>,
    mut sink: Option<OutputSink<'_>>,
) -> std::io::Result<Vec<u8>> {
    let mut tail = Vec::new();
    let Some(mut src) = src else {
        return Ok(tail);
    };

    let mut buf = [0u8; 8192];
    loop {
        let n = src.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        if let Some(sink) = sink.as_deref_mut() {
            sink.write_all(&buf[..n]).await?;
        }
        tail.extend_from_slice(&buf[..n]);
        if tail.len() > STDERR_TAIL_LIMIT {
            let excess = tail.len() - STDERR_TAIL_LIMIT;
            tail.drain(..excess);
        }
    }

    if let Some(sink) = sink.as_deref_mut() {
        sink.flush().await?;
    }
    Ok(tail)
}
