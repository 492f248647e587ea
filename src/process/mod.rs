//! External process harness
//!
//! Spawns collaborator programs, feeds an optional stdin payload, and
//! drains stdout and stderr concurrently so neither the child nor the
//! harness can deadlock on a full pipe buffer.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::debug;

/// Captured outcome of one external-process invocation.
///
/// Lives only for the duration of the call that produced it; nothing is
/// shared between invocations.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    /// Whether the child exited with status zero.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code of the child, or -1 if it was terminated by a signal.
    pub fn exit_code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }

    /// Captured stderr as text, for diagnostics.
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Failures of the harness itself.
///
/// A nonzero child exit is not one of these; it is a normal outcome
/// reported through [`ProcessOutput`].
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },
    #[error("i/o error while talking to `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs external programs with piped stdio under a hard time bound.
#[derive(Debug, Clone)]
pub struct ProcessHarness {
    timeout: Duration,
}

impl ProcessHarness {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run `program` with `args`, feeding `stdin_payload` (if any) and
    /// capturing both output streams to completion.
    ///
    /// The stdin pipe is closed once the payload is fully written, so
    /// children that read until end-of-input can make progress. On
    /// timeout the child is killed and reaped before the error returns.
    pub async fn run(
        &self,
        program: &str,
        args: &[String],
        stdin_payload: Option<&[u8]>,
    ) -> Result<ProcessOutput, HarnessError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HarnessError::Launch {
                program: program.to_string(),
                source,
            })?;

        let mut stdin = child.stdin.take();
        let mut stdout = child.stdout.take().expect("stdout piped");
        let mut stderr = child.stderr.take().expect("stderr piped");

        let feed_stdin = async {
            // Moving the handle out of the Option drops it at the end of
            // this block, which closes the child's stdin.
            if let Some(mut pipe) = stdin.take() {
                if let Some(payload) = stdin_payload {
                    match pipe.write_all(payload).await {
                        Ok(()) => {}
                        // A child may exit without consuming its stdin;
                        // its exit status still decides the outcome.
                        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => return Ok(()),
                        Err(e) => return Err(e),
                    }
                }
                match pipe.shutdown().await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => return Ok(()),
                    Err(e) => return Err(e),
                }
            }
            Ok::<(), std::io::Error>(())
        };

        let drain_stdout = async {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).await?;
            Ok::<Vec<u8>, std::io::Error>(buf)
        };

        let drain_stderr = async {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).await?;
            Ok::<Vec<u8>, std::io::Error>(buf)
        };

        let run = async {
            // All three must progress together: a child blocked writing
            // one stream while we only read the other would wedge both
            // sides once the OS pipe buffer fills.
            let ((), out, err) = tokio::try_join!(feed_stdin, drain_stdout, drain_stderr)?;
            let status = child.wait().await?;
            Ok::<ProcessOutput, std::io::Error>(ProcessOutput {
                status,
                stdout: out,
                stderr: err,
            })
        };

        // Bind before matching so the borrow of `child` held by the
        // future ends here; the timeout arm needs the handle back.
        let outcome = tokio::time::timeout(self.timeout, run).await;
        match outcome {
            Ok(Ok(output)) => {
                debug!(
                    program,
                    exit_code = output.exit_code(),
                    stdout_bytes = output.stdout.len(),
                    stderr_bytes = output.stderr.len(),
                    "process finished"
                );
                Ok(output)
            }
            Ok(Err(source)) => Err(HarnessError::Io {
                program: program.to_string(),
                source,
            }),
            Err(_) => {
                // kill() also reaps, so no zombie is left behind.
                let _ = child.kill().await;
                Err(HarnessError::Timeout {
                    program: program.to_string(),
                    timeout: self.timeout,
                })
            }
        }
    }
}
