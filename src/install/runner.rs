//! Child process execution for installer binaries and scripts

use std::ffi::OsStr;
use std::process::Stdio;

use log::{debug, warn};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::{MeowError, ProcessFailure, Result};

/// Runs a command to completion, optionally wiring its streams to ours
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run `program` with `args` and wait for it to exit.
    ///
    /// With `forward_output` the child inherits stdin, stdout and stderr;
    /// otherwise all three are discarded. Cancellation kills the child.
    pub async fn run<I, S>(
        &self,
        program: &str,
        args: I,
        forward_output: bool,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let stdio = || {
            if forward_output {
                Stdio::inherit()
            } else {
                Stdio::null()
            }
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(stdio())
            .stdout(stdio())
            .stderr(stdio())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MeowError::process(program, ProcessFailure::Launch(e)))?;

        debug!("started `{}` (pid {:?})", program, child.id());

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                if let Err(e) = child.kill().await {
                    warn!("failed to kill `{program}` after cancellation: {e}");
                }
                return Err(MeowError::process(program, ProcessFailure::Cancelled));
            }
            status = child.wait() => {
                status.map_err(|e| MeowError::process(program, ProcessFailure::Wait(e)))?
            }
        };

        if !status.success() {
            return Err(MeowError::process(program, ProcessFailure::Exited(status)));
        }

        debug!("`{program}` finished successfully");
        Ok(())
    }
}
