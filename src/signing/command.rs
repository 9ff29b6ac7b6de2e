//! External signing tool
//!
//! Runs `<program> <args...> <absolute path>` (by default `gpg -ab`) and
//! expects the tool to leave `<absolute path>.asc` behind. The child is
//! polled until it exits or the timeout passes; on timeout it is killed.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use super::{signature_path, Signer, SigningError};

/// Default signing program
pub const DEFAULT_PROGRAM: &str = "gpg";

/// Default arguments: armored detached signature
pub const DEFAULT_ARGS: &[&str] = &["-ab"];

/// Default timeout for a single signature (5 minutes)
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Signer that shells out to an external detached-signature tool
#[derive(Debug, Clone)]
pub struct CommandSigner {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Default for CommandSigner {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            args: DEFAULT_ARGS.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }
}

impl CommandSigner {
    /// Create a signer for a program and its leading arguments
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            ..Self::default()
        }
    }

    /// Select the signing key (`--local-user <key_id>`)
    pub fn with_key_id(mut self, key_id: &str) -> Self {
        let mut args = vec!["--local-user".to_string(), key_id.to_string()];
        args.append(&mut self.args);
        self.args = args;
        self
    }

    /// Set the per-file timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Program that will be run
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments placed before the file path
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Per-file timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Signer for CommandSigner {
    fn sign(&self, path: &Path) -> Result<(), SigningError> {
        let absolute = fs::canonicalize(path).map_err(|source| SigningError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(program = %self.program, path = %absolute.display(), "invoking signing tool");

        // Stdin stays attached so an interactive passphrase prompt still works
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&absolute)
            .stdin(Stdio::inherit())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SigningError::Launch {
                program: self.program.clone(),
                source,
            })?;

        let stderr = child.stderr.take();
        let (stderr_tx, stderr_rx) = mpsc::channel();
        thread::spawn(move || {
            let mut output = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut output);
            }
            let _ = stderr_tx.send(output);
        });

        let start = Instant::now();
        let status = loop {
            let polled = child.try_wait().map_err(|source| SigningError::Io {
                path: absolute.clone(),
                source,
            })?;

            match polled {
                Some(status) => break status,
                None if start.elapsed() >= self.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    // The stderr reader is left detached; a grandchild may
                    // still hold the pipe open.
                    return Err(SigningError::Timeout {
                        path: absolute,
                        seconds: self.timeout.as_secs_f64(),
                    });
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        };

        // A background process forked by the tool may keep stderr open
        // after the tool itself exited; the deadline still applies.
        let remaining = self.timeout.saturating_sub(start.elapsed());
        let stderr = match stderr_rx.recv_timeout(remaining) {
            Ok(output) => output,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                return Err(SigningError::Timeout {
                    path: absolute,
                    seconds: self.timeout.as_secs_f64(),
                });
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => String::new(),
        };

        if !status.success() {
            return Err(SigningError::ToolFailed {
                path: absolute,
                program: self.program.clone(),
                exit_code: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        let sidecar = signature_path(&absolute);
        if !sidecar.is_file() {
            return Err(SigningError::MissingSignature { path: sidecar });
        }

        Ok(())
    }
}
