//! External engine invocation
//!
//! The engine command line has three parts, in order:
//!
//! 1. caller flags the engine itself understands (`--proxy=...`, `--web-security=no`, ...)
//! 2. the harness bootstrap script with its own fixed flags
//! 3. every other caller flag, then `test <staged file>` and the configured defaults
//!
//! [`ProcessRunner`] spawns it with tokio, hands stdout to a callback line by line while the
//! engine is still running, and collects stderr on the side.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::cancel::CancellationToken;
use crate::config::EngineConfig;

/// Caller args with this prefix would pick another engine and are dropped.
const ENGINE_SELECTOR: &str = "--engine=";

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("engine binary not found: {}", .program.display())]
    NotFound { program: PathBuf },

    #[error("permission denied when starting {}", .program.display())]
    PermissionDenied { program: PathBuf },

    #[error("failed to start {}: {error}", .program.display())]
    Spawn { program: PathBuf, error: io::Error },

    #[error("I/O error while running {}: {error}", .program.display())]
    Io { program: PathBuf, error: io::Error },
}

impl ProcessError {
    fn spawn(program: &Path, error: io::Error) -> Self {
        let program = program.to_path_buf();
        match error.kind() {
            io::ErrorKind::NotFound => ProcessError::NotFound { program },
            io::ErrorKind::PermissionDenied => ProcessError::PermissionDenied { program },
            _ => ProcessError::Spawn { program, error },
        }
    }
}

/// A fully resolved engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl EngineCommand {
    pub fn build(config: &EngineConfig, install_dir: &Path, staged_entry: &Path, caller_args: &[String]) -> Self {
        let (native, harness): (Vec<&String>, Vec<&String>) = caller_args
            .iter()
            .filter(|arg| !arg.starts_with(ENGINE_SELECTOR))
            .partition(|arg| is_native_flag(arg, &config.native_flags));

        let mut args: Vec<String> = native.into_iter().cloned().collect();
        args.push(config.bootstrap_script.display().to_string());
        args.push(format!("--{}={}", config.bootstrap_flag, config.harness_root.display()));
        args.push("--cli".to_string());
        args.extend(harness.into_iter().cloned());
        args.push("test".to_string());
        args.push(staged_entry.display().to_string());
        args.extend(config.default_args.iter().cloned());

        Self {
            program: install_dir.join(&config.binary),
            args,
            working_dir: install_dir.to_path_buf(),
        }
    }
}

/// `--name` or `--name=value` where `name` is on the allow-list.
fn is_native_flag(arg: &str, native_flags: &[String]) -> bool {
    let Some(flag) = arg.strip_prefix("--") else {
        return false;
    };
    let name = flag.split('=').next().unwrap_or(flag);
    native_flags.iter().any(|n| n == name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineExit {
    /// `None` when the process was terminated by a signal
    pub code: Option<i32>,
    pub stderr: String,
    /// Set when the runner stopped the engine rather than letting it finish
    pub stopped: Option<StopReason>,
}

impl EngineExit {
    pub fn success(&self) -> bool {
        self.stopped.is_none() && self.code == Some(0)
    }
}

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
    kill_grace: Duration,
}

impl ProcessRunner {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            timeout: config.timeout(),
            kill_grace: config.kill_grace(),
        }
    }

    /// Run the engine, calling `on_line` for every stdout line as it arrives.
    ///
    /// On cancellation or timeout the engine gets `kill_grace` to finish writing, then it is
    /// killed and the remaining output is discarded.
    pub async fn run(
        &self,
        command: &EngineCommand,
        cancel: &CancellationToken,
        mut on_line: impl FnMut(&str),
    ) -> Result<EngineExit, ProcessError> {
        info!(program = %command.program.display(), "starting engine");
        debug!(args = ?command.args, cwd = %command.working_dir.display());

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|error| ProcessError::spawn(&command.program, error))?;

        let io_error = |error| ProcessError::Io {
            program: command.program.clone(),
            error,
        };
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io_error(io::Error::other("stdout not captured")))?;
        let stderr_task = child.stderr.take().map(|stderr| tokio::spawn(read_all(stderr)));

        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut stopped = None;
        let mut kill_at = None;
        let mut lines = BufReader::new(stdout).split(b'\n');

        // The child is only awaited once stdout is closed; the timers stay armed until it exits.
        let mut stdout_open = true;
        let finished = loop {
            tokio::select! {
                segment = lines.next_segment(), if stdout_open => match segment {
                    Ok(Some(bytes)) => {
                        let line = String::from_utf8_lossy(&bytes);
                        on_line(line.strip_suffix('\r').unwrap_or(&*line));
                    }
                    Ok(None) => stdout_open = false,
                    Err(error) => return Err(io_error(error)),
                },
                status = child.wait(), if !stdout_open => break Some(status.map_err(io_error)?),
                _ = cancel.cancelled(), if stopped.is_none() => {
                    info!("cancelled, stopping engine");
                    stopped = Some(StopReason::Cancelled);
                    kill_at = Some(Instant::now() + self.kill_grace);
                }
                _ = sleep_until(deadline), if stopped.is_none() && deadline.is_some() => {
                    warn!("engine timed out");
                    stopped = Some(StopReason::TimedOut);
                    kill_at = Some(Instant::now() + self.kill_grace);
                }
                _ = sleep_until(kill_at), if kill_at.is_some() => {
                    warn!("engine still running after {:?}, killing it", self.kill_grace);
                    break None;
                }
            }
        };

        let status = match finished {
            Some(status) => status,
            None => {
                if let Ok(None) = child.try_wait() {
                    child.start_kill().map_err(io_error)?;
                }
                child.wait().await.map_err(io_error)?
            }
        };

        let stderr = match stderr_task {
            Some(task) => match tokio::time::timeout(self.kill_grace, task).await {
                Ok(Ok(text)) => text,
                Ok(Err(error)) => {
                    warn!("stderr reader failed: {}", error);
                    String::new()
                }
                Err(_) => String::new(),
            },
            None => String::new(),
        };

        info!(code = ?status.code(), "engine exited");
        Ok(EngineExit {
            code: status.code(),
            stderr,
            stopped,
        })
    }
}

async fn read_all(mut stream: impl AsyncRead + Unpin) -> String {
    let mut buf = Vec::new();
    if let Err(error) = stream.read_to_end(&mut buf).await {
        debug!("stderr read stopped: {}", error);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_native_flag_matching_is_by_name() {
        let native = args(&["proxy", "w", "wd"]);
        assert!(is_native_flag("--proxy=127.0.0.1:8080", &native));
        assert!(is_native_flag("--wd", &native));
        assert!(is_native_flag("--w=1", &native));
        assert!(!is_native_flag("--proxy-type=socks5", &native));
        assert!(!is_native_flag("--web-security=no", &native));
        assert!(!is_native_flag("proxy", &native));
        assert!(!is_native_flag("-w", &native));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_layout() {
        let command = EngineCommand::build(
            &EngineConfig::default(),
            Path::new("/opt/adapter"),
            Path::new("/opt/adapter/tmp/casper-1/login.js"),
            &args(&[
                "--proxy=127.0.0.1:8080",
                "--engine=slimerjs",
                "--verbose",
                "--web-security=no",
                "--log-level=debug",
                "--wd",
            ]),
        );
        assert_eq!(command.program, PathBuf::from("/opt/adapter/PhantomJs/phantomjs"));
        assert_eq!(command.working_dir, PathBuf::from("/opt/adapter"));
        insta::assert_snapshot!(command.args.join("\n"), @r"
        --proxy=127.0.0.1:8080
        --web-security=no
        --wd
        CasperJs/bin/bootstrap.js
        --casper-path=CasperJs
        --cli
        --verbose
        --log-level=debug
        test
        /opt/adapter/tmp/casper-1/login.js
        --ignore-ssl-errors=true
        ");
    }

    #[test]
    fn test_absolute_binary_ignores_install_dir() {
        let config = EngineConfig {
            binary: std::env::temp_dir().join("phantomjs"),
            ..EngineConfig::default()
        };
        let command = EngineCommand::build(&config, Path::new("install"), Path::new("t.js"), &[]);
        assert_eq!(command.program, config.binary);
    }

    #[test]
    fn test_exit_success() {
        let exit = EngineExit {
            code: Some(0),
            stderr: String::new(),
            stopped: None,
        };
        assert!(exit.success());
        let cancelled = EngineExit {
            stopped: Some(StopReason::Cancelled),
            ..exit
        };
        assert!(!cancelled.success());
    }
}
