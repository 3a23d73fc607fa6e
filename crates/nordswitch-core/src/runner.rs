// ── Client command execution ──
//
// Every interaction with the NordVPN client is one subprocess. The
// `ClientRunner` trait is the seam: `ProcessRunner` spawns real processes,
// tests script the outputs.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::CoreError;

/// One command line to run against the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Run through the platform shell (`cmd /C` on Windows).
    pub shell: bool,
    /// Arguments carry secrets and are hidden when displayed.
    pub sensitive: bool,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            working_dir: None,
            shell: false,
            sensitive: false,
        }
    }

    /// Build from a full argv (`[program, args...]`).
    pub fn from_argv(mut argv: Vec<String>) -> Self {
        let program = if argv.is_empty() {
            String::new()
        } else {
            argv.remove(0)
        };
        Self {
            program,
            args: argv,
            working_dir: None,
            shell: false,
            sensitive: false,
        }
    }

    #[must_use]
    pub fn in_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    #[must_use]
    pub fn through_shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }

    #[must_use]
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        if self.sensitive {
            if let Some(verb) = self.args.first() {
                write!(f, " {verb}")?;
            }
            return f.write_str(" <redacted>");
        }
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished client command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ClientOutput {
    /// Convenience for a successful run with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Convenience for a failed run with the given exit code and stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// stdout followed by stderr, for marker matching.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Runs client commands and waits for them to finish.
///
/// Launch failures and timeouts are errors; a non-zero exit is *not* an
/// error at this level, callers decide what an exit code means.
pub trait ClientRunner: Send + Sync {
    fn run(
        &self,
        invocation: &Invocation,
    ) -> impl Future<Output = Result<ClientOutput, CoreError>> + Send;
}

/// Spawns real subprocesses via `tokio::process`.
///
/// Children are killed when their future is dropped, so a timeout or a
/// cancelled caller never leaks a process handle.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
        }
    }
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn command(invocation: &Invocation) -> Command {
        let mut cmd = if invocation.shell && cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(&invocation.program);
            cmd
        } else {
            Command::new(&invocation.program)
        };
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl ClientRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ClientOutput, CoreError> {
        debug!(command = %invocation, dir = ?invocation.working_dir, "running client command");

        let invocation_error = |reason: String| CoreError::ClientInvocation {
            command: invocation.to_string(),
            reason,
        };

        let child = Self::command(invocation)
            .spawn()
            .map_err(|e| invocation_error(format!("failed to launch: {e}")))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| invocation_error(format!("timed out after {}s", self.timeout.as_secs())))?
            .map_err(|e| invocation_error(format!("failed to collect output: {e}")))?;

        let result = ClientOutput {
            code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(command = %invocation, code = ?result.code, "client command finished");
        Ok(result)
    }
}
