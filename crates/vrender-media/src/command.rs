//! Remotion CLI command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};

/// Lines of stderr kept for error reports.
const STDERR_TAIL_LINES: usize = 40;

/// Builder for `npx remotion <subcommand>` invocations.
#[derive(Debug, Clone)]
pub struct RemotionCommand {
    /// Launcher binary (usually `npx`)
    launcher: String,
    /// Remotion subcommand (`bundle`, `compositions`, `render`)
    subcommand: &'static str,
    /// Positional arguments after the subcommand
    positional: Vec<String>,
    /// `--flag[=value]` arguments
    flags: Vec<String>,
    /// Directory holding the Remotion node project
    working_dir: Option<PathBuf>,
    /// Extra environment variables
    envs: Vec<(String, String)>,
}

impl RemotionCommand {
    /// Create a new command.
    pub fn new(launcher: impl Into<String>, subcommand: &'static str) -> Self {
        Self {
            launcher: launcher.into(),
            subcommand,
            positional: Vec::new(),
            flags: Vec::new(),
            working_dir: None,
            envs: Vec::new(),
        }
    }

    /// Add a positional argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.positional.push(arg.into());
        self
    }

    /// Add a path positional argument.
    pub fn path_arg(self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_string_lossy().to_string();
        self.arg(path)
    }

    /// Add `--name=value`.
    pub fn flag(mut self, name: &str, value: impl std::fmt::Display) -> Self {
        self.flags.push(format!("--{}={}", name, value));
        self
    }

    /// Add a bare `--name` switch.
    pub fn switch(mut self, name: &str) -> Self {
        self.flags.push(format!("--{}", name));
        self
    }

    /// Set the log level.
    pub fn log_level(self, level: &str) -> Self {
        self.flag("log", level)
    }

    /// Run from inside the given directory.
    pub fn working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set an environment variable for the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn subcommand(&self) -> &'static str {
        self.subcommand
    }

    pub fn launcher(&self) -> &str {
        &self.launcher
    }

    /// Build the command arguments (everything after the launcher).
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(2 + self.positional.len() + self.flags.len());
        args.push("remotion".to_string());
        args.push(self.subcommand.to_string());
        args.extend(self.positional.iter().cloned());
        args.extend(self.flags.iter().cloned());
        args
    }
}

/// Captured output of a finished command.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Full stdout
    pub stdout: String,
    /// Last lines of stderr
    pub stderr_tail: String,
}

/// Runner for Remotion commands with timeout and cancellation.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    /// Cancellation token
    cancel: Option<CancellationToken>,
    /// Hard limit on wall-clock time
    timeout: Option<Duration>,
}

enum WaitOutcome {
    Exited(std::io::Result<ExitStatus>),
    Cancelled,
    TimedOut,
}

impl ProcessRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort the child when `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Kill the child after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run a command, discarding line output.
    pub async fn run(&self, cmd: &RemotionCommand) -> MediaResult<ProcessOutput> {
        self.run_with_lines(cmd, |_| {}).await
    }

    /// Run a command, feeding every stdout and stderr line to `on_line`.
    pub async fn run_with_lines<F>(&self, cmd: &RemotionCommand, on_line: F) -> MediaResult<ProcessOutput>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
            return Err(MediaError::Cancelled);
        }

        let launcher = which::which(cmd.launcher())
            .map_err(|_| MediaError::EngineNotFound(cmd.launcher().to_string()))?;

        let args = cmd.build_args();
        debug!("Running: {} {}", cmd.launcher(), args.join(" "));

        let mut command = Command::new(launcher);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);
        if let Some(dir) = &cmd.working_dir {
            command.current_dir(dir);
        }
        command.envs(cmd.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let mut child = command.spawn()?;
        // The launcher leads its own group, so the renderer it starts goes down with it.
        let group = ProcessGroup::of(&child);

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::internal("stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("stderr not captured"))?;

        let on_line = Arc::new(on_line);
        let stdout_task = collect_lines(stdout, Arc::clone(&on_line), None);
        let stderr_task = collect_lines(stderr, on_line, Some(STDERR_TAIL_LINES));

        let status = match self.wait_for_completion(&mut child, &group, cmd.subcommand()).await {
            Ok(status) => status,
            Err(e) => {
                stdout_task.abort();
                stderr_task.abort();
                return Err(e);
            }
        };
        // Nothing the launcher left behind outlives it or holds the pipes open.
        drop(group);

        let output = ProcessOutput {
            stdout: stdout_task.await.unwrap_or_default(),
            stderr_tail: stderr_task.await.unwrap_or_default(),
        };

        if status.success() {
            Ok(output)
        } else {
            Err(MediaError::engine_failed(
                cmd.subcommand(),
                format!("process exited with {}", status),
                Some(output.stderr_tail),
                status.code(),
            ))
        }
    }

    /// Wait for child process with cancellation and timeout.
    async fn wait_for_completion(
        &self,
        child: &mut Child,
        group: &ProcessGroup,
        step: &str,
    ) -> MediaResult<ExitStatus> {
        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };
        let deadline = async {
            match self.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };

        let outcome = tokio::select! {
            status = child.wait() => WaitOutcome::Exited(status),
            _ = cancelled => WaitOutcome::Cancelled,
            _ = deadline => WaitOutcome::TimedOut,
        };

        match outcome {
            WaitOutcome::Exited(status) => Ok(status?),
            WaitOutcome::Cancelled => {
                info!(step, "Remotion {} cancelled, killing process group", step);
                group.kill();
                let _ = child.kill().await;
                Err(MediaError::Cancelled)
            }
            WaitOutcome::TimedOut => {
                let timeout = self.timeout.unwrap_or_default();
                warn!(step, "Remotion {} timed out after {:?}, killing process group", step, timeout);
                group.kill();
                let _ = child.kill().await;
                Err(MediaError::Timeout(timeout))
            }
        }
    }
}

/// Process group led by a spawned launcher, killed on drop.
///
/// `kill_on_drop` only reaches the launcher itself; `npx` runs the renderer
/// as a grandchild, which shares the group.
struct ProcessGroup {
    #[cfg_attr(not(unix), allow(dead_code))]
    leader: Option<u32>,
}

impl ProcessGroup {
    fn of(child: &Child) -> Self {
        Self { leader: child.id() }
    }

    /// Send SIGKILL to every process in the group.
    #[cfg(unix)]
    fn kill(&self) {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let Some(pgid) = self.leader.and_then(|id| i32::try_from(id).ok()) else {
            return;
        };
        match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => warn!(pgid, "Failed to kill process group: {}", e),
        }
    }

    #[cfg(not(unix))]
    fn kill(&self) {}
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Read `reader` line by line, forwarding each line and collecting the text.
///
/// With `tail = Some(n)` only the last `n` lines are kept.
fn collect_lines<R, F>(reader: R, on_line: Arc<F>, tail: Option<usize>) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
    F: Fn(&str) + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        let mut kept: VecDeque<String> = VecDeque::new();

        while let Ok(Some(line)) = lines.next_line().await {
            on_line(&line);
            kept.push_back(line);
            if let Some(limit) = tail {
                while kept.len() > limit {
                    kept.pop_front();
                }
            }
        }

        kept.into_iter().collect::<Vec<_>>().join("\n")
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = RemotionCommand::new("npx", "render")
            .path_arg("/tmp/bundle")
            .arg("DynamicVideo-1")
            .path_arg("/out/video.mp4")
            .flag("codec", "h264")
            .flag("frames", "0-149")
            .switch("overwrite");

        assert_eq!(
            cmd.build_args(),
            vec![
                "remotion",
                "render",
                "/tmp/bundle",
                "DynamicVideo-1",
                "/out/video.mp4",
                "--codec=h264",
                "--frames=0-149",
                "--overwrite",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_launcher() {
        let cmd = RemotionCommand::new("definitely-not-a-real-launcher-7d1f", "bundle");
        let err = tokio_test::assert_err!(ProcessRunner::new().run(&cmd).await);
        assert!(matches!(err, MediaError::EngineNotFound(_)));
    }

    #[tokio::test]
    async fn test_already_cancelled_does_not_spawn() {
        let token = CancellationToken::new();
        token.cancel();
        let cmd = RemotionCommand::new("definitely-not-a-real-launcher-7d1f", "bundle");
        let err = ProcessRunner::new().with_cancel(token).run(&cmd).await.unwrap_err();
        assert!(matches!(err, MediaError::Cancelled));
    }

    /// Write an executable `sh` script standing in for the launcher.
    #[cfg(unix)]
    pub(crate) fn write_launcher(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-launcher");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// A launcher whose background child writes `marker` two seconds in.
    #[cfg(unix)]
    fn slow_launcher(dir: &Path, marker: &Path) -> RemotionCommand {
        let launcher = write_launcher(dir, r#"( sleep 2; echo late > "$MARKER" ) & wait"#);
        RemotionCommand::new(launcher.to_string_lossy(), "render")
            .env("MARKER", marker.to_string_lossy())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_launcher_descendants() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("late");
        let cmd = slow_launcher(dir.path(), &marker);

        let err = tokio_test::assert_err!(
            ProcessRunner::new()
                .with_timeout(Duration::from_millis(300))
                .run(&cmd)
                .await
        );
        assert!(matches!(err, MediaError::Timeout(t) if t == Duration::from_millis(300)));
        assert_eq!(err.to_string(), "Operation timed out after 300ms");

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancel_kills_launcher_descendants() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("late");
        let cmd = slow_launcher(dir.path(), &marker);

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.cancel();
        });

        let err = tokio_test::assert_err!(ProcessRunner::new().with_cancel(token).run(&cmd).await);
        assert!(matches!(err, MediaError::Cancelled));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dropped_run_kills_launcher_descendants() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("late");
        let cmd = slow_launcher(dir.path(), &marker);

        let runner = ProcessRunner::new();
        let run = runner.run(&cmd);
        let _ = tokio::time::timeout(Duration::from_millis(300), run).await;

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!marker.exists());
    }
}
