//! Supervised command execution.
//!
//! One invocation walks `Starting -> Running -> {Completed | TimedOut |
//! Cancelled}`:
//!
//! ```text
//! spawn ──▶ two drain tasks (stdout / stderr, bounded, binary-aware)
//!   │
//!   └──▶ select! ── child exit ──────────▶ Completed (child's real code)
//!              ├── cancellation token ──▶ terminate ▶ Cancelled
//!              └── wall-clock timeout ──▶ terminate ▶ TimedOut (code -1)
//!                                          │
//!                          SIGTERM, grace period, SIGKILL
//! ```
//!
//! Both drain tasks are joined *after* the race resolves, whatever won — a
//! killed child's trailing buffered output is collected, never read
//! concurrently with finalization. A non-zero exit from the child is a
//! successful invocation carrying that code; the engine only errors on
//! spawn failure, cancellation, and runtime-setup failure.

use std::collections::HashMap;
use std::fs;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use workbench_application::config::WorkspaceParams;
use workbench_application::ports::command_runner::CommandRunnerPort;
use workbench_domain::tool::{
    entities::RunCommandRequest,
    error::{ToolError, ToolResult},
    value_objects::{CommandDisposition, RunCommandResponse},
};

use crate::workspace::PathResolver;

/// Command families that get a readiness pre-flight before the real run.
const CONTAINER_RUNTIMES: &[&str] = &["docker", "podman"];

/// Stand-in reported instead of content for a binary stream.
const BINARY_PLACEHOLDER: &str = "[binary output suppressed]";

/// Adapter implementing [`CommandRunnerPort`] with real child processes.
pub struct CommandRunner {
    resolver: PathResolver,
    params: WorkspaceParams,
}

/// What one drain task collected from one stream.
#[derive(Debug, Default)]
struct StreamOutput {
    collected: Vec<u8>,
    binary: bool,
    truncated: bool,
}

impl StreamOutput {
    fn render(&self) -> String {
        if self.binary {
            BINARY_PLACEHOLDER.to_string()
        } else {
            String::from_utf8_lossy(&self.collected).into_owned()
        }
    }
}

impl CommandRunner {
    pub fn new(resolver: PathResolver, params: &WorkspaceParams) -> Self {
        Self {
            resolver,
            params: params.clone(),
        }
    }

    async fn run_impl(
        &self,
        request: &RunCommandRequest,
        cancel: &CancellationToken,
    ) -> ToolResult<RunCommandResponse> {
        let Some(program) = request.program() else {
            return Err(ToolError::InvalidArgument("argv must not be empty".into()));
        };
        let timeout = match request.timeout_secs {
            Some(0) => {
                return Err(ToolError::InvalidArgument(
                    "timeout_secs must be positive".into(),
                ));
            }
            Some(secs) => Duration::from_secs(secs),
            None => self.params.command.default_timeout,
        };

        let working_dir = self
            .resolver
            .resolve(request.working_dir.as_deref().unwrap_or(""))?;
        match fs::metadata(working_dir.as_path()) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(ToolError::NotADirectory {
                    path: working_dir.display_relative().to_string(),
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::FileMissing {
                    path: working_dir.display_relative().to_string(),
                });
            }
            Err(e) => {
                return Err(ToolError::io(
                    "stat",
                    working_dir.display_relative().to_string(),
                    e,
                ));
            }
        }

        let env = self.layered_env(request)?;

        if CONTAINER_RUNTIMES.contains(&program) {
            self.ensure_runtime_ready(program, cancel).await?;
        }

        // Starting
        let mut cmd = Command::new(program);
        cmd.args(&request.argv[1..])
            .current_dir(working_dir.as_path())
            .envs(&env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Linux: request kernel to send SIGTERM to the child when this
        // process dies. Catches cases where Drop doesn't run (SIGKILL, OOM
        // kill).
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        debug!(program, argv = ?request.argv, "spawning command");
        let mut child = cmd.spawn().map_err(|e| ToolError::Spawn {
            program: program.to_string(),
            source: e,
        })?;

        // Running: the pipes are drained concurrently so a chatty child
        // never blocks on a full pipe buffer.
        let cap = self.params.command.max_output_bytes;
        let sample = self.params.binary_sample_size;
        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");
        let stdout_task = tokio::spawn(drain_stream(stdout, cap, sample));
        let stderr_task = tokio::spawn(drain_stream(stderr, cap, sample));

        // Completion race; the child is only touched again once the race
        // has resolved and the wait future is dropped.
        enum RaceWinner {
            Exited(std::io::Result<std::process::ExitStatus>),
            Cancelled,
            DeadlinePassed,
        }
        let winner = tokio::select! {
            status = child.wait() => RaceWinner::Exited(status),
            _ = cancel.cancelled() => RaceWinner::Cancelled,
            _ = tokio::time::sleep(timeout) => RaceWinner::DeadlinePassed,
        };

        let grace = self.params.command.graceful_shutdown;
        let (disposition, exit_code) = match winner {
            RaceWinner::Exited(status) => {
                let status =
                    status.map_err(|e| ToolError::io("wait", program.to_string(), e))?;
                (CommandDisposition::Completed, status.code().unwrap_or(-1))
            }
            RaceWinner::Cancelled => {
                debug!(program, "command cancelled, terminating child");
                terminate(&mut child, grace).await;
                (CommandDisposition::Cancelled, -1)
            }
            RaceWinner::DeadlinePassed => {
                warn!(program, timeout_secs = timeout.as_secs(), "command timed out");
                terminate(&mut child, grace).await;
                (CommandDisposition::TimedOut, -1)
            }
        };

        // Both drains finish before the output is finalized, even after a
        // kill — the closed pipes end them promptly.
        let (stdout, stderr) = futures::future::join(stdout_task, stderr_task).await;
        let stdout = stdout.unwrap_or_default();
        let stderr = stderr.unwrap_or_default();

        if disposition == CommandDisposition::Cancelled {
            return Err(ToolError::Cancelled);
        }

        Ok(RunCommandResponse {
            stdout: stdout.render(),
            stderr: stderr.render(),
            exit_code,
            truncated: stdout.truncated || stderr.truncated,
            disposition,
        })
    }

    /// Process env (inherited) → `.env` files in order → explicit overrides.
    fn layered_env(&self, request: &RunCommandRequest) -> ToolResult<HashMap<String, String>> {
        let mut env = HashMap::new();
        for raw in &request.env_files {
            let resolved = self.resolver.resolve(raw)?;
            let content = fs::read_to_string(resolved.as_path()).map_err(|e| {
                ToolError::io("read env file", resolved.display_relative().to_string(), e)
            })?;
            for (key, value) in parse_env_file(&content) {
                env.insert(key, value);
            }
        }
        for (key, value) in &request.env {
            env.insert(key.clone(), value.clone());
        }
        Ok(env)
    }

    /// Pre-flight for container runtimes: probe `<runtime> info` a bounded
    /// number of times, firing the configured one-shot start command after
    /// the first failed probe. Exhausting the attempts fails this invocation
    /// only.
    async fn ensure_runtime_ready(
        &self,
        runtime: &str,
        cancel: &CancellationToken,
    ) -> ToolResult<()> {
        let attempts = self.params.runtime.readiness_attempts;
        let interval = self.params.runtime.readiness_interval;

        for attempt in 1..=attempts {
            if runtime_probe(runtime).await {
                debug!(runtime, attempt, "container runtime ready");
                return Ok(());
            }

            if attempt == 1 && !self.params.runtime.start_argv.is_empty() {
                let argv = &self.params.runtime.start_argv;
                info!(runtime, start = ?argv, "container runtime not ready, starting it");
                let mut start = Command::new(&argv[0]);
                start
                    .args(&argv[1..])
                    .current_dir(self.resolver.root())
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null());
                // One shot; a failed start just leaves the next probe to fail
                let _ = start.status().await;
            }

            if attempt < attempts {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = cancel.cancelled() => return Err(ToolError::Cancelled),
                }
            }
        }

        Err(ToolError::RuntimeNotReady {
            runtime: runtime.to_string(),
            attempts,
        })
    }
}

/// One `<runtime> info` probe; any failure to spawn or non-zero exit means
/// "not ready".
async fn runtime_probe(runtime: &str) -> bool {
    Command::new(runtime)
        .arg("info")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Drain one stream into a bounded collector.
///
/// Only the first `sample` bytes are inspected for a NUL; once flagged
/// binary the collector discards everything and reports a placeholder.
/// Otherwise it accumulates up to `cap` bytes and silently drops overflow,
/// setting the truncated flag.
async fn drain_stream<R>(mut reader: R, cap: usize, sample: usize) -> StreamOutput
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = [0u8; 8192];
    let mut out = StreamOutput::default();
    let mut inspected = 0usize;

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        let chunk = &buf[..n];

        if !out.binary && inspected < sample {
            let take = (sample - inspected).min(n);
            if chunk[..take].contains(&0) {
                out.binary = true;
                out.collected.clear();
            }
            inspected += take;
        }
        if out.binary {
            // Keep reading so the child never blocks, but drop the bytes
            continue;
        }

        if out.collected.len() < cap {
            let take = (cap - out.collected.len()).min(n);
            out.collected.extend_from_slice(&chunk[..take]);
            if take < n {
                out.truncated = true;
            }
        } else {
            out.truncated = true;
        }
    }

    out
}

/// Terminate a child: interrupt signal, bounded grace period, force-kill.
async fn terminate(child: &mut Child, grace: Duration) {
    send_term_signal(child);
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(_) => {}
        Err(_) => {
            warn!("child ignored termination signal, force-killing");
            let _ = child.kill().await;
        }
    }
}

#[cfg(unix)]
fn send_term_signal(child: &Child) {
    if let Some(pid) = child.id() {
        unsafe {
            libc::kill(pid as i32, libc::SIGTERM);
        }
    }
}

#[cfg(not(unix))]
fn send_term_signal(child: &Child) {
    // No graceful signal on this platform; the grace wait still applies
    // before the force-kill.
    let _ = child;
}

/// Minimal `.env` parser: `KEY=VALUE` lines, `#` comments, blank lines, an
/// optional `export ` prefix, and single/double quotes around the value.
fn parse_env_file(content: &str) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
            .unwrap_or(value);
        entries.push((key.to_string(), value.to_string()));
    }
    entries
}

#[async_trait]
impl CommandRunnerPort for CommandRunner {
    async fn run_command(
        &self,
        request: &RunCommandRequest,
        cancel: &CancellationToken,
    ) -> ToolResult<RunCommandResponse> {
        self.run_impl(request, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tempfile::{TempDir, tempdir};
    use workbench_application::config::{CommandParams, RuntimeParams};

    fn runner(dir: &TempDir, params: WorkspaceParams) -> CommandRunner {
        let resolver = PathResolver::new(dir.path(), params.max_symlink_hops).unwrap();
        CommandRunner::new(resolver, &params)
    }

    fn quick_params() -> WorkspaceParams {
        WorkspaceParams::default().with_command(CommandParams {
            max_output_bytes: 1024,
            default_timeout: Duration::from_secs(10),
            graceful_shutdown: Duration::from_millis(200),
        })
    }

    #[tokio::test]
    async fn test_simple_command_completes() {
        let dir = tempdir().unwrap();
        let runner = runner(&dir, quick_params());

        let resp = runner
            .run_impl(
                &RunCommandRequest::new(["echo", "hello"]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(resp.is_success());
        assert!(resp.stdout.contains("hello"));
        assert_eq!(resp.disposition, CommandDisposition::Completed);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_a_successful_invocation() {
        let dir = tempdir().unwrap();
        let runner = runner(&dir, quick_params());

        let resp = runner
            .run_impl(
                &RunCommandRequest::new(["sh", "-c", "echo oops >&2; exit 3"]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(resp.exit_code, 3);
        assert_eq!(resp.disposition, CommandDisposition::Completed);
        assert!(resp.stderr.contains("oops"));
        assert!(!resp.is_success());
    }

    #[tokio::test]
    async fn test_timeout_kills_within_grace() {
        let dir = tempdir().unwrap();
        let runner = runner(&dir, quick_params());

        let start = Instant::now();
        let resp = runner
            .run_impl(
                &RunCommandRequest::new(["sleep", "5"]).with_timeout_secs(1),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        let elapsed = start.elapsed();

        assert!(resp.timed_out());
        assert_eq!(resp.exit_code, -1);
        // Near timeout + grace, nowhere near the sleep's five seconds
        assert!(elapsed >= Duration::from_secs(1));
        assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn test_cancellation_surfaces_as_cancelled() {
        let dir = tempdir().unwrap();
        let runner = runner(&dir, quick_params());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let err = runner
            .run_impl(&RunCommandRequest::new(["sleep", "5"]), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancellation());
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_output_cap_truncates_silently() {
        let dir = tempdir().unwrap();
        let runner = runner(&dir, quick_params());

        let resp = runner
            .run_impl(
                &RunCommandRequest::new(["sh", "-c", "yes | head -n 2000"]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(resp.truncated);
        assert!(resp.stdout.len() <= 1024);
        assert_eq!(resp.exit_code, 0);
    }

    #[tokio::test]
    async fn test_binary_stdout_becomes_placeholder() {
        let dir = tempdir().unwrap();
        let runner = runner(&dir, quick_params());

        let resp = runner
            .run_impl(
                &RunCommandRequest::new(["sh", "-c", "head -c 16 /dev/zero; echo done >&2"]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(resp.stdout, BINARY_PLACEHOLDER);
        // The clean stream is unaffected
        assert!(resp.stderr.contains("done"));
    }

    #[tokio::test]
    async fn test_working_dir_is_boundary_checked() {
        let dir = tempdir().unwrap();
        let runner = runner(&dir, quick_params());
        fs::create_dir(dir.path().join("sub")).unwrap();
        let cancel = CancellationToken::new();

        let resp = runner
            .run_impl(
                &RunCommandRequest::new(["pwd"]).with_working_dir("sub"),
                &cancel,
            )
            .await
            .unwrap();
        assert!(resp.stdout.trim_end().ends_with("sub"));

        let err = runner
            .run_impl(
                &RunCommandRequest::new(["pwd"]).with_working_dir("../elsewhere"),
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::OutsideWorkspace { .. }));

        let err = runner
            .run_impl(
                &RunCommandRequest::new(["pwd"]).with_working_dir("missing"),
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::FileMissing { .. }));
    }

    #[tokio::test]
    async fn test_env_layering_later_layers_win() {
        let dir = tempdir().unwrap();
        let runner = runner(&dir, quick_params());
        fs::write(
            dir.path().join(".env"),
            "# comment\nexport FROM_FILE=file\nSHADOWED=\"file value\"\n",
        )
        .unwrap();

        let resp = runner
            .run_impl(
                &RunCommandRequest::new(["sh", "-c", "echo $FROM_FILE/$SHADOWED"])
                    .with_env_file(".env")
                    .with_env("SHADOWED", "override"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(resp.stdout.trim_end(), "file/override");
    }

    #[tokio::test]
    async fn test_invalid_requests_rejected_before_spawn() {
        let dir = tempdir().unwrap();
        let runner = runner(&dir, quick_params());
        let cancel = CancellationToken::new();

        let err = runner
            .run_impl(&RunCommandRequest::new(Vec::<String>::new()), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));

        let err = runner
            .run_impl(&RunCommandRequest::new(["echo"]).with_timeout_secs(0), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_unknown_program_is_spawn_error() {
        let dir = tempdir().unwrap();
        let runner = runner(&dir, quick_params());

        let err = runner
            .run_impl(
                &RunCommandRequest::new(["definitely-not-a-real-program-xyz"]),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_runtime_poll_exhaustion_and_start_command() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("start-fired");
        let params = quick_params().with_runtime(RuntimeParams {
            readiness_attempts: 3,
            readiness_interval: Duration::from_millis(10),
            start_argv: vec!["touch".into(), marker.to_string_lossy().into_owned()],
        });
        let runner = runner(&dir, params);

        // "false" always probes not-ready
        let err = runner
            .ensure_runtime_ready("false", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::RuntimeNotReady { attempts: 3, .. }
        ));
        // The one-shot start command fired exactly once
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn test_runtime_poll_ready_runtime_passes() {
        let dir = tempdir().unwrap();
        let runner = runner(&dir, quick_params());

        // "true" probes ready on the first attempt
        runner
            .ensure_runtime_ready("true", &CancellationToken::new())
            .await
            .unwrap();
    }

    #[test]
    fn test_parse_env_file() {
        let parsed = parse_env_file(
            "# header\n\nKEY=plain\nexport EXPORTED=yes\nQUOTED=\"with spaces\"\nSINGLE='x'\nbroken-line\n=nokey\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("KEY".to_string(), "plain".to_string()),
                ("EXPORTED".to_string(), "yes".to_string()),
                ("QUOTED".to_string(), "with spaces".to_string()),
                ("SINGLE".to_string(), "x".to_string()),
            ]
        );
    }
}
