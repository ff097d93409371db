//! Process transport for stdio tool providers
//!
//! Spawns one child process per provider and hands its stdout/stdin pair to
//! the protocol client. Package runners (`npx`) get a private npm cache so
//! concurrent providers never share one, and so teardown is a single
//! directory removal.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

use crate::logging::Logger;

use super::config::McpServerConfig;
use super::error::{McpError, McpResult};

/// Prefix of the per-process npm cache directory
pub const NPX_CACHE_PREFIX: &str = "mcp_npx_cache_";

/// Cache variables redirected into the scratch directory
const CACHE_ENV_VARS: [&str; 2] = ["npm_config_cache", "XDG_CACHE_HOME"];

/// Bytes of provider stderr kept for diagnostics
const STDERR_TAIL_LIMIT: usize = 2000;

/// Resolve a command against `PATH`
///
/// Falls back to the literal command when nothing matches, leaving the final
/// decision to the OS at spawn time.
pub fn resolve_command(command: &str) -> PathBuf {
    find_executable(command).unwrap_or_else(|| PathBuf::from(command))
}

fn find_executable(command: &str) -> Option<PathBuf> {
    let candidate = Path::new(command);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .flat_map(|dir| executable_names(command).into_iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

#[cfg(windows)]
fn executable_names(command: &str) -> Vec<String> {
    vec![
        command.to_string(),
        format!("{command}.exe"),
        format!("{command}.cmd"),
    ]
}

#[cfg(not(windows))]
fn executable_names(command: &str) -> Vec<String> {
    vec![command.to_string()]
}

/// Whether the resolved program is an ephemeral package runner
pub fn is_package_runner(program: &Path) -> bool {
    program.file_stem().map_or(false, |stem| stem == "npx")
}

/// Everything needed to spawn a provider, prepared before any process exists
#[derive(Debug)]
pub struct LaunchPlan {
    /// Resolved executable
    pub program: PathBuf,
    /// Arguments, passed through unchanged
    pub args: Vec<String>,
    /// Overrides applied on top of the inherited environment
    pub env: BTreeMap<String, String>,
    /// Private cache directory for package runners
    pub scratch_dir: Option<TempDir>,
}

impl LaunchPlan {
    /// Resolve the command and compute the child's environment
    pub fn prepare(config: &McpServerConfig) -> McpResult<Self> {
        let program = resolve_command(&config.command);
        let mut env = config.env.clone();

        let scratch_dir = if is_package_runner(&program) {
            let dir = tempfile::Builder::new()
                .prefix(NPX_CACHE_PREFIX)
                .tempdir()
                .map_err(|e| McpError::SpawnFailed {
                    name: config.name.clone(),
                    reason: format!("failed to create npx cache directory: {e}"),
                })?;
            let cache = dir.path().to_string_lossy().into_owned();
            for var in CACHE_ENV_VARS {
                env.insert(var.to_string(), cache.clone());
            }
            Some(dir)
        } else {
            None
        };

        Ok(Self {
            program,
            args: config.args.clone(),
            env,
            scratch_dir,
        })
    }
}

/// A running provider process and the resources tied to it
pub struct ProcessTransport {
    name: String,
    program: PathBuf,
    child: Child,
    stdio: Option<(ChildStdout, ChildStdin)>,
    stderr_tail: Arc<Mutex<String>>,
    scratch_dir: Option<TempDir>,
    shutdown_timeout: Duration,
    logger: Arc<dyn Logger>,
}

impl ProcessTransport {
    /// Spawn the provider process
    ///
    /// Must be called inside a tokio runtime. If spawning fails, the scratch
    /// directory (if any) is removed before the error is returned.
    pub fn start(
        config: &McpServerConfig,
        shutdown_timeout: Duration,
        logger: Arc<dyn Logger>,
    ) -> McpResult<Self> {
        let plan = LaunchPlan::prepare(config)?;

        logger.info(&format!(
            "[ProcessTransport] Starting '{}': {} {:?}",
            config.name,
            plan.program.display(),
            plan.args
        ));
        if let Some(dir) = &plan.scratch_dir {
            logger.debug(&format!(
                "[ProcessTransport] Isolated npx cache for '{}' at {}",
                config.name,
                dir.path().display()
            ));
        }

        let mut cmd = Command::new(&plan.program);
        cmd.args(&plan.args)
            .envs(&plan.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| McpError::SpawnFailed {
            name: config.name.clone(),
            reason: format!("{}: {e}", plan.program.display()),
        })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stdio = match (stdout, stdin) {
            (Some(stdout), Some(stdin)) => Some((stdout, stdin)),
            _ => None,
        };

        let stderr_tail = Arc::new(Mutex::new(String::new()));
        if let Some(stderr) = child.stderr.take() {
            spawn_stderr_collector(
                config.name.clone(),
                stderr,
                Arc::clone(&stderr_tail),
                Arc::clone(&logger),
            );
        }

        Ok(Self {
            name: config.name.clone(),
            program: plan.program,
            child,
            stdio,
            stderr_tail,
            scratch_dir: plan.scratch_dir,
            shutdown_timeout,
            logger,
        })
    }

    /// Provider name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved executable path
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// OS process id, `None` once the child has been reaped
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Bounded wait granted to the process on stop
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Private cache directory, if the launcher needed one
    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch_dir.as_ref().map(TempDir::path)
    }

    /// Take the (read, write) pipe pair; `None` after the first call
    pub fn take_stdio(&mut self) -> Option<(ChildStdout, ChildStdin)> {
        self.stdio.take()
    }

    /// Most recent stderr output, truncated
    pub fn stderr_tail(&self) -> String {
        self.stderr_tail.lock().trim().to_string()
    }

    /// Stop the process and release everything it owns
    ///
    /// Closes any pipes still held, waits up to the shutdown timeout for the
    /// child to exit, kills it otherwise, then removes the scratch directory.
    /// Never fails: teardown problems are logged and swallowed.
    pub async fn stop(mut self) {
        drop(self.stdio.take());

        match tokio::time::timeout(self.shutdown_timeout, self.child.wait()).await {
            Ok(Ok(status)) => {
                self.logger.debug(&format!(
                    "[ProcessTransport] '{}' exited with {}",
                    self.name, status
                ));
            }
            Ok(Err(e)) => {
                self.logger.warn(&format!(
                    "[ProcessTransport] Failed waiting for '{}': {}, killing",
                    self.name, e
                ));
                let _ = self.child.kill().await;
            }
            Err(_) => {
                self.logger.warn(&format!(
                    "[ProcessTransport] '{}' did not exit within {:?}, killing",
                    self.name, self.shutdown_timeout
                ));
                let _ = self.child.kill().await;
            }
        }

        if let Some(dir) = self.scratch_dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                self.logger.debug(&format!(
                    "[ProcessTransport] Could not remove {}: {}",
                    path.display(),
                    e
                ));
            }
        }
    }
}

impl std::fmt::Debug for ProcessTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessTransport")
            .field("name", &self.name)
            .field("program", &self.program)
            .field("pid", &self.child.id())
            .field("scratch_dir", &self.scratch_dir())
            .finish()
    }
}

/// Drain stderr so a chatty provider never blocks on a full pipe
fn spawn_stderr_collector(
    name: String,
    stderr: ChildStderr,
    tail: Arc<Mutex<String>>,
    logger: Arc<dyn Logger>,
) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            logger.debug(&format!("[{} stderr] {}", name, line));
            let mut tail = tail.lock();
            tail.push_str(&line);
            tail.push('\n');
            if tail.len() > STDERR_TAIL_LIMIT {
                let mut cut = tail.len() - STDERR_TAIL_LIMIT;
                while !tail.is_char_boundary(cut) {
                    cut += 1;
                }
                tail.drain(..cut);
            }
        }
    });
}
