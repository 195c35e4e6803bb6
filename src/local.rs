//! Compile-then-run pipeline for languages that need archives on the
//! classpath. Each request gets its own workspace, gone when this returns.

use crate::error::ExecError;
use crate::language::LanguageDescriptor;
use crate::result::ExecutionResult;
use crate::submission::Submission;
use crate::workspace::{check_name, Workspace};
use serde_json::json;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// A program plus the arguments always passed before ours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub program: String,
    pub args: Vec<String>,
}

impl Program {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Split a command line on whitespace, e.g. `"java -Xmx256m"`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

#[derive(Debug, Clone)]
pub struct LocalConfig {
    /// Parent directory for per-request workspaces
    pub sandbox_root: PathBuf,
    pub compiler: Program,
    pub runtime: Program,
    /// RLIMIT_FSIZE for child processes, 0 disables it
    pub fsize_kb: u64,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            sandbox_root: std::env::temp_dir().join("coderun"),
            compiler: Program::new("javac"),
            runtime: Program::new("java"),
            fsize_kb: 10240,
        }
    }
}

/// How long output readers may lag behind the exit of the process group.
const PIPE_GRACE: Duration = Duration::from_secs(1);

enum ProcessOutcome {
    Exited(Output),
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct LocalExecutor {
    config: LocalConfig,
}

impl LocalExecutor {
    pub fn new(config: LocalConfig) -> Self {
        Self { config }
    }

    /// Errors are rejections or workspace setup failures. Compile errors,
    /// runtime errors and timeouts come back as results.
    pub async fn execute(
        &self,
        submission: &Submission,
        language: &LanguageDescriptor,
    ) -> Result<ExecutionResult, ExecError> {
        for file in &submission.files {
            check_name("file", &file.name)?;
        }
        for jar in &submission.jars {
            check_name("jar", &jar.name)?;
            if submission.files.iter().any(|f| f.name == jar.name) {
                return Err(ExecError::invalid(format!(
                    "`{}` is used both as a file and a jar",
                    jar.name
                )));
            }
        }
        if !submission.files.iter().any(|f| f.name == submission.entrypoint) {
            return Err(ExecError::invalid(format!(
                "entrypoint `{}` is not one of the submitted files",
                submission.entrypoint
            )));
        }

        info!(
            language = language.id,
            files = submission.files.len(),
            jars = submission.jars.len(),
            "Running locally"
        );

        let workspace = Workspace::create(&self.config.sandbox_root).await?;
        let result = self.compile_and_run(&workspace, submission, language).await;
        workspace.remove().await;
        result
    }

    async fn compile_and_run(
        &self,
        workspace: &Workspace,
        submission: &Submission,
        language: &LanguageDescriptor,
    ) -> Result<ExecutionResult, ExecError> {
        for file in &submission.files {
            workspace.write(&file.name, file.content.as_bytes()).await?;
        }
        let mut deps = Vec::with_capacity(submission.jars.len());
        for jar in &submission.jars {
            deps.push(workspace.write(&jar.name, &jar.bytes).await?);
        }

        let sources: Vec<&str> = submission
            .files
            .iter()
            .map(|f| f.name.as_str())
            .filter(|name| name.ends_with(language.source_extension))
            .collect();

        let mut compile = self.config.compiler.command();
        compile.current_dir(workspace.path()).arg("-d").arg(workspace.path());
        if !deps.is_empty() {
            compile.arg("-cp").arg(class_path(&deps)?);
        }
        compile.args(&sources);

        let output = match self.spawn(compile, None, submission.timeout).await {
            Ok(ProcessOutcome::Exited(output)) => output,
            Ok(ProcessOutcome::TimedOut) => {
                info!("Compilation timed out");
                return Ok(ExecutionResult::timed_out()
                    .with_raw(json!({ "phase": "compile", "timed_out": true })));
            }
            Err(e) => return Ok(spawn_failure("compiler", e)),
        };
        if !output.status.success() {
            let raw = raw_output("compile", &output);
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            let error = if !stderr.trim().is_empty() {
                stderr
            } else if !stdout.trim().is_empty() {
                stdout
            } else {
                format!("Compilation failed with status {}", output.status)
            };
            info!(status = %output.status, "Compilation failed");
            return Ok(ExecutionResult::failure(String::new(), error).with_raw(raw));
        }

        let unit = runnable_unit(&submission.entrypoint, language.source_extension);
        let mut search_path = deps;
        search_path.push(workspace.path().to_path_buf());

        let mut run = self.config.runtime.command();
        run.current_dir(workspace.path())
            .arg("-cp")
            .arg(class_path(&search_path)?)
            .arg(unit);

        let output = match self
            .spawn(run, Some(&submission.stdin), submission.timeout)
            .await
        {
            Ok(ProcessOutcome::Exited(output)) => output,
            Ok(ProcessOutcome::TimedOut) => {
                info!("Run timed out");
                return Ok(ExecutionResult::timed_out()
                    .with_raw(json!({ "phase": "run", "timed_out": true })));
            }
            Err(e) => return Ok(spawn_failure("runtime", e)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        info!(status = %output.status, stdout_len = stdout.len(), stderr_len = stderr.len(), "Run finished");

        Ok(ExecutionResult {
            output: stdout,
            error: if stderr.is_empty() { None } else { Some(stderr) },
            success: output.status.success(),
            raw: Some(raw_output("run", &output)),
        })
    }

    /// Run `cmd` to completion or until `timeout`. Either way the whole
    /// process group is killed and the leader reaped before returning, so
    /// nothing it started outlives the request.
    async fn spawn(
        &self,
        mut cmd: Command,
        stdin: Option<&str>,
        timeout: Duration,
    ) -> io::Result<ProcessOutcome> {
        cmd.stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        limit_child(&mut cmd, self.config.fsize_kb);
        debug!(command = ?cmd, "Spawning");

        let mut child = cmd.spawn()?;
        let pid = child.id();

        let stdout = tokio::spawn(drain(child.stdout.take()));
        let stderr = tokio::spawn(drain(child.stderr.take()));
        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            let input = input.as_bytes().to_vec();
            tokio::spawn(async move {
                // The program may exit without reading; a broken pipe is fine
                let _ = pipe.write_all(&input).await;
            });
        }

        let waited = tokio::time::timeout(timeout, child.wait()).await;

        // A group id is not reused while any member is alive, so this is
        // safe even after the leader has been reaped
        if let Some(pid) = pid {
            kill_group(pid);
        }

        let status = match waited {
            Ok(status) => status?,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    debug!(error = %e, "Reaping timed out child failed");
                }
                stdout.abort();
                stderr.abort();
                return Ok(ProcessOutcome::TimedOut);
            }
        };

        // Pipes close once every group member is gone
        let pipes = async { (stdout.await, stderr.await) };
        match tokio::time::timeout(PIPE_GRACE, pipes).await {
            Ok((stdout, stderr)) => Ok(ProcessOutcome::Exited(Output {
                status,
                stdout: stdout.unwrap_or_default(),
                stderr: stderr.unwrap_or_default(),
            })),
            Err(_) => {
                warn!("Output pipes still open after the process group was killed");
                Ok(ProcessOutcome::TimedOut)
            }
        }
    }
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    buf
}

/// `Main.java` -> `Main`
pub fn runnable_unit<'a>(entrypoint: &'a str, extension: &str) -> &'a str {
    entrypoint.strip_suffix(extension).unwrap_or(entrypoint)
}

/// Join with the platform path separator (`:` on Unix, `;` on Windows).
pub fn class_path(paths: &[PathBuf]) -> Result<OsString, ExecError> {
    std::env::join_paths(paths)
        .map_err(|e| ExecError::invalid(format!("cannot build class path: {}", e)))
}

fn raw_output(phase: &str, output: &Output) -> serde_json::Value {
    json!({
        "phase": phase,
        "exit_code": output.status.code(),
        "stdout": String::from_utf8_lossy(&output.stdout),
        "stderr": String::from_utf8_lossy(&output.stderr),
    })
}

fn spawn_failure(what: &str, e: io::Error) -> ExecutionResult {
    warn!(error = %e, "Failed to start {}", what);
    ExecutionResult::execution_failed(format!("could not start {}: {}", what, e))
}

#[cfg(target_os = "linux")]
fn limit_child(cmd: &mut Command, fsize_kb: u64) {
    use nix::sys::resource::{setrlimit, Resource};

    let fsize = fsize_kb.saturating_mul(1024);
    // SAFETY: only async-signal-safe syscalls run between fork and exec
    unsafe {
        cmd.pre_exec(move || {
            // Own process group so a timeout can take down grandchildren too
            nix::unistd::setsid()?;
            setrlimit(Resource::RLIMIT_CORE, 0, 0)?;
            if fsize > 0 {
                setrlimit(Resource::RLIMIT_FSIZE, fsize, fsize)?;
            }
            Ok(())
        });
    }
}

#[cfg(not(target_os = "linux"))]
fn limit_child(_cmd: &mut Command, _fsize_kb: u64) {}

#[cfg(target_os = "linux")]
fn kill_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        debug!(pid, error = %e, "killpg failed");
    }
}

#[cfg(not(target_os = "linux"))]
fn kill_group(_pid: u32) {}
