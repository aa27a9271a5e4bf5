// ocular-core/src/executor.rs

//! Runs one external command to completion (or timeout) while streaming its
//! output, and records everything in a [`ServiceResponse`].
//!
//! [`execute_command`] never returns an error. Every failure mode (missing
//! binary, spawn failure, read failure, timeout) ends up inside the returned
//! response via [`ServiceResponse::add_error`].

use crate::progress::{ProgressSink, ProgressUpdate};
use crate::response::ServiceResponse;
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

/// Return code recorded when the command exceeded its timeout.
pub const TIMEOUT_RETURN_CODE: i32 = 124;
/// Return code recorded when the command never ran or failed inside the executor.
pub const NOT_RUN_RETURN_CODE: i32 = -1;
/// Progress total used by callers that have no better estimate.
pub const DEFAULT_EXPECTED_LINES: u32 = 100;

const PROGRESS_REPORT_TIMEOUT: Duration = Duration::from_secs(2);
/// How long queued progress may keep a finished command from returning.
const PROGRESS_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);
/// Updates buffered ahead of the sink before new ones are dropped.
const PROGRESS_QUEUE_CAPACITY: usize = 1024;
const REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// Executes `cmd` through the platform shell and populates `response`.
///
/// * `progress`: optional sink receiving one update per stdout line. Updates
///   are queued and delivered off the read path; a sink that falls behind
///   loses updates, never output.
/// * `timeout`: wall-clock bound on streaming plus waiting for exit.
/// * `expected_lines`: notional progress total, never a hard limit.
///
/// The returned response is always terminal (`process_end_time` set).
pub async fn execute_command(
    cmd: &str,
    response: ServiceResponse,
    progress: Option<&dyn ProgressSink>,
    timeout: Duration,
    expected_lines: Option<u32>,
) -> ServiceResponse {
    execute_command_with_env(cmd, &[], response, progress, timeout, expected_lines).await
}

/// Like [`execute_command`], with extra variables set in the child's
/// environment. Values passed this way never appear in `raw_command`.
pub(crate) async fn execute_command_with_env(
    cmd: &str,
    env: &[(&str, String)],
    mut response: ServiceResponse,
    progress: Option<&dyn ProgressSink>,
    timeout: Duration,
    expected_lines: Option<u32>,
) -> ServiceResponse {
    response.raw_command = cmd.to_string();
    info!(service = %response.service, "running: {}", cmd);

    let Some(program) = program_name(cmd) else {
        response.add_error("Cannot execute an empty command", Some(NOT_RUN_RETURN_CODE));
        return response;
    };

    if find_executable(&program).is_none() {
        warn!(service = %response.service, program = %program, "Executable not found on PATH");
        response.add_error(
            format!("{} is not installed on the server", program),
            Some(NOT_RUN_RETURN_CODE),
        );
        return response;
    }

    let mut child = match spawn_shell(cmd, env) {
        Ok(child) => child,
        Err(e) => {
            warn!(service = %response.service, error = %e, "Failed to spawn command process");
            response.add_error(e.to_string(), Some(NOT_RUN_RETURN_CODE));
            return response;
        }
    };
    let pid = child.id();
    debug!(service = %response.service, ?pid, "Spawned command process");

    let service = response.service.clone();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let mut collected = String::new();
    let mut stderr_bytes = Vec::new();

    // The reader only ever queues updates; a separate future hands them to the
    // sink so a slow sink cannot stall the child's stdout.
    let (queue, updates) = mpsc::channel(PROGRESS_QUEUE_CAPACITY);
    let queue = progress.is_some().then_some(queue);
    let delivery = deliver_progress(updates, progress, &service);
    tokio::pin!(delivery);
    let mut delivered = false;

    let outcome = {
        let run = tokio::time::timeout(timeout, async {
            let (stdout_result, stderr_result) = tokio::join!(
                stream_stdout(stdout, &mut collected, queue, expected_lines, &service),
                drain(stderr, &mut stderr_bytes),
            );
            stdout_result?;
            stderr_result?;
            child.wait().await
        });
        tokio::pin!(run);
        loop {
            tokio::select! {
                outcome = &mut run => break outcome,
                _ = &mut delivery, if !delivered => delivered = true,
            }
        }
    };

    response.raw_output = collected;
    response.raw_error = String::from_utf8_lossy(&stderr_bytes).into_owned();

    match outcome {
        Ok(Ok(status)) => {
            response.return_code = status.code();
            response.end_process_timer();
            info!(
                service = %response.service,
                return_code = ?response.return_code,
                elapsed_ms = response.process_time_ms,
                "Command finished"
            );
        }
        Ok(Err(e)) => {
            warn!(service = %response.service, error = %e, "Command failed while running");
            terminate(&mut child, pid).await;
            response.add_error(e.to_string(), Some(NOT_RUN_RETURN_CODE));
        }
        Err(_) => {
            warn!(
                service = %response.service,
                timeout_secs = timeout.as_secs_f64(),
                "Command timed out, killing process group"
            );
            terminate(&mut child, pid).await;
            response.add_error(
                format!("Command timed out after {} seconds", timeout.as_secs_f64()),
                Some(TIMEOUT_RETURN_CODE),
            );
        }
    }

    if !delivered
        && tokio::time::timeout(PROGRESS_FLUSH_TIMEOUT, &mut delivery)
            .await
            .is_err()
    {
        warn!(service = %service, "Gave up delivering the remaining progress updates");
    }

    response
}

/// Looks `name` up the way a shell would: as a path if it contains a separator,
/// otherwise on each `PATH` entry.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|path| is_executable(path))
}

/// First word of the command line, honouring shell quoting when possible.
fn program_name(cmd: &str) -> Option<String> {
    shlex::split(cmd)
        .and_then(|words| words.into_iter().next())
        .or_else(|| cmd.split_whitespace().next().map(str::to_string))
        .filter(|name| !name.is_empty())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

fn spawn_shell(cmd: &str, env: &[(&str, String)]) -> io::Result<Child> {
    let (shell, flag) = if cfg!(target_os = "windows") {
        ("cmd", "/C")
    } else {
        ("sh", "-c")
    };

    let mut command = Command::new(shell);
    command
        .arg(flag)
        .arg(cmd)
        .envs(env.iter().map(|(key, value)| (*key, value.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    // Own process group so a timeout can take down everything the shell started.
    #[cfg(unix)]
    command.process_group(0);

    command.spawn()
}

async fn stream_stdout(
    stdout: Option<ChildStdout>,
    collected: &mut String,
    queue: Option<mpsc::Sender<ProgressUpdate>>,
    expected_lines: Option<u32>,
    service: &str,
) -> io::Result<()> {
    let Some(stdout) = stdout else {
        return Ok(());
    };
    let mut reader = BufReader::new(stdout);
    let mut line = Vec::new();
    let mut count: u64 = 0;
    let mut dropped: u64 = 0;

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        count += 1;
        let text = String::from_utf8_lossy(&line);
        if let Some(queue) = &queue {
            let update = ProgressUpdate {
                progress: count,
                total: expected_lines,
                message: text.trim().to_string(),
            };
            if let Err(TrySendError::Full(_)) = queue.try_send(update) {
                dropped += 1;
                if dropped == 1 {
                    warn!(service = %service, line = count, "Progress sink is falling behind, dropping updates");
                }
            }
        }
        collected.push_str(&text);
    }
    if dropped > 0 {
        warn!(service = %service, dropped, "Progress updates dropped");
    }
    Ok(())
}

/// Feeds queued updates to the sink, one at a time, until the queue closes.
async fn deliver_progress(
    mut updates: mpsc::Receiver<ProgressUpdate>,
    sink: Option<&dyn ProgressSink>,
    service: &str,
) {
    while let Some(update) = updates.recv().await {
        if let Some(sink) = sink {
            report_progress(sink, update, service).await;
        }
    }
}

async fn report_progress(sink: &dyn ProgressSink, update: ProgressUpdate, service: &str) {
    match tokio::time::timeout(PROGRESS_REPORT_TIMEOUT, sink.report(update)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(service = %service, error = %e, "Progress reporting failed"),
        Err(_) => warn!(service = %service, "Progress reporting timed out"),
    }
}

async fn drain<R: AsyncRead + Unpin>(stream: Option<R>, buf: &mut Vec<u8>) -> io::Result<()> {
    if let Some(mut stream) = stream {
        stream.read_to_end(buf).await?;
    }
    Ok(())
}

/// Kills the child's whole process group, then reaps the child.
async fn terminate(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    {
        if let Some(pid) = pid.and_then(|p| libc::pid_t::try_from(p).ok()) {
            // The child leads its own group (process_group(0)), so pgid == pid.
            let rc = unsafe { libc::killpg(pid, libc::SIGKILL) };
            if rc != 0 {
                debug!(pid, error = %io::Error::last_os_error(), "killpg failed");
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pid;

    if let Err(e) = child.start_kill() {
        debug!(error = %e, "start_kill failed (process may already be gone)");
    }
    match tokio::time::timeout(REAP_TIMEOUT, child.wait()).await {
        Ok(Ok(status)) => debug!(?status, "Killed process reaped"),
        Ok(Err(e)) => warn!(error = %e, "Failed to reap killed process"),
        Err(_) => warn!("Timed out reaping killed process"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_name_first_word() {
        assert_eq!(program_name("ping -c 1 host").as_deref(), Some("ping"));
        assert_eq!(program_name("   nmap   -F x").as_deref(), Some("nmap"));
        assert_eq!(program_name("'/opt/my tools/scan' -x").as_deref(), Some("/opt/my tools/scan"));
        assert_eq!(program_name(""), None);
        assert_eq!(program_name("   "), None);
    }

    #[test]
    fn test_find_executable_on_path() {
        assert!(find_executable("sh").is_some(), "sh should be on PATH");
        assert!(find_executable("this_command_should_not_exist_qwertyuiop").is_none());
        assert!(find_executable("").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_find_executable_requires_exec_bit() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("tool.sh");
        std::fs::write(&script, "#!/bin/sh\necho hi\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(find_executable(script.to_str().unwrap()).is_none());

        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(find_executable(script.to_str().unwrap()), Some(script.clone()));

        // Directories are never executables.
        assert!(find_executable(dir.path().to_str().unwrap()).is_none());
    }
}
