//! Running the evaluator binary: one fresh process per call.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{RecvTimeoutError, bounded};
use parking_lot::Mutex;

use super::pool::WorkerPool;
use crate::error::EvaluationError;

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Raw result of one evaluator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    /// `None` when the process was ended by a signal.
    pub exit_code: Option<i32>,
}

/// Feeds a request to an evaluator and collects what it prints.
pub trait ProcessRunner: Send + Sync {
    /// Human readable name of the evaluator, used in messages.
    fn name(&self) -> &str;

    fn run(&self, input: &[u8]) -> Result<ProcessOutput, EvaluationError>;
}

/// Runs an evaluator executable as a child process.
///
/// Each call spawns its own process. Two jobs go to the shared pool: one
/// forwards stderr to the debug log, the other kills the process once the
/// timeout expires.
pub struct SubprocessRunner {
    executable: PathBuf,
    name: String,
    timeout: Duration,
    pool: Arc<WorkerPool>,
}

impl SubprocessRunner {
    pub fn new(executable: impl Into<PathBuf>, timeout: Duration, pool: Arc<WorkerPool>) -> Self {
        let executable = executable.into();
        let name = executable
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| executable.display().to_string());
        Self {
            executable,
            name,
            timeout,
            pool,
        }
    }

    fn timeout_failure(&self) -> EvaluationError {
        EvaluationError::ProcessFailure(format!(
            "{} took too long. External process killed forcibly",
            self.name
        ))
    }

    /// Wait for the child to exit, killing it once `deadline` passes.
    fn wait_for_exit(
        &self,
        child: &Mutex<Child>,
        deadline: Instant,
        timed_out: &AtomicBool,
    ) -> Result<ExitStatus, EvaluationError> {
        loop {
            {
                let mut child = child.lock();
                match child.try_wait() {
                    Ok(Some(status)) => return Ok(status),
                    Ok(None) if Instant::now() >= deadline => {
                        timed_out.store(true, Ordering::SeqCst);
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(self.timeout_failure());
                    }
                    Ok(None) => {}
                    Err(e) => {
                        let _ = child.kill();
                        return Err(EvaluationError::ProcessFailure(format!(
                            "Interrupted while waiting for {} to finish: {}",
                            self.name, e
                        )));
                    }
                }
            }
            thread::sleep(EXIT_POLL_INTERVAL);
        }
    }
}

impl ProcessRunner for SubprocessRunner {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, input: &[u8]) -> Result<ProcessOutput, EvaluationError> {
        let started = Instant::now();
        let mut child = Command::new(&self.executable)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                EvaluationError::ProcessFailure(format!("Failed to start {}: {}", self.name, e))
            })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let child = Arc::new(Mutex::new(child));
        let timed_out = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = bounded::<()>(1);

        if let Some(stderr) = stderr {
            let name = self.name.clone();
            let queued = self.pool.execute(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    log::debug!("[{}] {}", name, line);
                }
            });
            if let Err(e) = queued {
                abort(&child);
                return Err(EvaluationError::ProcessFailure(format!(
                    "Unable to run {}: {}",
                    self.name, e
                )));
            }
        }

        let watchdog = {
            let child = Arc::clone(&child);
            let timed_out = Arc::clone(&timed_out);
            let timeout = self.timeout;
            let name = self.name.clone();
            self.pool.execute(move || {
                if let Err(RecvTimeoutError::Timeout) = done_rx.recv_timeout(timeout) {
                    let mut child = child.lock();
                    if let Ok(None) = child.try_wait() {
                        log::debug!("{} did not finish within {:?}, killing it", name, timeout);
                        timed_out.store(true, Ordering::SeqCst);
                        let _ = child.kill();
                    }
                }
            })
        };
        if let Err(e) = watchdog {
            abort(&child);
            return Err(EvaluationError::ProcessFailure(format!(
                "Unable to run {}: {}",
                self.name, e
            )));
        }

        let output = thread::scope(|scope| {
            if let Some(mut stdin) = stdin {
                let name = &self.name;
                scope.spawn(move || {
                    // a child that exits early closes the pipe; its exit code tells the story
                    if let Err(e) = stdin.write_all(input) {
                        log::debug!("Failed to write request to {}: {}", name, e);
                    }
                });
            }
            let mut output = Vec::new();
            match stdout {
                Some(mut stdout) => stdout.read_to_end(&mut output).map(|_| output),
                None => Ok(output),
            }
        });
        let output = match output {
            Ok(output) => output,
            Err(e) => {
                abort(&child);
                return Err(EvaluationError::ProcessFailure(format!(
                    "Failed to read output of {}: {}",
                    self.name, e
                )));
            }
        };

        let status = self.wait_for_exit(&child, started + self.timeout, &timed_out);
        drop(done_tx);
        let status = status?;
        if timed_out.load(Ordering::SeqCst) {
            return Err(self.timeout_failure());
        }

        log::debug!(
            "{} finished in {:?} with {} bytes of output",
            self.name,
            started.elapsed(),
            output.len()
        );
        Ok(ProcessOutput {
            stdout: output,
            exit_code: status.code(),
        })
    }
}

/// Kill the child and reap it.
fn abort(child: &Mutex<Child>) {
    let mut child = child.lock();
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn started_pool() -> Arc<WorkerPool> {
        let pool = Arc::new(WorkerPool::new(2));
        pool.start().unwrap();
        pool
    }

    #[test]
    fn test_echoes_stdin() {
        let dir = TempDir::new().unwrap();
        let runner = SubprocessRunner::new(script(&dir, "echo", "cat"), Duration::from_secs(5), started_pool());
        let output = runner.run(b"hello").unwrap();
        assert_eq!(output.stdout, b"hello");
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(runner.name(), "echo");
    }

    #[test]
    fn test_reports_exit_code() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "fail", "cat >/dev/null; echo oops >&2; exit 1");
        let runner = SubprocessRunner::new(path, Duration::from_secs(5), started_pool());
        let output = runner.run(b"request").unwrap();
        assert!(output.stdout.is_empty());
        assert_eq!(output.exit_code, Some(1));
    }

    #[test]
    fn test_timeout_kills_process() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "hang", "exec sleep 30");
        let runner = SubprocessRunner::new(path, Duration::from_millis(200), started_pool());

        let started = Instant::now();
        let err = runner.run(b"").unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(matches!(err, EvaluationError::ProcessFailure(ref m) if m.contains("took too long")));
    }

    #[test]
    fn test_stopped_pool_fails_gracefully() {
        let dir = TempDir::new().unwrap();
        let pool = Arc::new(WorkerPool::new(2));
        let runner = SubprocessRunner::new(script(&dir, "echo", "cat"), Duration::from_secs(5), pool);
        let err = runner.run(b"hello").unwrap_err();
        assert!(matches!(err, EvaluationError::ProcessFailure(ref m) if m.contains("not running")));
    }

    #[test]
    fn test_missing_executable() {
        let dir = TempDir::new().unwrap();
        let runner = SubprocessRunner::new(dir.path().join("missing"), Duration::from_secs(5), started_pool());
        assert!(matches!(runner.run(b""), Err(EvaluationError::ProcessFailure(_))));
    }

    #[test]
    fn test_large_stderr_does_not_block() {
        let dir = TempDir::new().unwrap();
        // ~200 KiB of stderr, well past a pipe buffer, before any stdout
        let path = script(
            &dir,
            "noisy",
            "i=0; while [ $i -lt 4000 ]; do echo 'warning: this line is padded out to fifty bytes..' >&2; i=$((i+1)); done; cat",
        );
        let runner = SubprocessRunner::new(path, Duration::from_secs(20), started_pool());

        let request = vec![b'x'; 256 * 1024];
        let output = runner.run(&request).unwrap();
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout.len(), request.len());
    }
}
