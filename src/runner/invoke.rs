//! Blocking invocation of the program under test.
//!
//! The child's stdout and stderr are drained on dedicated threads so it can
//! never stall on a full pipe, while the calling thread waits for exit (with
//! an optional deadline). Output is only handed back once both pipes have
//! closed.
//!
//! On Unix the child leads its own process group. Once it has exited or timed
//! out the whole group is killed, so wrapper scripts cannot leave
//! descendants behind holding the pipes open.

#![allow(missing_docs)]

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel as channel;

use crate::core::config::ProgramConfig;
use crate::core::errors::{Result, WfcError};

/// How often a child with a deadline is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long the pipes may stay open after the child has exited.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Number of trailing stderr lines kept in status errors.
const STDERR_TAIL_LINES: usize = 5;

/// Everything captured from one finished run.
#[derive(Debug, Clone)]
pub struct CapturedRun {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the child was terminated by a signal.
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

/// Runs `<program> [args...] <input>` and captures its output.
#[derive(Debug, Clone)]
pub struct ProgramRunner {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
    expected_exit_codes: Vec<i32>,
}

#[derive(Debug, Clone, Copy)]
enum Pipe {
    Stdout,
    Stderr,
}

impl ProgramRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
            expected_exit_codes: vec![0],
        }
    }

    pub fn from_config(config: &ProgramConfig) -> Self {
        Self {
            program: config.path.clone(),
            args: config.args.clone(),
            timeout: config.timeout(),
            expected_exit_codes: config.expected_exit_codes.clone(),
        }
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_expected_exit_codes(mut self, codes: Vec<i32>) -> Self {
        self.expected_exit_codes = codes;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Human-readable command line for diagnostics.
    pub fn command_line(&self, input: &Path) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.push(input.display().to_string());
        parts.join(" ")
    }

    /// Run the program to completion against `input`.
    pub fn run(&self, input: &Path) -> Result<CapturedRun> {
        let started = Instant::now();
        let deadline = self.timeout.map(|t| started + t);

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        own_process_group(&mut command);
        let mut child = command
            .spawn()
            .map_err(|source| WfcError::ProgramLaunch {
                program: self.program.clone(),
                source,
            })?;

        let (tx, rx) = channel::bounded::<(Pipe, io::Result<Vec<u8>>)>(2);
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (Some(stdout), Some(stderr)) = (stdout, stderr) else {
            reap(&mut child);
            return Err(self.output_error("child pipes were not created"));
        };
        if let Err(err) = spawn_drain(Pipe::Stdout, stdout, tx.clone())
            .and_then(|()| spawn_drain(Pipe::Stderr, stderr, tx))
        {
            reap(&mut child);
            return Err(self.output_error(&format!("cannot start pipe reader: {err}")));
        }

        let status = self.wait(&mut child, deadline)?;
        // Descendants that outlive the child would keep the pipes open.
        kill_group(&child);

        let drain_deadline = Instant::now() + DRAIN_GRACE;
        let mut out = None;
        let mut err = None;
        for _ in 0..2 {
            let received = rx.recv_deadline(drain_deadline).map_err(|_| {
                let held = if out.is_none() { "stdout" } else { "stderr" };
                self.output_error(&format!("{held} held open after exit"))
            })?;
            match received {
                (Pipe::Stdout, bytes) => out = Some(bytes),
                (Pipe::Stderr, bytes) => err = Some(bytes),
            }
        }
        let stdout = out
            .unwrap_or_else(|| Ok(Vec::new()))
            .map_err(|e| self.output_error(&format!("reading stdout: {e}")))?;
        let stderr = err.and_then(std::result::Result::ok).unwrap_or_default();

        let exit_code = status.code();
        if !exit_code.is_some_and(|code| self.expected_exit_codes.contains(&code)) {
            return Err(WfcError::ProgramStatus {
                program: self.program.clone(),
                status: status.to_string(),
                stderr_tail: stderr_tail(&stderr),
            });
        }

        Ok(CapturedRun {
            stdout,
            stderr,
            exit_code,
            elapsed: started.elapsed(),
        })
    }

    fn wait(&self, child: &mut Child, deadline: Option<Instant>) -> Result<ExitStatus> {
        let Some(deadline) = deadline else {
            return child
                .wait()
                .map_err(|e| self.output_error(&format!("waiting for exit: {e}")));
        };
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    let now = Instant::now();
                    if now >= deadline {
                        reap(child);
                        return Err(self.timeout_error());
                    }
                    thread::sleep(POLL_INTERVAL.min(deadline - now));
                }
                Err(e) => {
                    reap(child);
                    return Err(self.output_error(&format!("waiting for exit: {e}")));
                }
            }
        }
    }

    fn timeout_error(&self) -> WfcError {
        WfcError::ProgramTimeout {
            program: self.program.clone(),
            timeout: self.timeout.unwrap_or_default(),
        }
    }

    fn output_error(&self, details: &str) -> WfcError {
        WfcError::ProgramOutput {
            program: self.program.clone(),
            details: details.to_string(),
        }
    }
}

fn spawn_drain<R>(
    pipe: Pipe,
    mut reader: R,
    tx: channel::Sender<(Pipe, io::Result<Vec<u8>>)>,
) -> io::Result<()>
where
    R: Read + Send + 'static,
{
    let name = match pipe {
        Pipe::Stdout => "wfcheck-stdout",
        Pipe::Stderr => "wfcheck-stderr",
    };
    thread::Builder::new().name(name.to_string()).spawn(move || {
        let mut buf = Vec::new();
        let result = reader.read_to_end(&mut buf).map(|_| buf);
        // Receiver may be gone after a timeout.
        let _ = tx.send((pipe, result));
    })?;
    Ok(())
}

/// Kill the child's whole process group, then reap the child.
fn reap(child: &mut Child) {
    kill_group(child);
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(unix)]
fn own_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_command: &mut Command) {}

/// SIGKILL every process left in the child's group. A group that is already
/// empty is not an error.
#[cfg(unix)]
fn kill_group(child: &Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    if let Ok(pgid) = i32::try_from(child.id()) {
        let _ = killpg(Pid::from_raw(pgid), Signal::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join(" | ")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn write_test_script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-stage.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn captures_stdout_and_passes_input_last() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_test_script(dir.path(), "echo \"args: $*\"");
        let runner = ProgramRunner::new(&script).with_args(["-g", "-q"]);

        let run = runner.run(Path::new("world.cfg")).expect("script should run");
        assert_eq!(
            String::from_utf8_lossy(&run.stdout).trim(),
            "args: -g -q world.cfg"
        );
        assert_eq!(run.exit_code, Some(0));
    }

    #[test]
    fn captures_large_output_without_deadlock() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_test_script(
            dir.path(),
            "i=0; while [ $i -lt 20000 ]; do echo \"## line $i padding padding padding\"; \
             echo noise >&2; i=$((i+1)); done",
        );
        let runner = ProgramRunner::new(&script).with_timeout(Some(Duration::from_secs(30)));

        let run = runner.run(Path::new("x.world")).expect("script should finish");
        let lines = String::from_utf8_lossy(&run.stdout).lines().count();
        assert_eq!(lines, 20_000);
        assert!(!run.stderr.is_empty());
    }

    #[test]
    fn missing_program_is_launch_error() {
        let runner = ProgramRunner::new("/nonexistent/wfcheck/stage");
        let err = runner.run(Path::new("a.world")).expect_err("launch should fail");
        assert_eq!(err.code(), "WFC-3001");
        assert!(err.is_infrastructure());
    }

    #[test]
    fn unexpected_exit_code_is_status_error_with_stderr_tail() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_test_script(dir.path(), "echo 'boom happened' >&2; exit 3");
        let runner = ProgramRunner::new(&script);

        let err = runner.run(Path::new("a.world")).expect_err("exit 3 should fail");
        match err {
            WfcError::ProgramStatus { stderr_tail, .. } => {
                assert_eq!(stderr_tail, "boom happened");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn allowed_nonzero_exit_code_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_test_script(dir.path(), "echo 'stage error : x : quitting'; exit 1");
        let runner = ProgramRunner::new(&script).with_expected_exit_codes(vec![0, 1]);

        let run = runner.run(Path::new("a.world")).expect("exit 1 is allowed");
        assert_eq!(run.exit_code, Some(1));
    }

    #[test]
    fn slow_program_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_test_script(dir.path(), "exec sleep 30");
        let runner = ProgramRunner::new(&script).with_timeout(Some(Duration::from_millis(200)));

        let started = Instant::now();
        let err = runner.run(Path::new("a.world")).expect_err("should time out");
        assert_eq!(err.code(), "WFC-3003");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(target_os = "linux")]
    fn process_alive(pid: i32) -> bool {
        std::fs::read_to_string(format!("/proc/{pid}/stat")).is_ok_and(|stat| {
            stat.rsplit_once(')')
                .is_some_and(|(_, rest)| !rest.trim_start().starts_with('Z'))
        })
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn timeout_kills_the_whole_process_group() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("background.pid");
        let script = write_test_script(
            dir.path(),
            &format!("sleep 30 &\necho $! > '{}'\nsleep 30", pid_file.display()),
        );
        let runner = ProgramRunner::new(&script).with_timeout(Some(Duration::from_millis(300)));

        let err = runner.run(Path::new("a.world")).expect_err("should time out");
        assert_eq!(err.code(), "WFC-3003");

        let pid: i32 = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        let gone = (0..300).any(|_| {
            if process_alive(pid) {
                thread::sleep(Duration::from_millis(10));
                false
            } else {
                true
            }
        });
        assert!(gone, "background process {pid} survived the timeout");
    }

    #[test]
    fn background_descendant_does_not_turn_clean_exit_into_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_test_script(dir.path(), "echo 'stage error 1 x'\nsleep 30 &\nexit 0");

        for timeout in [Some(Duration::from_secs(3)), None] {
            let runner = ProgramRunner::new(&script).with_timeout(timeout);
            let started = Instant::now();
            let run = runner
                .run(Path::new("a.world"))
                .expect("an exited program is not a timeout");
            assert_eq!(run.exit_code, Some(0));
            assert_eq!(String::from_utf8_lossy(&run.stdout).trim(), "stage error 1 x");
            assert!(
                started.elapsed() < Duration::from_secs(3),
                "timeout={timeout:?} took {:?}",
                started.elapsed()
            );
        }
    }

    #[test]
    fn command_line_lists_args_then_input() {
        let runner = ProgramRunner::new("stage").with_args(["-g"]);
        assert_eq!(runner.command_line(Path::new("w.world")), "stage -g w.world");
    }

    #[test]
    fn from_config_copies_program_settings() {
        let config = ProgramConfig {
            path: PathBuf::from("/opt/stage"),
            args: vec!["-q".to_string()],
            timeout_secs: 0,
            expected_exit_codes: vec![0, 1],
        };
        let runner = ProgramRunner::from_config(&config);
        assert_eq!(runner.program(), Path::new("/opt/stage"));
        assert_eq!(runner.timeout(), None);
        assert_eq!(runner.command_line(Path::new("w")), "/opt/stage -q w");
    }

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let text = b"1\n2\n\n3\n4\n5\n6\n";
        assert_eq!(stderr_tail(text), "2 | 3 | 4 | 5 | 6");
    }
}
