//! Runner for the `lume` command-line tool.
//!
//! Every interaction with lume is one subprocess described by an
//! [`Invocation`]. Output is either streamed line by line to a [`Ui`] or
//! captured; captured output of a failed command becomes the error message.

use std::io::{BufRead, BufReader, Read};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::process;
use crate::ui::Ui;

/// Default lume executable, looked up on PATH.
pub const LUME_COMMAND: &str = "lume";

/// Shell used to compose a delay with the command.
const SHELL: &str = "/bin/sh";

/// `$1` is the delay in seconds, the remaining arguments are the command.
const DELAYED_SCRIPT: &str = r#"sleep "$1" && shift && exec "$@""#;

/// One lume invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Arguments after the program name, e.g. `["ip", "--wait", "120", "vm1"]`.
    pub args: Vec<String>,
    /// Seconds to sleep before running the command (0 = none).
    pub delay_secs: u64,
}

impl Invocation {
    /// An invocation that runs immediately.
    pub fn new(args: Vec<String>) -> Self {
        Self {
            args,
            delay_secs: 0,
        }
    }

    /// An invocation preceded by a delay inside the same process tree.
    pub fn delayed(args: Vec<String>, delay_secs: u64) -> Self {
        Self { args, delay_secs }
    }
}

/// Executes lume invocations.
#[derive(Debug, Clone)]
pub struct Lume {
    program: PathBuf,
    base_args: Vec<String>,
}

impl Default for Lume {
    fn default() -> Self {
        Self::new(LUME_COMMAND)
    }
}

impl Lume {
    /// Run `program` for every invocation.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
        }
    }

    /// Run `program base_args...` for every invocation.
    ///
    /// Used when lume is reached through another launcher, such as `ssh`.
    pub fn with_base_args(program: impl Into<PathBuf>, base_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args,
        }
    }

    /// Execute one invocation.
    ///
    /// With `ui`, stdout and stderr are forwarded line by line as they
    /// arrive and an empty string is returned. Without it, combined output
    /// is captured and trimmed; on non-zero exit it becomes the error
    /// message ([`Error::Lume`]).
    ///
    /// Cancelling `ctx` kills the child's process group and returns
    /// [`Error::Cancelled`].
    pub fn execute(
        &self,
        ctx: &CancelToken,
        invocation: &Invocation,
        ui: Option<&dyn Ui>,
    ) -> Result<String> {
        let program = self.program.display().to_string();

        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }

        tracing::debug!(
            program = %program,
            args = ?invocation.args,
            delay_secs = invocation.delay_secs,
            streaming = ui.is_some(),
            "executing lume"
        );

        match ui {
            Some(ui) => {
                let mut cmd = self.command(invocation);
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
                let mut child = spawn(cmd, &program)?;

                let stdout = child.stdout.take();
                let stderr = child.stderr.take();
                let status = std::thread::scope(|s| {
                    if let Some(out) = stdout {
                        s.spawn(move || forward_lines(out, |line| ui.message(line)));
                    }
                    if let Some(err) = stderr {
                        s.spawn(move || forward_lines(err, |line| ui.error(line)));
                    }
                    process::wait_or_cancel(&mut child, &program, ctx)
                })?;

                if !status.success() {
                    return Err(Error::ExitStatus {
                        program,
                        status: status.to_string(),
                    });
                }
                Ok(String::new())
            }
            None => {
                // stdout and stderr share one pipe so the text keeps the
                // order the tool wrote it in.
                let spawn_err = |source| Error::Spawn {
                    program: program.clone(),
                    source,
                };
                let (mut reader, writer) = std::io::pipe().map_err(spawn_err)?;
                let writer_err = writer.try_clone().map_err(spawn_err)?;

                let mut cmd = self.command(invocation);
                cmd.stdout(writer).stderr(writer_err);
                let mut child = spawn(cmd, &program)?;

                let (status, combined) = std::thread::scope(|s| {
                    let drain = s.spawn(move || {
                        let mut buf = Vec::new();
                        if let Err(e) = reader.read_to_end(&mut buf) {
                            tracing::warn!(error = %e, "failed to read command output");
                        }
                        buf
                    });
                    let status = process::wait_or_cancel(&mut child, &program, ctx);
                    (status, drain.join().unwrap_or_default())
                });
                let status = status?;

                let output = String::from_utf8_lossy(&combined).trim().to_string();

                if !status.success() {
                    tracing::debug!(program = %program, status = %status, "lume failed");
                    return Err(Error::Lume(output));
                }
                Ok(output)
            }
        }
    }

    fn command(&self, invocation: &Invocation) -> Command {
        let mut cmd = if invocation.delay_secs > 0 {
            let mut cmd = Command::new(SHELL);
            cmd.arg("-c")
                .arg(DELAYED_SCRIPT)
                .arg("sh")
                .arg(invocation.delay_secs.to_string())
                .arg(&self.program);
            cmd
        } else {
            Command::new(&self.program)
        };

        cmd.args(&self.base_args)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .process_group(0);
        cmd
    }
}

/// Start `cmd`, consuming it so the parent's copies of any pipe write ends
/// are closed once the child has its own.
fn spawn(mut cmd: Command, program: &str) -> Result<Child> {
    cmd.spawn().map_err(|source| Error::Spawn {
        program: program.to_string(),
        source,
    })
}

/// Forward each line of `reader` to `emit`, without the line terminator.
fn forward_lines<R: Read>(reader: R, emit: impl Fn(&str)) {
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                emit(text.trim_end_matches(['\n', '\r']));
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read command output");
                break;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ui::{RecordingUi, UiLevel};
    use std::path::Path;
    use std::time::{Duration, Instant};

    /// A lume stand-in: `script` is run by /bin/sh with the invocation's
    /// arguments as `$@`.
    pub(crate) fn fake_lume(dir: &Path, script: &str) -> Lume {
        let path = dir.join("lume.sh");
        std::fs::write(&path, script).unwrap();
        Lume::with_base_args(SHELL, vec![path.display().to_string()])
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_captured_output_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let lume = fake_lume(dir.path(), "echo '  192.168.64.5  '\necho\n");

        let out = lume
            .execute(&CancelToken::new(), &Invocation::new(args(&["ip", "vm1"])), None)
            .unwrap();
        assert_eq!(out, "192.168.64.5");
    }

    #[test]
    fn test_failure_message_is_tool_output() {
        let dir = tempfile::tempdir().unwrap();
        let lume = fake_lume(dir.path(), "echo \"Virtual machine not found: $2\" >&2\nexit 1\n");

        let err = lume
            .execute(&CancelToken::new(), &Invocation::new(args(&["ip", "vm1"])), None)
            .unwrap_err();
        assert!(matches!(err, Error::Lume(_)));
        assert_eq!(err.to_string(), "Virtual machine not found: vm1");
    }

    #[test]
    fn test_captured_output_combines_streams() {
        let dir = tempfile::tempdir().unwrap();
        let lume = fake_lume(dir.path(), "echo to-stdout\necho to-stderr >&2\nexit 2\n");

        let err = lume
            .execute(&CancelToken::new(), &Invocation::new(vec![]), None)
            .unwrap_err();
        assert_eq!(err.to_string(), "to-stdout\nto-stderr");
    }

    #[test]
    fn test_captured_output_keeps_write_order() {
        let dir = tempfile::tempdir().unwrap();
        let lume = fake_lume(
            dir.path(),
            "i=0\nwhile [ $i -lt 200 ]; do\n  echo out$i\n  echo err$i >&2\n  i=$((i+1))\ndone\nexit 1\n",
        );
        let expected = (0..200)
            .map(|i| format!("out{}\nerr{}", i, i))
            .collect::<Vec<_>>()
            .join("\n");

        for _ in 0..5 {
            let err = lume
                .execute(&CancelToken::new(), &Invocation::new(vec![]), None)
                .unwrap_err();
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_arguments_are_passed_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let lume = fake_lume(dir.path(), "printf '%s\\n' \"$@\"\n");

        let out = lume
            .execute(
                &CancelToken::new(),
                &Invocation::new(args(&["set", "my vm", "--display", "1024x768"])),
                None,
            )
            .unwrap();
        assert_eq!(out.lines().collect::<Vec<_>>(), ["set", "my vm", "--display", "1024x768"]);
    }

    #[test]
    fn test_delay_runs_before_command() {
        let dir = tempfile::tempdir().unwrap();
        let lume = fake_lume(dir.path(), "printf '%s ' \"$@\"\n");

        let start = Instant::now();
        let out = lume
            .execute(
                &CancelToken::new(),
                &Invocation::delayed(args(&["ip", "--wait", "120", "vm1"]), 1),
                None,
            )
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert_eq!(out, "ip --wait 120 vm1");
    }

    #[test]
    fn test_streaming_forwards_lines() {
        let dir = tempfile::tempdir().unwrap();
        let lume = fake_lume(dir.path(), "echo line1\necho line2\necho oops >&2\n");
        let ui = RecordingUi::new();

        let out = lume
            .execute(&CancelToken::new(), &Invocation::new(vec![]), Some(&ui))
            .unwrap();
        assert_eq!(out, "");
        assert_eq!(ui.lines_at(UiLevel::Message), vec!["line1", "line2"]);
        assert_eq!(ui.lines_at(UiLevel::Error), vec!["oops"]);
    }

    #[test]
    fn test_streaming_failure_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let lume = fake_lume(dir.path(), "echo partial\nexit 3\n");
        let ui = RecordingUi::new();

        let err = lume
            .execute(&CancelToken::new(), &Invocation::new(vec![]), Some(&ui))
            .unwrap_err();
        assert!(matches!(err, Error::ExitStatus { .. }));
        assert_eq!(ui.lines_at(UiLevel::Message), vec!["partial"]);
    }

    #[test]
    fn test_cancel_interrupts_delay() {
        let dir = tempfile::tempdir().unwrap();
        let lume = fake_lume(dir.path(), "echo never\n");
        let ctx = CancelToken::new();

        let canceller = {
            let ctx = ctx.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(200));
                ctx.cancel();
            })
        };

        let start = Instant::now();
        let err = lume
            .execute(&ctx, &Invocation::delayed(vec![], 30), None)
            .unwrap_err();
        canceller.join().unwrap();

        assert!(matches!(err, Error::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_already_cancelled_does_not_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let lume = fake_lume(dir.path(), &format!("touch '{}'\n", marker.display()));
        let ctx = CancelToken::new();
        ctx.cancel();

        let err = lume.execute(&ctx, &Invocation::new(vec![]), None).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(!marker.exists());
    }

    #[test]
    fn test_missing_program() {
        let lume = Lume::new("/nonexistent/lume");
        let err = lume
            .execute(&CancelToken::new(), &Invocation::new(vec![]), None)
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
