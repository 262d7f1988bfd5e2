//! Cancellable external process execution.
//!
//! Tools are spawned with piped output, drained on helper threads, and
//! polled so that a cancelled run kills the child instead of waiting for it.

use std::ffi::OsString;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use narrator_core::{CancelToken, ToolError};

/// How often a running child is checked for exit or cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Number of trailing stderr lines kept in failure messages.
const STDERR_TAIL_LINES: usize = 20;

/// Captured output of a successful tool run.
#[derive(Debug, Default)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Run `program` with `args` until it exits or `cancel` fires.
///
/// A non-zero exit becomes [`ToolError::Failed`] carrying the tail of stderr;
/// cancellation kills the child and returns [`ToolError::Cancelled`].
pub fn run_tool(
    program: &str,
    args: &[OsString],
    cancel: &CancelToken,
) -> Result<ToolOutput, ToolError> {
    if cancel.is_cancelled() {
        return Err(ToolError::Cancelled);
    }

    log::debug!("Running: {} {}", program, display_args(args));

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ToolError::Spawn {
            tool: program.to_string(),
            source,
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if cancel.is_cancelled() {
            kill(&mut child, program);
            let _ = join(stdout);
            let _ = join(stderr);
            return Err(ToolError::Cancelled);
        }
        cancel.sleep(POLL_INTERVAL);
    };

    let stdout = join(stdout);
    let stderr = String::from_utf8_lossy(&join(stderr)).into_owned();

    if !status.success() {
        return Err(ToolError::Failed {
            tool: program.to_string(),
            code: status.code(),
            stderr: stderr_tail(&stderr),
        });
    }

    Ok(ToolOutput { stdout, stderr })
}

fn kill(child: &mut Child, program: &str) {
    log::debug!("Killing {} (pid {})", program, child.id());
    if let Err(e) = child.kill() {
        log::warn!("Failed to kill {}: {}", program, e);
    }
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn join(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Keep only the last lines of a (possibly very chatty) stderr stream.
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim_end().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

fn display_args(args: &[OsString]) -> String {
    args.iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let text: String = (1..=30).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(&text);
        assert!(tail.starts_with("line 11"));
        assert!(tail.ends_with("line 30"));
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let err = run_tool(
            "definitely-not-a-real-binary-name",
            &[],
            &CancelToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }

    #[test]
    fn test_cancelled_before_spawn() {
        let token = CancelToken::new();
        token.cancel();
        let err = run_tool("definitely-not-a-real-binary-name", &[], &token).unwrap_err();
        assert!(matches!(err, ToolError::Cancelled));
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_stdout() {
        let output = run_tool("sh", &args(&["-c", "printf hello"]), &CancelToken::new()).unwrap();
        assert_eq!(output.stdout, b"hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_failure() {
        let err = run_tool(
            "sh",
            &args(&["-c", "echo broken >&2; exit 3"]),
            &CancelToken::new(),
        )
        .unwrap_err();
        match err {
            ToolError::Failed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_cancellation_kills_child() {
        let token = CancelToken::new();
        let canceller = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            canceller.cancel();
        });

        let start = Instant::now();
        let err = run_tool("sleep", &args(&["30"]), &token).unwrap_err();
        handle.join().unwrap();

        assert!(matches!(err, ToolError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
