//! External tool invocation with a hard deadline.

use super::OcrError;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::time::{Duration, Instant};

/// How often a running child is polled for completion
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Captured output of a finished tool
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Run `program` with `args`, killing it once `timeout` elapses.
///
/// A non-zero exit status is an error carrying the tool's stderr.
pub fn run_tool<I, A>(program: &str, args: I, timeout: Duration) -> Result<ToolOutput, OcrError>
where
    I: IntoIterator<Item = A>,
    A: Into<OsString>,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    tracing::debug!("[Ocr] Running {} {:?}", program, args);

    let handle = duct::cmd(program, &args)
        .stdin_null()
        .stdout_capture()
        .stderr_capture()
        .unchecked()
        .start()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => OcrError::ToolMissing(program.to_string()),
            _ => OcrError::Io(e),
        })?;

    let started = Instant::now();
    loop {
        if let Some(output) = handle.try_wait()? {
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                return Err(OcrError::Failed {
                    tool: program.to_string(),
                    status: output.status.to_string(),
                    stderr,
                });
            }
            return Ok(ToolOutput {
                stdout: output.stdout.clone(),
                stderr: output.stderr.clone(),
            });
        }

        if started.elapsed() >= timeout {
            if let Err(e) = handle.kill() {
                tracing::warn!("[Ocr] Failed to kill {}: {}", program, e);
            }
            tracing::warn!("[Ocr] {} exceeded {:?}, killed", program, timeout);
            return Err(OcrError::Timeout {
                tool: program.to_string(),
                after: timeout,
            });
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool() {
        let result = run_tool(
            "docarchive-no-such-tool",
            Vec::<OsString>::new(),
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(OcrError::ToolMissing(_))));
    }

    #[test]
    #[cfg(unix)]
    fn test_captures_stdout() {
        let output = run_tool("sh", ["-c", "printf hello"], Duration::from_secs(5)).unwrap();
        assert_eq!(output.stdout_text(), "hello");
    }

    #[test]
    #[cfg(unix)]
    fn test_nonzero_exit_is_failure() {
        let result = run_tool("sh", ["-c", "echo broken >&2; exit 3"], Duration::from_secs(5));
        match result {
            Err(OcrError::Failed { stderr, .. }) => assert_eq!(stderr, "broken"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    #[cfg(unix)]
    fn test_timeout_kills_child() {
        let started = Instant::now();
        let result = run_tool("sh", ["-c", "exec sleep 10"], Duration::from_millis(200));
        assert!(matches!(result, Err(OcrError::Timeout { .. })));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
