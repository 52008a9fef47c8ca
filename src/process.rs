//! External process execution with a hard timeout.
//!
//! adb and tesseract can hang when the device drops off or the input image
//! is odd, so every call goes through `run_with_timeout`.

use anyhow::{anyhow, Result};
use std::io::Read;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Interval between child status polls.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs `command` to completion, killing it if it exceeds `timeout`.
///
/// Stdout and stderr are drained on helper threads so a chatty child
/// cannot block on a full pipe.
pub fn run_with_timeout(command: &mut Command, timeout: Duration) -> Result<Output> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| anyhow!("Failed to spawn {:?}: {}", command.get_program(), e))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_reader = thread::spawn(move || drain(stdout));
    let stderr_reader = thread::spawn(move || drain(stderr));

    let start = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if start.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(anyhow!(
                "{:?} timed out after {}ms",
                command.get_program(),
                timeout.as_millis()
            ));
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();

    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

/// Like `run_with_timeout`, but a non-zero exit status becomes an error
/// carrying the trimmed stderr.
pub fn run_checked(command: &mut Command, timeout: Duration) -> Result<Output> {
    let output = run_with_timeout(command, timeout)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(
            "{:?} failed ({}): {}",
            command.get_program(),
            output.status,
            stderr.trim()
        ));
    }
    Ok(output)
}

fn drain<R: Read>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    buf
}
