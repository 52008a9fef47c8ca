use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::Duration;

use crate::error::BotError;
use crate::logging::Logger;
use crate::process::{run_checked, run_with_timeout};

const SCOPE: &str = "AdbBridge";

/// What `adb connect` reported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectStatus {
    Connected,
    AlreadyConnected,
    /// adb exited cleanly but did not confirm the connection
    Unconfirmed(String),
}

/// Classifies the stdout of `adb connect`.
pub fn classify_connect_output(stdout: &str) -> ConnectStatus {
    let lower = stdout.to_lowercase();
    if lower.contains("already connected") {
        ConnectStatus::AlreadyConnected
    } else if lower.contains("connected to") {
        ConnectStatus::Connected
    } else {
        ConnectStatus::Unconfirmed(stdout.trim().to_string())
    }
}

/// An adb executable bound to one device address.
#[derive(Clone, Debug)]
pub struct AdbBridge {
    executable: PathBuf,
    address: String,
    timeout: Duration,
}

impl AdbBridge {
    pub fn new(executable: PathBuf, address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            executable,
            address: address.into(),
            timeout,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// `adb -s <address> <args...>`
    pub fn device_command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut command = Command::new(&self.executable);
        command.arg("-s").arg(&self.address).args(args);
        command
    }

    /// Runs an adb command against the device, failing on non-zero exit.
    pub fn run<I, S>(&self, args: I) -> crate::error::Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        run_checked(&mut self.device_command(args), self.timeout)
            .map_err(|e| BotError::Adb(format!("{:#}", e)))
    }

    /// Runs `adb connect <address>` and logs the outcome.
    ///
    /// A failed connect is logged, not returned: the device may still be
    /// reachable over USB under the same serial.
    pub fn connect(&self, log: &dyn Logger) -> Option<ConnectStatus> {
        log.info(SCOPE, &format!("Connecting to {}", self.address));

        let mut command = Command::new(&self.executable);
        command.arg("connect").arg(&self.address);

        match run_with_timeout(&mut command, self.timeout) {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let status = classify_connect_output(&stdout);
                match &status {
                    ConnectStatus::Connected => {
                        log.info(SCOPE, &format!("Connected to {}", self.address))
                    }
                    ConnectStatus::AlreadyConnected => {
                        log.info(SCOPE, &format!("Already connected to {}", self.address))
                    }
                    ConnectStatus::Unconfirmed(text) => log.warn(
                        SCOPE,
                        &format!("Connection to {} may have failed: {}", self.address, text),
                    ),
                }
                Some(status)
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                log.error(
                    SCOPE,
                    &format!("Failed to connect to {}: {}", self.address, stderr.trim()),
                );
                None
            }
            Err(e) => {
                log.error(
                    SCOPE,
                    &format!("Failed to connect to {}: {:#}", self.address, e),
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_connect_output() {
        assert_eq!(
            classify_connect_output("connected to 127.0.0.1:16384\n"),
            ConnectStatus::Connected
        );
        assert_eq!(
            classify_connect_output("already connected to 127.0.0.1:16384"),
            ConnectStatus::AlreadyConnected
        );
        assert_eq!(
            classify_connect_output("failed to connect to '127.0.0.1:16384': Connection refused\n"),
            ConnectStatus::Unconfirmed(
                "failed to connect to '127.0.0.1:16384': Connection refused".to_string()
            )
        );
    }

    #[test]
    fn test_run_reports_adb_error() {
        let bridge = AdbBridge::new(
            PathBuf::from("/nonexistent/platform-tools/adb"),
            "127.0.0.1:16384",
            Duration::from_secs(1),
        );
        let err = bridge.run(["shell", "true"]).unwrap_err();
        assert!(matches!(&err, BotError::Adb(msg) if msg.contains("Failed to spawn")));
    }

    #[test]
    fn test_device_command_targets_address() {
        let bridge = AdbBridge::new(PathBuf::from("adb"), "127.0.0.1:16384", Duration::from_secs(1));
        let command = bridge.device_command(["shell", "input", "tap", "1", "2"]);
        let args: Vec<String> = command
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(
            args,
            vec!["-s", "127.0.0.1:16384", "shell", "input", "tap", "1", "2"]
        );
    }
}
