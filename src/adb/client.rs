use crate::core::{Config, ToolError};
use crate::core::error::Result;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

pub const STARTUP_TIMEOUT_SECS: u64 = 10;

/// Runs one device-bridge command and returns its trimmed stdout.
///
/// Arguments are passed as discrete tokens, never through a shell.
#[async_trait]
pub trait AdbRunner: Send + Sync {
    async fn run(&self, args: &[&str]) -> Result<String>;

    /// Serial to target with `-s` for device-scoped commands, if any.
    fn serial(&self) -> Option<&str> {
        None
    }
}

/// Prepends `-s <serial>` when the runner targets a specific device.
pub(crate) fn device_args<'a>(runner: &'a dyn AdbRunner, cmd: &[&'a str]) -> Vec<&'a str> {
    let mut args = Vec::with_capacity(cmd.len() + 2);
    if let Some(serial) = runner.serial() {
        args.push("-s");
        args.push(serial);
    }
    args.extend_from_slice(cmd);
    args
}

#[derive(Debug, Clone)]
pub struct AdbClient {
    adb_path: PathBuf,
    serial: Option<String>,
    timeout_secs: Option<u64>,
}

impl AdbClient {
    pub fn new(adb_path: impl Into<PathBuf>) -> Self {
        Self {
            adb_path: adb_path.into(),
            serial: None,
            timeout_secs: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            adb_path: config.adb_path.clone(),
            serial: config.adb_serial.clone(),
            timeout_secs: config.adb_timeout_secs,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Copy for one-off startup calls, capped at [`STARTUP_TIMEOUT_SECS`].
    pub fn for_startup(&self) -> Self {
        let secs = self
            .timeout_secs
            .map_or(STARTUP_TIMEOUT_SECS, |t| t.min(STARTUP_TIMEOUT_SECS));
        self.clone().with_timeout(secs)
    }

    pub fn adb_path(&self) -> &Path {
        &self.adb_path
    }

    pub async fn ensure_present(&self) -> Result<String> {
        let version = self.run(&["version"]).await?;
        Ok(version.lines().next().unwrap_or_default().to_string())
    }

    pub async fn start_server(&self) -> Result<()> {
        self.run(&["start-server"]).await.map(|_| ())
    }

    fn program_name(&self) -> String {
        self.adb_path.display().to_string()
    }
}

#[async_trait]
impl AdbRunner for AdbClient {
    async fn run(&self, args: &[&str]) -> Result<String> {
        debug!("running {} {}", self.program_name(), args.join(" "));
        let mut cmd = Command::new(&self.adb_path);
        cmd.args(args).kill_on_drop(true);
        let fut = cmd.output();

        let output = match self.timeout_secs {
            Some(secs) => timeout(Duration::from_secs(secs), fut)
                .await
                .map_err(|_| ToolError::TimedOut(secs))?,
            None => fut.await,
        }
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => ToolError::NotFound(self.program_name()),
            _ => ToolError::Io(e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("adb {} exited with {:?}: {}", args.join(" "), output.status.code(), stderr);
            return Err(ToolError::ExecutionFailed {
                code: output.status.code(),
                stderr,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }
}
