use std::future::Future;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Fingerprinting tool '{program}' is not available: {reason}")]
    ToolUnavailable { program: String, reason: String },
    #[error("Fingerprinting tool '{program}' failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("Fingerprinting tool '{program}' timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },
}

/// Produces free-text technology information about a target.
pub trait Detector: Send + Sync {
    fn detect(&self, target: &str) -> impl Future<Output = Result<String, DetectionError>> + Send;
}

pub struct CommandDetectorConfig {
    pub program: String,
    /// Arguments passed to the program; every `{}` is replaced by the target.
    pub args: Vec<String>,
    /// When set, run the program with these arguments first and treat any
    /// failure as the tool being unavailable.
    pub version_args: Option<Vec<String>>,
    pub timeout: Duration,
}

impl Default for CommandDetectorConfig {
    fn default() -> Self {
        Self {
            program: "whatweb".to_string(),
            args: vec!["{}".to_string(), "-v".to_string()],
            version_args: Some(vec!["--version".to_string()]),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Runs an external fingerprinting tool (WhatWeb by default) and returns its
/// stdout.
pub struct CommandDetector {
    config: CommandDetectorConfig,
}

impl CommandDetector {
    pub fn new(config: CommandDetectorConfig) -> Self {
        Self { config }
    }

    fn expand_args(&self, target: &str) -> Vec<String> {
        self.config
            .args
            .iter()
            .map(|arg| arg.replace("{}", target))
            .collect()
    }

    fn unavailable(&self, reason: impl Into<String>) -> DetectionError {
        DetectionError::ToolUnavailable {
            program: self.config.program.clone(),
            reason: reason.into(),
        }
    }

    async fn check_installed(&self, version_args: &[String]) -> Result<(), DetectionError> {
        let output = self
            .run(version_args)
            .await
            .map_err(|e| match e {
                DetectionError::Failed { status, .. } => {
                    self.unavailable(format!("version check exited with {status}"))
                }
                other => other,
            })?;
        log::debug!(
            "{} reports version {}",
            self.config.program,
            String::from_utf8_lossy(&output).trim()
        );
        Ok(())
    }

    async fn run(&self, args: &[String]) -> Result<Vec<u8>, DetectionError> {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == ErrorKind::NotFound || e.kind() == ErrorKind::PermissionDenied {
                self.unavailable(e.to_string())
            } else {
                self.unavailable(format!("failed to spawn: {e}"))
            }
        })?;

        let output = match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(DetectionError::Failed {
                    program: self.config.program.clone(),
                    status: "wait error".to_string(),
                    stderr: e.to_string(),
                });
            }
            Err(_) => {
                log::warn!("{} timed out, killing", self.config.program);
                return Err(DetectionError::Timeout {
                    program: self.config.program.clone(),
                    timeout: self.config.timeout,
                });
            }
        };

        if !output.status.success() {
            let status = match output.status.code() {
                Some(code) => format!("exit code {code}"),
                None => "terminated by signal".to_string(),
            };
            return Err(DetectionError::Failed {
                program: self.config.program.clone(),
                status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

impl Detector for CommandDetector {
    async fn detect(&self, target: &str) -> Result<String, DetectionError> {
        if let Some(version_args) = &self.config.version_args {
            self.check_installed(version_args).await?;
        }
        let args = self.expand_args(target);
        log::info!("Running {} {}", self.config.program, args.join(" "));
        let stdout = self.run(&args).await?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }
}
