//! External collaborator seams: artifact delivery and host process control.
//!
//! Both are traits so flows can be exercised against mocks; the production
//! implementations talk HTTP and the host CLI respectively.

use crate::error::{AdminError, Result};
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tracing::info;

/// Where remote-mode backup artifacts are sent.
pub trait DeliverySink {
    fn deliver(&self, artifact: &Path, display_name: &str, caption: &str) -> Result<()>;
}

/// Posts artifacts to an HTTP endpoint with metadata headers.
pub struct HttpDeliverySink {
    endpoint: String,
    timeout: Duration,
}

impl HttpDeliverySink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        HttpDeliverySink {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl DeliverySink for HttpDeliverySink {
    fn deliver(&self, artifact: &Path, display_name: &str, caption: &str) -> Result<()> {
        let bytes = std::fs::read(artifact)?;
        let total = bytes.len();

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;
        let response = client
            .post(&self.endpoint)
            .header("x-artifact-name", display_name)
            .header("x-artifact-caption", caption)
            .header("content-type", "application/octet-stream")
            .body(bytes)
            .send()?;

        if !response.status().is_success() {
            return Err(AdminError::Delivery(format!(
                "{} rejected {display_name}: {}",
                self.endpoint,
                response.status()
            )));
        }
        info!("Delivered {display_name} ({total} bytes) to {}", self.endpoint);
        Ok(())
    }
}

/// Control surface of the host: service restarts and model switching.
pub trait ProcessControl {
    fn restart(&self, service_name: &str) -> Result<()>;
    fn set_model(&self, full_path: &str) -> Result<()>;
}

/// Drives the host CLI (`openclaw <args>`).
pub struct HostCli {
    program: String,
}

impl HostCli {
    pub fn new(program: impl Into<String>) -> Self {
        HostCli {
            program: program.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<()> {
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| {
                AdminError::Process(format!("failed to spawn {}: {e}", self.program))
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AdminError::Process(format!(
                "{} {} exited with {}: {}",
                self.program,
                args.join(" "),
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl Default for HostCli {
    fn default() -> Self {
        HostCli::new("openclaw")
    }
}

impl ProcessControl for HostCli {
    fn restart(&self, service_name: &str) -> Result<()> {
        info!("Restarting {service_name} via {}", self.program);
        self.run(&[service_name, "restart"])
    }

    fn set_model(&self, full_path: &str) -> Result<()> {
        info!("Switching default model to {full_path}");
        self.run(&["models", "set", full_path])
    }
}
