//! One-shot status poll of the gateway's management API.

use crate::error::Result;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::info;

const POLL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct UsageResponse {
    #[serde(default)]
    usage: UsageStats,
}

#[derive(Debug, Default, Deserialize)]
struct UsageStats {
    #[serde(default)]
    total_requests: u64,
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct AuthFilesResponse {
    #[serde(default)]
    files: Vec<AuthFile>,
}

#[derive(Debug, Deserialize)]
struct AuthFile {
    #[serde(default)]
    status: String,
}

/// Snapshot of the management API's usage and credential state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSummary {
    pub total_requests: u64,
    pub total_tokens: u64,
    pub auth_ready: usize,
    pub auth_total: usize,
}

impl fmt::Display for StatusSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "usage: {} requests, {} tokens | auth: {}/{} ready",
            self.total_requests,
            format_tokens_short(self.total_tokens),
            self.auth_ready,
            self.auth_total
        )
    }
}

pub struct ManagementApi {
    base_url: String,
    key: String,
    timeout: Duration,
}

impl ManagementApi {
    pub fn new(base_url: impl Into<String>, key: impl Into<String>) -> Self {
        ManagementApi {
            base_url: base_url.into(),
            key: key.into(),
            timeout: POLL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Poll `/usage` and `/auth-files` once. Any transport or decode
    /// failure is an error; there is no partial default.
    pub fn fetch_status(&self) -> Result<StatusSummary> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;

        let usage: UsageResponse = client
            .get(format!("{}/usage", self.base_url))
            .bearer_auth(&self.key)
            .send()?
            .error_for_status()?
            .json()?;

        let auth: AuthFilesResponse = client
            .get(format!("{}/auth-files", self.base_url))
            .bearer_auth(&self.key)
            .send()?
            .error_for_status()?
            .json()?;

        let auth_ready = auth
            .files
            .iter()
            .filter(|f| matches!(f.status.as_str(), "active" | "ready"))
            .count();

        let summary = StatusSummary {
            total_requests: usage.usage.total_requests,
            total_tokens: usage.usage.total_tokens,
            auth_ready,
            auth_total: auth.files.len(),
        };
        info!("Management API status: {summary}");
        Ok(summary)
    }
}

/// Compact token rendering for summaries: `999`, `12.3k`, `1.20M`.
pub fn format_tokens_short(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}k", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_tokens_short() {
        assert_eq!(format_tokens_short(0), "0");
        assert_eq!(format_tokens_short(999), "999");
        assert_eq!(format_tokens_short(12_345), "12.3k");
        assert_eq!(format_tokens_short(1_200_000), "1.20M");
    }

    #[test]
    fn test_summary_display() {
        let summary = StatusSummary {
            total_requests: 42,
            total_tokens: 12_345,
            auth_ready: 3,
            auth_total: 4,
        };
        assert_eq!(
            summary.to_string(),
            "usage: 42 requests, 12.3k tokens | auth: 3/4 ready"
        );
    }

    #[test]
    fn test_usage_response_tolerates_missing_fields() {
        let parsed: UsageResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.usage.total_requests, 0);
        let parsed: AuthFilesResponse =
            serde_json::from_str(r#"{"files":[{"status":"ready"},{}]}"#).unwrap();
        assert_eq!(parsed.files.len(), 2);
    }
}
