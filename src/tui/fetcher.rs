//! HTTP client for the dashboard snapshot endpoint

use anyhow::Result;
use reqwest::Client;

use crate::dashboard::DashboardSnapshot;

pub struct SnapshotFetcher {
    client: Client,
    url: String,
}

impl SnapshotFetcher {
    /// `url` is the full endpoint, e.g. `http://localhost:3000/api/metrics`
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch one snapshot
    ///
    /// On a non-2xx response the server's `error`/`details` fields are
    /// surfaced when present.
    pub async fn fetch(&self) -> Result<DashboardSnapshot> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to fetch snapshot: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            match (body["error"].as_str(), body["details"].as_str()) {
                (Some(error), Some(details)) => anyhow::bail!("{} ({}): {}", error, status, details),
                (Some(error), None) => anyhow::bail!("{} ({})", error, status),
                _ => anyhow::bail!("Failed to fetch snapshot: HTTP {}", status),
            }
        }

        let snapshot = response
            .json::<DashboardSnapshot>()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to decode snapshot: {}", e))?;

        Ok(snapshot)
    }
}

/// Snapshot endpoint for a server address
pub fn snapshot_url(host: &str, port: u16) -> String {
    // 0.0.0.0 is a bind address, not a destination
    let host = if host == "0.0.0.0" { "127.0.0.1" } else { host };
    format!("http://{}:{}/api/metrics", host, port)
}
