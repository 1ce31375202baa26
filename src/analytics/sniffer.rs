//! Best-effort visitor environment resolution.
//!
//! Device class comes straight from the User-Agent. IP and country are
//! resolved through external lookup services; every failure mode
//! degrades to a sentinel value so tracking can never block or fail a
//! page.

use anyhow::{Context, Result};
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

use crate::config::TrackingConfig;
use crate::models::{Device, EnvSnapshot};

pub const UNKNOWN_IP: &str = "unknown";
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Resolves the visitor's device, IP and country. One instance per
/// process; the lookup timeout is configured once on the shared client.
pub struct EnvironmentSniffer {
    client: reqwest::Client,
    ip_endpoint: String,
    geo_endpoint: String,
}

impl EnvironmentSniffer {
    pub fn new(config: &TrackingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.lookup_timeout_secs))
            .build()
            .context("failed to build lookup HTTP client")?;

        Ok(Self {
            client,
            ip_endpoint: config.ip_endpoint.clone(),
            geo_endpoint: config.geo_endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve this host's public IP via the configured echo service.
    /// Used only when no client address is available from the request.
    pub async fn public_ip(&self) -> String {
        match self.fetch_json(&self.ip_endpoint).await {
            Ok(body) => body
                .get("ip")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| UNKNOWN_IP.to_string()),
            Err(err) => {
                debug!(error = %err, "public ip lookup failed");
                UNKNOWN_IP.to_string()
            }
        }
    }

    /// Resolve a country name for an IP address, or the Unknown sentinel.
    pub async fn country_for(&self, ip: &str) -> String {
        if ip == UNKNOWN_IP || ip.is_empty() {
            return UNKNOWN_COUNTRY.to_string();
        }

        let url = format!("{}/{}/json/", self.geo_endpoint, ip);
        match self.fetch_json(&url).await {
            Ok(body) => body
                .get("country_name")
                .and_then(|v| v.as_str())
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string()),
            Err(err) => {
                debug!(ip, error = %err, "country lookup failed");
                UNKNOWN_COUNTRY.to_string()
            }
        }
    }

    /// Capture the full environment snapshot for one request.
    pub async fn snapshot(&self, client_ip: Option<IpAddr>, user_agent: &str) -> EnvSnapshot {
        let ip_address = match client_ip {
            Some(ip) => ip.to_string(),
            None => self.public_ip().await,
        };
        let country = self.country_for(&ip_address).await;

        EnvSnapshot {
            ip_address,
            country,
            device: Device::from_user_agent(user_agent),
        }
    }

    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}
