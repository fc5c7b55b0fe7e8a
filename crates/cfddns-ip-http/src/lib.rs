// # HTTP IP Resolver
//
// This crate provides the IP resolver used by the reconciler: a single GET
// against a plain-text IP-echo service (e.g. myip.dnsomatic.com,
// api.ipify.org, icanhazip.com).
//
// ## Behavior
//
// - One request per `resolve()` call; no caching, no polling, no retries
// - Requests are bounded by a 10 second timeout
// - The body is trimmed and parsed as an IP address
// - An optional record type restricts the accepted address family

use cfddns_core::RecordType;
use cfddns_core::traits::IpResolver;
use cfddns_core::{Error, Result};

use std::net::IpAddr;
use std::time::Duration;

/// Request timeout for the echo service
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("cfddns/", env!("CARGO_PKG_VERSION"));

/// HTTP-based IP resolver
#[derive(Debug, Clone)]
pub struct HttpIpResolver {
    /// URL to fetch IP from
    url: String,

    /// Record type whose address family is accepted (None = any)
    record_type: Option<RecordType>,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpResolver {
    /// Create a new HTTP IP resolver
    ///
    /// # Parameters
    ///
    /// - `url`: URL to fetch IP from (e.g., "https://api.ipify.org")
    /// - `record_type`: Only accept addresses usable for this record type
    pub fn new(url: impl Into<String>, record_type: Option<RecordType>) -> Result<Self> {
        Self::with_timeout(url, record_type, DEFAULT_TIMEOUT)
    }

    /// Create with a custom request timeout
    pub fn with_timeout(
        url: impl Into<String>,
        record_type: Option<RecordType>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            record_type,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl IpResolver for HttpIpResolver {
    async fn resolve(&self) -> Result<IpAddr> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::ip_resolution(format!("Request to {} timed out", self.url))
            } else {
                Error::ip_resolution(format!("Request to {} failed: {}", self.url, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            match response.text().await {
                Ok(body) => tracing::debug!("IP echo service returned {}: {}", status, body),
                Err(e) => tracing::debug!(
                    "IP echo service returned {}; body unreadable: {}",
                    status,
                    e
                ),
            }
            return Err(Error::ip_resolution(format!(
                "{} returned HTTP {}",
                self.url, status
            )));
        }

        let ip_text = response
            .text()
            .await
            .map_err(|e| Error::ip_resolution(format!("Failed to read response: {}", e)))?;

        let ip_text = ip_text.trim();
        if ip_text.is_empty() {
            return Err(Error::ip_resolution(format!(
                "{} returned an empty body",
                self.url
            )));
        }

        let ip: IpAddr = ip_text
            .parse()
            .map_err(|_| Error::ip_resolution(format!("Invalid IP address: {}", ip_text)))?;

        if let Some(record_type) = self.record_type
            && !record_type.accepts(&ip)
        {
            return Err(Error::ip_resolution(format!(
                "Expected an address for a {} record, got: {}",
                record_type, ip
            )));
        }

        tracing::debug!("Resolved public IP {} via {}", ip, self.url);
        Ok(ip)
    }

    fn resolver_name(&self) -> &'static str {
        "http"
    }
}
