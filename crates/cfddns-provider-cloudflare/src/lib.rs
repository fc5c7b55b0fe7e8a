// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare API v4 client used by the reconciler.
//
// ## Behavior
//
// - One HTTP request per trait call
// - Full error propagation; the reconciler owns retries, backoff and timing
// - HTTP timeout configured (30 seconds)
// - Status-specific error messages for 401/403, 404, 409, 429 and 5xx
// - `success: false` in a 2xx envelope is a failure
// - Dry-run mode: reads are real, writes are only logged
// - Never spawns tasks, never caches
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Every call fails without touching the network when the token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=...&name=...`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - List Zones: GET `/zones?name=...`

use async_trait::async_trait;
use cfddns_core::config::DEFAULT_API_BASE_URL;
use cfddns_core::traits::{DnsProvider, DnsRecord, RecordPayload};
use cfddns_core::{DdnsConfig, Error, RecordType, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("cfddns/", env!("CARGO_PKG_VERSION"));

/// Longest slice of a raw error body kept in an error message
const MAX_BODY_IN_ERROR: usize = 512;

/// Standard Cloudflare response envelope
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
    name: String,
}

/// Remote operation, used to pick the error variant
#[derive(Debug, Clone, Copy)]
enum Operation {
    LookupZone,
    Fetch,
    Create,
    Update,
}

impl Operation {
    fn error(self, msg: impl Into<String>) -> Error {
        match self {
            Operation::LookupZone => Error::zone_lookup(msg),
            Operation::Fetch => Error::record_fetch(msg),
            Operation::Create => Error::record_create(msg),
            Operation::Update => Error::record_update(msg),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Operation::LookupZone => "lookup_zone",
            Operation::Fetch => "fetch_record",
            Operation::Create => "create_record",
            Operation::Update => "update_record",
        }
    }
}

/// Cloudflare DNS provider
///
/// Stateless and single-shot. All coordination (retries, backoff,
/// scheduling) is owned by the `Reconciler`.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zone lookup, record lookup)
/// - Log the intended PUT/POST payload
/// - **NOT** actually modify DNS records
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL, without trailing slash
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip writes
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// An empty token is accepted here; every call will then fail before
    /// any request is sent.
    pub fn new(
        api_token: impl Into<String>,
        base_url: impl Into<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token: api_token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            dry_run,
        })
    }

    /// Create a provider against the public API (live mode)
    pub fn new_live(api_token: impl Into<String>) -> Result<Self> {
        Self::new(api_token, DEFAULT_API_BASE_URL, false)
    }

    /// Create a provider against the public API (dry-run mode)
    pub fn new_dry_run(api_token: impl Into<String>) -> Result<Self> {
        Self::new(api_token, DEFAULT_API_BASE_URL, true)
    }

    /// Create a provider from the reconciler configuration
    pub fn from_config(config: &DdnsConfig) -> Result<Self> {
        if config.dry_run {
            tracing::warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
        }
        Self::new(
            config.api_token.clone(),
            config.api_base_url.clone(),
            config.dry_run,
        )
    }

    fn records_url(&self, zone_id: &str) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, zone_id)
    }

    /// Start an authorized request, or fail if no token is configured
    fn request(&self, op: Operation, method: Method, url: &str) -> Result<RequestBuilder> {
        if self.api_token.is_empty() {
            return Err(op.error("Cloudflare API token is not configured"));
        }

        Ok(self
            .client
            .request(method, url)
            .bearer_auth(&self.api_token)
            .header(CONTENT_TYPE, "application/json"))
    }

    /// Send a request and unwrap the Cloudflare envelope
    async fn execute<T: DeserializeOwned>(
        &self,
        op: Operation,
        request: RequestBuilder,
    ) -> Result<Option<T>> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                op.error("HTTP request timed out")
            } else {
                op.error(format!("HTTP request failed: {}", e))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| op.error(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            tracing::debug!(operation = op.name(), "Cloudflare returned {}: {}", status, body);
            return Err(op.error(describe_status(status, &body)));
        }

        let envelope: ApiEnvelope<T> = serde_json::from_str(&body)
            .map_err(|e| op.error(format!("Failed to parse response: {}", e)))?;

        if !envelope.success {
            tracing::debug!(operation = op.name(), "Cloudflare reported failure: {}", body);
            return Err(op.error(format!(
                "Cloudflare reported success=false: {}",
                join_messages(&envelope.errors)
            )));
        }

        Ok(envelope.result)
    }

    fn log_dry_run(&self, method: &str, url: &str, payload: &RecordPayload) {
        tracing::info!(
            "[DRY-RUN] Would send {} request to {} with payload: {}",
            method,
            url,
            serde_json::to_string(payload).unwrap_or_default()
        );
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?type=A&name=home.example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn fetch_record(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<DnsRecord>> {
        let op = Operation::Fetch;
        tracing::debug!("Looking up record {} (type: {})", name, record_type);

        let request = self
            .request(op, Method::GET, &self.records_url(zone_id))?
            .query(&[("type", record_type.as_str()), ("name", name)]);

        let records: Vec<DnsRecord> = self.execute(op, request).await?.unwrap_or_default();

        let record = records.into_iter().next();
        match record {
            Some(ref r) => tracing::debug!("Found record {} with content {}", r.id, r.content),
            None => tracing::debug!("No {} record named {}", record_type, name),
        }
        Ok(record)
    }

    /// # API Call
    ///
    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// {"type": "A", "name": "...", "content": "1.2.3.4", "ttl": 120, "proxied": false}
    /// ```
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<()> {
        let op = Operation::Update;
        let url = format!("{}/{}", self.records_url(zone_id), record_id);
        let request = self.request(op, Method::PUT, &url)?;

        if self.dry_run {
            self.log_dry_run("PUT", &url, payload);
            return Ok(());
        }

        self.execute::<serde_json::Value>(op, request.json(payload))
            .await?;
        Ok(())
    }

    /// # API Call
    ///
    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// {"type": "A", "name": "...", "content": "1.2.3.4", "ttl": 120, "proxied": false}
    /// ```
    async fn create_record(&self, zone_id: &str, payload: &RecordPayload) -> Result<()> {
        let op = Operation::Create;
        let url = self.records_url(zone_id);
        let request = self.request(op, Method::POST, &url)?;

        if self.dry_run {
            self.log_dry_run("POST", &url, payload);
            return Ok(());
        }

        self.execute::<serde_json::Value>(op, request.json(payload))
            .await?;
        Ok(())
    }

    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn lookup_zone(&self, zone_name: &str) -> Result<String> {
        let op = Operation::LookupZone;
        tracing::debug!("Looking up zone ID for domain: {}", zone_name);

        let url = format!("{}/zones", self.base_url);
        let request = self
            .request(op, Method::GET, &url)?
            .query(&[("name", zone_name)]);

        let zones: Vec<Zone> = self.execute(op, request).await?.unwrap_or_default();

        zones
            .into_iter()
            .find(|zone| zone.name.eq_ignore_ascii_case(zone_name))
            .map(|zone| zone.id)
            .ok_or_else(|| {
                op.error(format!(
                    "Zone not found: {} (check the zone name and token permissions)",
                    zone_name
                ))
            })
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Human-readable reason for a non-2xx response, including the body
fn describe_status(status: StatusCode, body: &str) -> String {
    let detail = match serde_json::from_str::<ApiEnvelope<serde_json::Value>>(body) {
        Ok(envelope) if !envelope.errors.is_empty() => join_messages(&envelope.errors),
        _ => truncate(body.trim(), MAX_BODY_IN_ERROR).to_string(),
    };

    let reason = match status.as_u16() {
        401 | 403 => "Authentication failed: invalid API token or insufficient permissions",
        404 => "Not found: check the zone id and record id",
        409 => "Conflict: record is being modified concurrently",
        429 => "Rate limit exceeded",
        500..=599 => "Cloudflare server error (transient)",
        _ => "Unexpected response",
    };

    if detail.is_empty() {
        format!("{}. Status: {}", reason, status)
    } else {
        format!("{}. Status: {} - {}", reason, status, detail)
    }
}

fn join_messages(messages: &[ApiMessage]) -> String {
    if messages.is_empty() {
        return "no error details".to_string();
    }
    messages
        .iter()
        .map(|m| format!("[{}] {}", m.code, m.message))
        .collect::<Vec<_>>()
        .join("; ")
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
