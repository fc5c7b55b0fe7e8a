// # DNS Provider Trait
//
// Defines the interface for reading and writing the managed DNS record.
//
// ## Implementations
//
// - Cloudflare: `cfddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use cfddns_core::{DnsProvider, RecordPayload, RecordType};
//
// let record = provider.fetch_record("zone", "home.example.com", RecordType::A).await?;
// if record.is_none() {
//     let payload = RecordPayload::new(RecordType::A, "home.example.com", "203.0.113.9", 120);
//     provider.create_record("zone", &payload).await?;
// }
// ```

use crate::config::RecordType;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A DNS record as held by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Provider-specific record id
    pub id: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Fully-qualified record name
    pub name: String,
    /// Record content (the IP address, as text)
    pub content: String,
    /// Time-to-live in seconds
    #[serde(default)]
    pub ttl: u32,
    /// Whether traffic is proxied through the provider
    #[serde(default)]
    pub proxied: bool,
}

/// Body of a create or update request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayload {
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
}

impl RecordPayload {
    /// Build a payload; records managed here are never proxied
    pub fn new(
        record_type: RecordType,
        name: impl Into<String>,
        content: impl Into<String>,
        ttl: u32,
    ) -> Self {
        Self {
            record_type,
            name: name.into(),
            content: content.into(),
            ttl,
            proxied: false,
        }
    }
}

/// Trait for DNS provider implementations
///
/// Each method performs a single remote operation and reports success or
/// failure. A provider reporting non-success in an otherwise valid response
/// is a failure too.
///
/// Providers are stateless and single-shot: they never retry, sleep, or
/// cache, and never decide whether a write is needed. All of that belongs
/// to the [`Reconciler`](crate::engine::Reconciler).
///
/// Every method must fail without touching the network when no API token
/// is configured.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Fetch the record matching `name` and `record_type`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))`: the first matching record
    /// - `Ok(None)`: no record of that name and type exists
    /// - `Err(Error::RecordFetch)`: the lookup failed
    async fn fetch_record(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<DnsRecord>, crate::Error>;

    /// Replace the record `record_id` with `payload`
    ///
    /// Failures are reported as `Error::RecordUpdate`.
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<(), crate::Error>;

    /// Create a new record from `payload`
    ///
    /// Failures are reported as `Error::RecordCreate`.
    async fn create_record(&self, zone_id: &str, payload: &RecordPayload)
    -> Result<(), crate::Error>;

    /// Find the zone id for a zone name
    ///
    /// Only used when no zone id is configured. Failures are reported as
    /// `Error::ZoneLookup`.
    async fn lookup_zone(&self, zone_name: &str) -> Result<String, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;

    /// Whether writes are only logged instead of sent
    fn is_dry_run(&self) -> bool {
        false
    }
}
