// # IP Resolver Trait
//
// Defines the interface for discovering the host's current public address.
//
// ## Implementations
//
// - HTTP IP-echo service: `cfddns-ip-http` crate
//
// The reconciler bypasses the resolver entirely when a static IP override
// is configured.

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for IP resolver implementations
///
/// Implementations must bound every lookup with a timeout so a hung
/// upstream only costs one attempt. A timeout, a non-success response or an
/// unparsable body is reported as `Error::IpResolution`.
///
/// Resolvers are observers: no retries, no sleeping, no caching between
/// calls.
#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Resolve the current public IP address
    async fn resolve(&self) -> Result<IpAddr, crate::Error>;

    /// Short name of the resolver (for logging/debugging)
    fn resolver_name(&self) -> &'static str;
}
