//! Core traits for the reconciler
//!
//! This module defines the seams between the reconciler and the outside world.
//!
//! - [`IpResolver`]: Discover the current public IP
//! - [`DnsProvider`]: Read and write the managed DNS record
//! - [`Sleeper`]: Suspend between attempts and ticks

pub mod ip_resolver;
pub mod dns_provider;
pub mod sleeper;

pub use ip_resolver::IpResolver;
pub use dns_provider::{DnsProvider, DnsRecord, RecordPayload};
pub use sleeper::{Sleeper, TokioSleeper};
