// # cfddns-core
//
// Core library for the Cloudflare dynamic DNS reconciler.
//
// ## Architecture Overview
//
// This library keeps one DNS record pointed at the host's public address:
// - **IpResolver**: Trait for discovering the current public IP
// - **DnsProvider**: Trait for fetching, creating and updating the record
// - **Sleeper**: Trait for every wait the loop performs
// - **Reconciler**: Engine that drives resolve → fetch → create/update on
//   an interval, with a bounded retry budget per tick
//
// ## Design Principles
//
// 1. **Configuration once**: `DdnsConfig` is built at startup and passed in
// 2. **Pure decision**: `engine::plan` holds the create/update/no-op logic
// 3. **Single-shot collaborators**: retry and timing live in the engine only
// 4. **Library-First**: the daemon is a thin wrapper around this crate

pub mod traits;
pub mod engine;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{DnsProvider, DnsRecord, IpResolver, RecordPayload, Sleeper, TokioSleeper};
pub use engine::{Action, ReconcileOutcome, Reconciler, TickReport};
pub use config::{DdnsConfig, EngineConfig, RecordType};
pub use error::{Error, Result};
