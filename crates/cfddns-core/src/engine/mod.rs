//! Core reconciliation engine
//!
//! The Reconciler is responsible for:
//! - Determining the current public IP (static override or IpResolver)
//! - Fetching the managed record from the DnsProvider
//! - Creating or updating the record when it is missing or stale
//! - Retrying failed attempts within a tick, then waiting for the next tick
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐        ┌──────────────┐        ┌─────────────┐
//! │ IpResolver  │◀─read──│  Reconciler  │──r/w──▶│ DnsProvider │
//! └─────────────┘        └──────────────┘        └─────────────┘
//!                               │
//!                               ▼
//!                        ┌──────────────┐
//!                        │   Sleeper    │
//!                        └──────────────┘
//! ```
//!
//! ## Tick Flow
//!
//! 1. Resolve the current IP
//! 2. Fetch the record for the configured name and type
//! 3. [`plan`] decides: create, update, or nothing
//! 4. On failure, back off and retry until the per-tick budget is spent
//! 5. Sleep for the poll interval

use crate::config::DdnsConfig;
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, DnsRecord, IpResolver, RecordPayload, Sleeper, TokioSleeper};
use std::future::Future;
use std::net::IpAddr;
use tracing::{debug, error, info};

/// What a single attempt should do with the remote record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No record exists; create one
    Create,
    /// The record exists but points elsewhere
    Update {
        record_id: String,
        previous: String,
    },
    /// The record already holds the current IP
    Noop,
}

/// Decide what to do with `record` given the observed `current_ip`
///
/// Pure function; performs no I/O.
pub fn plan(record: Option<&DnsRecord>, current_ip: &str) -> Action {
    match record {
        None => Action::Create,
        Some(record) if same_address(&record.content, current_ip) => Action::Noop,
        Some(record) => Action::Update {
            record_id: record.id.clone(),
            previous: record.content.clone(),
        },
    }
}

// Textual equality, or equality of the parsed addresses so that differently
// formatted IPv6 literals still match.
fn same_address(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    if a == b {
        return true;
    }
    match (a.parse::<IpAddr>(), b.parse::<IpAddr>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Result of one successful attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Record already matched; no write was issued
    Unchanged { ip: String },
    /// Record was missing and has been created
    Created { ip: String },
    /// Record was stale and has been updated
    Updated { ip: String, previous: String },
}

impl ReconcileOutcome {
    /// The address the record now holds
    pub fn ip(&self) -> &str {
        match self {
            ReconcileOutcome::Unchanged { ip }
            | ReconcileOutcome::Created { ip }
            | ReconcileOutcome::Updated { ip, .. } => ip,
        }
    }

    /// Whether a write call was made
    pub fn wrote(&self) -> bool {
        !matches!(self, ReconcileOutcome::Unchanged { .. })
    }
}

/// Summary of one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Attempts made, including the successful one
    pub attempts: usize,
    /// Outcome of the successful attempt, if any
    pub outcome: Option<ReconcileOutcome>,
    /// Error of the last failed attempt, if any
    pub last_error: Option<Error>,
}

impl TickReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Core reconciler
///
/// Owns the immutable configuration and the collaborators, and drives the
/// resolve → fetch → reconcile sequence on every tick.
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Start with [`Reconciler::run_until()`]
/// 3. The loop runs until the shutdown future completes; it never stops on
///    its own, whatever the remote services do
pub struct Reconciler {
    config: DdnsConfig,

    resolver: Box<dyn IpResolver>,

    provider: Box<dyn DnsProvider>,

    sleeper: Box<dyn Sleeper>,

    /// Fully-qualified record name, computed once
    fqdn: String,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// The configuration is validated here; an invalid configuration is the
    /// only error this type ever returns.
    pub fn new(
        config: DdnsConfig,
        resolver: Box<dyn IpResolver>,
        provider: Box<dyn DnsProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let fqdn = config.fqdn();

        Ok(Self {
            config,
            resolver,
            provider,
            sleeper: Box::new(TokioSleeper),
            fqdn,
        })
    }

    /// Replace the sleeper
    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &DdnsConfig {
        &self.config
    }

    /// Fully-qualified name of the managed record
    pub fn fqdn(&self) -> &str {
        &self.fqdn
    }

    /// Run the reconciliation loop until `shutdown` completes
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            "Managing {} record {} via {} (interval {}s, {} attempt(s) per tick)",
            self.config.record_type,
            self.fqdn,
            self.provider.provider_name(),
            self.config.engine.interval_secs,
            self.config.engine.max_retries
        );

        tokio::select! {
            _ = self.run_forever() => {}
            _ = &mut shutdown => {
                info!("Shutdown signal received");
            }
        }

        info!("Reconciler stopped");
    }

    /// Run the reconciliation loop forever
    pub async fn run(&self) {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Run the loop until `shutdown_rx` fires or its sender is dropped
    pub async fn run_with_shutdown(&self, shutdown_rx: tokio::sync::oneshot::Receiver<()>) {
        self.run_until(async {
            let _ = shutdown_rx.await;
        })
        .await
    }

    async fn run_forever(&self) {
        let initial_delay = self.config.engine.initial_delay();
        if !initial_delay.is_zero() {
            info!("Started with a {}-second delay", initial_delay.as_secs());
            self.sleeper.sleep(initial_delay).await;
        }

        let interval = self.config.engine.interval();
        loop {
            self.run_tick().await;
            debug!("Next tick in {}s", interval.as_secs());
            self.sleeper.sleep(interval).await;
        }
    }

    /// Run one tick: attempt reconciliation until it succeeds or the retry
    /// budget is spent
    ///
    /// Failed attempts are separated by the fixed retry backoff. The tick
    /// itself never fails; the report says how it went.
    pub async fn run_tick(&self) -> TickReport {
        let max_retries = self.config.engine.max_retries;
        let backoff = self.config.engine.retry_backoff();

        let mut failures = 0;
        let mut last_error = None;

        while failures < max_retries {
            match self.reconcile_once().await {
                Ok(outcome) => {
                    self.log_outcome(&outcome);
                    return TickReport {
                        attempts: failures + 1,
                        outcome: Some(outcome),
                        last_error: None,
                    };
                }
                Err(e) => {
                    failures += 1;
                    error!(
                        operation = e.operation(),
                        "Attempt {}/{} for {} failed: {}",
                        failures,
                        max_retries,
                        self.fqdn,
                        e
                    );
                    last_error = Some(e);

                    if failures < max_retries {
                        self.sleeper.sleep(backoff).await;
                    }
                }
            }
        }

        error!(
            "Giving up on {} for this tick after {} failed attempt(s)",
            self.fqdn, failures
        );

        TickReport {
            attempts: failures,
            outcome: None,
            last_error,
        }
    }

    /// Perform a single reconciliation attempt
    ///
    /// The IP and the record used for the decision are both observed within
    /// this call.
    pub async fn reconcile_once(&self) -> Result<ReconcileOutcome> {
        let current_ip = self.current_ip().await?;
        let zone_id = self.zone_id().await?;

        let record = self
            .provider
            .fetch_record(&zone_id, &self.fqdn, self.config.record_type)
            .await?;

        match plan(record.as_ref(), &current_ip) {
            Action::Noop => Ok(ReconcileOutcome::Unchanged { ip: current_ip }),
            Action::Create => {
                let payload = self.payload(&current_ip);
                self.provider.create_record(&zone_id, &payload).await?;
                Ok(ReconcileOutcome::Created { ip: current_ip })
            }
            Action::Update {
                record_id,
                previous,
            } => {
                let payload = self.payload(&current_ip);
                self.provider
                    .update_record(&zone_id, &record_id, &payload)
                    .await?;
                Ok(ReconcileOutcome::Updated {
                    ip: current_ip,
                    previous,
                })
            }
        }
    }

    async fn current_ip(&self) -> Result<String> {
        if let Some(ip) = self.config.static_ip.as_deref().filter(|ip| !ip.is_empty()) {
            debug!("Using static IP override {}", ip);
            return Ok(ip.to_string());
        }

        let ip = self.resolver.resolve().await.map_err(|e| match e {
            Error::IpResolution(_) => e,
            other => Error::ip_resolution(other.to_string()),
        })?;

        if !self.config.record_type.accepts(&ip) {
            return Err(Error::ip_resolution(format!(
                "{} returned {}, which cannot be used for a {} record",
                self.resolver.resolver_name(),
                ip,
                self.config.record_type
            )));
        }

        Ok(ip.to_string())
    }

    async fn zone_id(&self) -> Result<String> {
        match self.config.zone_id {
            Some(ref zone_id) => Ok(zone_id.clone()),
            None => {
                let zone_id = self.provider.lookup_zone(&self.config.zone_name).await?;
                debug!("Zone id for {} is {}", self.config.zone_name, zone_id);
                Ok(zone_id)
            }
        }
    }

    fn payload(&self, content: &str) -> RecordPayload {
        RecordPayload::new(
            self.config.record_type,
            self.fqdn.clone(),
            content,
            self.config.ttl,
        )
    }

    fn log_outcome(&self, outcome: &ReconcileOutcome) {
        // Dry-run providers accept writes without sending them
        let verb = |live: &'static str, dry: &'static str| {
            if self.provider.is_dry_run() { dry } else { live }
        };

        match outcome {
            ReconcileOutcome::Unchanged { ip } => {
                info!("{} already points at {}, nothing to do", self.fqdn, ip);
            }
            ReconcileOutcome::Created { ip } => {
                info!(
                    "{} {} record {} -> {}",
                    verb("Created", "[DRY-RUN] Would create"),
                    self.config.record_type,
                    self.fqdn,
                    ip
                );
            }
            ReconcileOutcome::Updated { ip, previous } => {
                info!(
                    "{} {} record {} -> {} (was {})",
                    verb("Updated", "[DRY-RUN] Would update"),
                    self.config.record_type,
                    self.fqdn,
                    ip,
                    previous
                );
            }
        }
    }
}
