//! Contract Test: Create / Update / No-op Decision
//!
//! Constraints verified:
//! - A record already holding the current IP causes zero writes
//! - A stale record causes exactly one update with the new content
//! - A missing record causes exactly one create
//! - A static IP override means the resolver is never called
//! - A dry-run provider's writes are logged as intended, not as done
//!
//! If this test fails, the reconciler may write when it should not, or
//! leave the record stale.

mod common;

use cfddns_core::{Error, RecordPayload, RecordType, ReconcileOutcome, Reconciler};
use common::*;
use tokio_test::{assert_err, assert_ok};

fn reconciler(
    config: cfddns_core::DdnsConfig,
    resolver: &MockIpResolver,
    provider: &MockDnsProvider,
) -> Reconciler {
    Reconciler::new(config, Box::new(resolver.clone()), Box::new(provider.clone()))
        .expect("engine construction succeeds")
        .with_sleeper(Box::new(RecordingSleeper::instant()))
}

#[tokio::test]
async fn matching_record_issues_no_writes() {
    let resolver = MockIpResolver::returning(CURRENT_IP);
    let provider = MockDnsProvider::with_record(a_record("rec1", CURRENT_IP));
    let engine = reconciler(example_config(), &resolver, &provider);

    let report = engine.run_tick().await;

    assert!(report.is_success());
    assert_eq!(report.attempts, 1);
    assert_eq!(
        report.outcome,
        Some(ReconcileOutcome::Unchanged {
            ip: CURRENT_IP.to_string()
        })
    );
    assert_eq!(provider.write_count(), 0, "no-op tick must not write");
}

#[tokio::test]
async fn stale_record_is_updated_once() {
    let resolver = MockIpResolver::returning(CURRENT_IP);
    let provider = MockDnsProvider::with_record(a_record("rec1", STALE_IP));
    let engine = reconciler(example_config(), &resolver, &provider);

    let report = engine.run_tick().await;

    assert!(report.is_success());
    assert_eq!(report.attempts, 1);
    assert_eq!(
        provider.updates(),
        vec![(
            ZONE_ID.to_string(),
            "rec1".to_string(),
            RecordPayload::new(RecordType::A, "home.example.com", CURRENT_IP, 120),
        )]
    );
    assert!(provider.creates().is_empty());
    assert_eq!(
        report.outcome,
        Some(ReconcileOutcome::Updated {
            ip: CURRENT_IP.to_string(),
            previous: STALE_IP.to_string(),
        })
    );
}

#[tokio::test]
async fn missing_record_is_created_once() {
    let resolver = MockIpResolver::returning(CURRENT_IP);
    let provider = MockDnsProvider::empty();
    let engine = reconciler(example_config(), &resolver, &provider);

    let report = engine.run_tick().await;

    assert!(report.is_success());
    assert_eq!(
        provider.creates(),
        vec![(
            ZONE_ID.to_string(),
            RecordPayload::new(RecordType::A, "home.example.com", CURRENT_IP, 120),
        )]
    );
    assert!(provider.updates().is_empty());
}

#[tokio::test]
async fn fetch_uses_configured_name_and_type() {
    let resolver = MockIpResolver::returning(CURRENT_IP);
    let provider = MockDnsProvider::empty();
    let engine = reconciler(example_config(), &resolver, &provider);

    assert_ok!(engine.reconcile_once().await);

    assert_eq!(
        provider.fetches(),
        vec![(
            ZONE_ID.to_string(),
            "home.example.com".to_string(),
            RecordType::A
        )]
    );
}

#[tokio::test]
async fn second_tick_after_update_is_a_noop() {
    let resolver = MockIpResolver::returning(CURRENT_IP);
    let provider = MockDnsProvider::with_record(a_record("rec1", STALE_IP));
    let engine = reconciler(example_config(), &resolver, &provider);

    engine.run_tick().await;
    let report = engine.run_tick().await;

    assert!(matches!(
        report.outcome,
        Some(ReconcileOutcome::Unchanged { .. })
    ));
    assert_eq!(provider.updates().len(), 1);
}

#[tokio::test]
async fn static_override_bypasses_resolver() {
    let resolver = MockIpResolver::failing("resolver must not be called");
    let provider = MockDnsProvider::with_record(a_record("rec1", STALE_IP));
    let config = example_config().with_static_ip("198.51.100.7");
    let engine = reconciler(config, &resolver, &provider);

    let outcome = assert_ok!(engine.reconcile_once().await);

    assert_eq!(resolver.calls(), 0);
    assert_eq!(outcome.ip(), "198.51.100.7");
    assert_eq!(provider.updates()[0].2.content, "198.51.100.7");
}

#[tokio::test]
async fn static_override_bypasses_resolver_when_record_missing() {
    let resolver = MockIpResolver::returning(CURRENT_IP);
    let provider = MockDnsProvider::empty();
    let config = example_config().with_static_ip("198.51.100.7");
    let engine = reconciler(config, &resolver, &provider);

    engine.run_tick().await;

    assert_eq!(resolver.calls(), 0);
    assert_eq!(provider.creates()[0].1.content, "198.51.100.7");
}

#[tokio::test]
async fn zone_is_discovered_when_not_configured() {
    let resolver = MockIpResolver::returning(CURRENT_IP);
    let provider = MockDnsProvider::empty();
    let mut config = example_config();
    config.zone_id = None;
    let engine = reconciler(config, &resolver, &provider);

    assert_ok!(engine.reconcile_once().await);

    assert_eq!(provider.zone_lookups(), vec!["example.com".to_string()]);
    assert_eq!(provider.creates()[0].0, "discovered-zone");
}

#[tokio::test]
async fn configured_zone_skips_discovery() {
    let resolver = MockIpResolver::returning(CURRENT_IP);
    let provider = MockDnsProvider::with_record(a_record("rec1", CURRENT_IP));
    let engine = reconciler(example_config(), &resolver, &provider);

    assert_ok!(engine.reconcile_once().await);

    assert!(provider.zone_lookups().is_empty());
}

#[tokio::test]
async fn wrong_address_family_is_a_resolution_failure() {
    let resolver = MockIpResolver::returning("2001:db8::9");
    let provider = MockDnsProvider::empty();
    let engine = reconciler(example_config(), &resolver, &provider);

    let err = assert_err!(engine.reconcile_once().await);

    assert!(matches!(err, Error::IpResolution(_)));
    assert!(provider.fetches().is_empty(), "no fetch without a usable IP");
}

#[tokio::test]
async fn apex_record_uses_bare_zone_name() {
    let resolver = MockIpResolver::returning(CURRENT_IP);
    let provider = MockDnsProvider::empty();
    let mut config = example_config();
    config.record_name = "@".to_string();
    let engine = reconciler(config, &resolver, &provider);

    assert_eq!(engine.fqdn(), "example.com");
    assert_ok!(engine.reconcile_once().await);
    assert_eq!(provider.creates()[0].1.name, "example.com");
}

#[tokio::test]
async fn invalid_config_is_rejected_at_construction() {
    let mut config = example_config();
    config.api_token = String::new();

    let result = Reconciler::new(
        config,
        Box::new(MockIpResolver::returning(CURRENT_IP)),
        Box::new(MockDnsProvider::empty()),
    );

    assert!(matches!(result, Err(Error::Config(_))));
}

#[tokio::test]
async fn dry_run_outcome_is_logged_as_intent() {
    let logs = LogCapture::default();
    let _guard = logs.install();

    let resolver = MockIpResolver::returning(CURRENT_IP);
    let stale = MockDnsProvider::with_record(a_record("rec1", STALE_IP)).dry_run();
    let missing = MockDnsProvider::empty().dry_run();

    assert!(reconciler(example_config(), &resolver, &stale).run_tick().await.is_success());
    assert!(reconciler(example_config(), &resolver, &missing).run_tick().await.is_success());

    let info = logs.lines_at("INFO");
    assert!(info.iter().any(|l| l.contains("[DRY-RUN] Would update A record home.example.com")));
    assert!(info.iter().any(|l| l.contains("[DRY-RUN] Would create A record home.example.com")));
    assert!(
        !info.iter().any(|l| l.contains("Updated A record") || l.contains("Created A record")),
        "dry-run must not claim a write: {:#?}",
        info
    );
}

#[tokio::test]
async fn live_outcome_is_logged_as_done() {
    let logs = LogCapture::default();
    let _guard = logs.install();

    let resolver = MockIpResolver::returning(CURRENT_IP);
    let provider = MockDnsProvider::with_record(a_record("rec1", STALE_IP));

    assert!(reconciler(example_config(), &resolver, &provider).run_tick().await.is_success());

    let info = logs.lines_at("INFO");
    assert!(info.iter().any(|l| l.contains("Updated A record home.example.com")));
    assert!(!info.iter().any(|l| l.contains("DRY-RUN")));
}
