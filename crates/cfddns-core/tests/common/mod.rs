//! Test doubles and common utilities for reconciler contract tests
//!
//! The doubles are cheap to clone; clones share their call logs, so a test
//! can hand one clone to the reconciler and inspect the other.

#![allow(dead_code)]

use cfddns_core::error::{Error, Result};
use cfddns_core::config::LOG_TIME_FORMAT;
use cfddns_core::traits::{DnsProvider, DnsRecord, IpResolver, RecordPayload, Sleeper};
use cfddns_core::{DdnsConfig, EngineConfig, RecordType};
use std::collections::VecDeque;
use std::io;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ZONE_ID: &str = "Z";
pub const CURRENT_IP: &str = "203.0.113.9";
pub const STALE_IP: &str = "203.0.113.1";

/// Config from the worked example: home.example.com, A, ttl 120, 3 tries
pub fn example_config() -> DdnsConfig {
    DdnsConfig::new("cf-test-token", "example.com", "home")
        .with_zone_id(ZONE_ID)
        .with_ttl(120)
        .with_engine(EngineConfig {
            initial_delay_secs: 0,
            interval_secs: 300,
            max_retries: 3,
            retry_backoff_secs: 10,
        })
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

pub fn a_record(id: &str, content: &str) -> DnsRecord {
    DnsRecord {
        id: id.to_string(),
        record_type: RecordType::A,
        name: "home.example.com".to_string(),
        content: content.to_string(),
        ttl: 120,
        proxied: false,
    }
}

/// Resolver that replays scripted answers, repeating the last one
#[derive(Clone)]
pub struct MockIpResolver {
    answers: Arc<Mutex<VecDeque<Result<IpAddr>>>>,
    calls: Arc<AtomicUsize>,
}

impl MockIpResolver {
    pub fn returning(addr: &str) -> Self {
        Self::sequence(vec![Ok(ip(addr))])
    }

    pub fn failing(msg: &str) -> Self {
        Self::sequence(vec![Err(Error::ip_resolution(msg))])
    }

    pub fn sequence(answers: Vec<Result<IpAddr>>) -> Self {
        Self {
            answers: Arc::new(Mutex::new(answers.into())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpResolver for MockIpResolver {
    async fn resolve(&self) -> Result<IpAddr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut answers = self.answers.lock().unwrap();
        if answers.len() > 1 {
            answers.pop_front().unwrap()
        } else {
            answers.front().cloned().unwrap()
        }
    }

    fn resolver_name(&self) -> &'static str {
        "mock"
    }
}

#[derive(Default)]
struct ProviderState {
    record: Option<DnsRecord>,
    fetch_failures_left: usize,
    fail_writes: bool,
    dry_run: bool,
    fetches: Vec<(String, String, RecordType)>,
    updates: Vec<(String, String, RecordPayload)>,
    creates: Vec<(String, RecordPayload)>,
    zone_lookups: Vec<String>,
}

/// In-memory provider that records every call
#[derive(Clone, Default)]
pub struct MockDnsProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl MockDnsProvider {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_record(record: DnsRecord) -> Self {
        let provider = Self::default();
        provider.state.lock().unwrap().record = Some(record);
        provider
    }

    /// Fail the next `n` fetches
    pub fn failing_fetches(self, n: usize) -> Self {
        self.state.lock().unwrap().fetch_failures_left = n;
        self
    }

    /// Fail every create and update
    pub fn failing_writes(self) -> Self {
        self.state.lock().unwrap().fail_writes = true;
        self
    }

    /// Report dry-run mode; calls are still recorded
    pub fn dry_run(self) -> Self {
        self.state.lock().unwrap().dry_run = true;
        self
    }

    pub fn fetches(&self) -> Vec<(String, String, RecordType)> {
        self.state.lock().unwrap().fetches.clone()
    }

    pub fn updates(&self) -> Vec<(String, String, RecordPayload)> {
        self.state.lock().unwrap().updates.clone()
    }

    pub fn creates(&self) -> Vec<(String, RecordPayload)> {
        self.state.lock().unwrap().creates.clone()
    }

    pub fn zone_lookups(&self) -> Vec<String> {
        self.state.lock().unwrap().zone_lookups.clone()
    }

    pub fn write_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.updates.len() + state.creates.len()
    }

    pub fn current_record(&self) -> Option<DnsRecord> {
        self.state.lock().unwrap().record.clone()
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn fetch_record(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<DnsRecord>> {
        let mut state = self.state.lock().unwrap();
        state
            .fetches
            .push((zone_id.to_string(), name.to_string(), record_type));

        if state.fetch_failures_left > 0 {
            state.fetch_failures_left -= 1;
            return Err(Error::record_fetch("HTTP 503 Service Unavailable"));
        }

        Ok(state.record.clone())
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .updates
            .push((zone_id.to_string(), record_id.to_string(), payload.clone()));

        if state.fail_writes {
            return Err(Error::record_update("success=false: record is locked"));
        }

        if let Some(record) = state.record.as_mut() {
            record.content = payload.content.clone();
        }
        Ok(())
    }

    async fn create_record(&self, zone_id: &str, payload: &RecordPayload) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.creates.push((zone_id.to_string(), payload.clone()));

        if state.fail_writes {
            return Err(Error::record_create("HTTP 400 Bad Request"));
        }

        state.record = Some(DnsRecord {
            id: "created".to_string(),
            record_type: payload.record_type,
            name: payload.name.clone(),
            content: payload.content.clone(),
            ttl: payload.ttl,
            proxied: payload.proxied,
        });
        Ok(())
    }

    async fn lookup_zone(&self, zone_name: &str) -> Result<String> {
        self.state
            .lock()
            .unwrap()
            .zone_lookups
            .push(zone_name.to_string());
        Ok("discovered-zone".to_string())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }

    fn is_dry_run(&self) -> bool {
        self.state.lock().unwrap().dry_run
    }
}

/// Sleeper that records requested durations
#[derive(Clone)]
pub struct RecordingSleeper {
    sleeps: Arc<Mutex<Vec<Duration>>>,
    use_tokio_clock: bool,
}

impl RecordingSleeper {
    /// Return immediately after recording
    pub fn instant() -> Self {
        Self {
            sleeps: Arc::new(Mutex::new(Vec::new())),
            use_tokio_clock: false,
        }
    }

    /// Record, then sleep on the tokio clock (pair with a paused runtime)
    pub fn on_tokio_clock() -> Self {
        Self {
            sleeps: Arc::new(Mutex::new(Vec::new())),
            use_tokio_clock: true,
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        if self.use_tokio_clock {
            tokio::time::sleep(duration).await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}

/// In-memory log sink, formatted the way the daemon formats its output
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Route events on the current thread here until the guard is dropped
    ///
    /// Only valid with the current-thread runtime `#[tokio::test]` uses.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(
                LOG_TIME_FORMAT.to_string(),
            ))
            .with_target(false)
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.buf.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Lines whose level column equals `level`, e.g. "ERROR"
    pub fn lines_at(&self, level: &str) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|line| line.split_whitespace().nth(2) == Some(level))
            .collect()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Whether `line` starts with `YYYY/MM/DD HH:MM:SS.mmm±zzzz`
pub fn has_local_timestamp(line: &str) -> bool {
    let b = line.as_bytes();
    if b.len() < 29 {
        return false;
    }
    let digits = |range: std::ops::Range<usize>| b[range].iter().all(u8::is_ascii_digit);
    digits(0..4)
        && b[4] == b'/'
        && digits(5..7)
        && b[7] == b'/'
        && digits(8..10)
        && b[10] == b' '
        && digits(11..13)
        && b[13] == b':'
        && digits(14..16)
        && b[16] == b':'
        && digits(17..19)
        && b[19] == b'.'
        && digits(20..23)
        && (b[23] == b'+' || b[23] == b'-')
        && digits(24..28)
        && b[28] == b' '
}
