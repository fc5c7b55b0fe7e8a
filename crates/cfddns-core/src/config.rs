//! Configuration types for the reconciler
//!
//! Configuration is read from the process environment exactly once, at
//! startup, and then passed by value into the reconciler and its
//! collaborators. Nothing re-reads the environment afterwards.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

/// Bearer token for the Cloudflare API
pub const ENV_API_TOKEN: &str = "CLOUDFLARE_APITOKEN";
/// Zone identifier (optional, auto-discovered from the zone name when unset)
pub const ENV_ZONE_ID: &str = "CLOUDFLARE_ZONEID";
/// Zone name, e.g. `example.com`
pub const ENV_ZONE: &str = "CLOUDFLARE_ZONE";
/// Record name relative to the zone, `@` for the apex
pub const ENV_NAME: &str = "CLOUDFLARE_NAME";
/// Record type (`A` or `AAAA`)
pub const ENV_RECORD_TYPE: &str = "CLOUDFLARE_RECORDTYPE";
/// Record TTL in seconds
pub const ENV_RECORD_TTL: &str = "CLOUDFLARE_RECORDTTL";
/// Static IPv4 override for A records
pub const ENV_STATIC_IPV4: &str = "CLOUDFLARE_IPV4";
/// Static IPv6 override for AAAA records
pub const ENV_STATIC_IPV6: &str = "CLOUDFLARE_IPV6";
/// One-time delay before the first tick, in seconds
pub const ENV_DELAY: &str = "CLOUDFLARE_DELAY";
/// Delay between ticks, in seconds
pub const ENV_INTERVAL: &str = "CLOUDFLARE_INTERVAL";
/// Attempts per tick
pub const ENV_TRIES: &str = "CLOUDFLARE_TRIES";
/// IP-echo service URL
pub const ENV_IP_URL: &str = "CLOUDFLARE_IP_URL";
/// Cloudflare API base URL
pub const ENV_API_URL: &str = "CLOUDFLARE_API_URL";
/// `dry-run` or `live`
pub const ENV_MODE: &str = "CLOUDFLARE_MODE";
/// Log level filter
pub const ENV_LOG_LEVEL: &str = "CLOUDFLARE_LOG_LEVEL";

/// Default IP-echo service (plain text body)
pub const DEFAULT_IP_SOURCE_URL: &str = "http://myip.dnsomatic.com/";

/// Cloudflare API v4 base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Local timestamp layout for log lines, e.g. `2024/05/01 12:00:00.123+0200`
pub const LOG_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.3f%z";

/// Record name that denotes the zone apex
pub const APEX_NAME: &str = "@";

/// Zone id value shipped in sample environment files; treated as unset
pub const ZONE_ID_PLACEHOLDER: &str = "Domain Zone ID";

/// Cloudflare's "automatic" TTL
pub const AUTOMATIC_TTL: u32 = 1;

/// DNS record type managed by the reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address record
    #[serde(rename = "A")]
    A,
    /// IPv6 address record
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }

    /// Whether `ip` belongs to the address family of this record type
    pub fn accepts(&self, ip: &IpAddr) -> bool {
        match self {
            RecordType::A => ip.is_ipv4(),
            RecordType::Aaaa => ip.is_ipv6(),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            other => Err(Error::config(format!(
                "{} '{}' is not supported. Supported types: A, AAAA",
                ENV_RECORD_TYPE, other
            ))),
        }
    }
}

/// Main configuration
#[derive(Clone)]
pub struct DdnsConfig {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    pub api_token: String,

    /// Zone ID (None means auto-discover from `zone_name`)
    pub zone_id: Option<String>,

    /// Zone name, e.g. `example.com`
    pub zone_name: String,

    /// Record name relative to the zone
    pub record_name: String,

    /// Record type
    pub record_type: RecordType,

    /// Record TTL in seconds
    pub ttl: u32,

    /// Static IP override; bypasses IP resolution entirely when set
    pub static_ip: Option<String>,

    /// IP-echo service URL
    pub ip_source_url: String,

    /// Cloudflare API base URL
    pub api_base_url: String,

    /// Log writes instead of sending them
    pub dry_run: bool,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Loop timing and retry settings
    pub engine: EngineConfig,
}

// Custom Debug implementation that hides the API token
impl fmt::Debug for DdnsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DdnsConfig")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("zone_name", &self.zone_name)
            .field("record_name", &self.record_name)
            .field("record_type", &self.record_type)
            .field("ttl", &self.ttl)
            .field("static_ip", &self.static_ip)
            .field("ip_source_url", &self.ip_source_url)
            .field("api_base_url", &self.api_base_url)
            .field("dry_run", &self.dry_run)
            .field("log_level", &self.log_level)
            .field("engine", &self.engine)
            .finish()
    }
}

impl DdnsConfig {
    /// Create a configuration with defaults for everything but the
    /// credentials and record identity
    pub fn new(
        api_token: impl Into<String>,
        zone_name: impl Into<String>,
        record_name: impl Into<String>,
    ) -> Self {
        Self {
            api_token: api_token.into(),
            zone_id: None,
            zone_name: zone_name.into(),
            record_name: record_name.into(),
            record_type: RecordType::A,
            ttl: AUTOMATIC_TTL,
            static_ip: None,
            ip_source_url: DEFAULT_IP_SOURCE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            dry_run: false,
            log_level: "info".to_string(),
            engine: EngineConfig::default(),
        }
    }

    /// Set the zone id
    pub fn with_zone_id(mut self, zone_id: impl Into<String>) -> Self {
        self.zone_id = Some(zone_id.into());
        self
    }

    /// Set the record type
    pub fn with_record_type(mut self, record_type: RecordType) -> Self {
        self.record_type = record_type;
        self
    }

    /// Set the record TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set a static IP override
    pub fn with_static_ip(mut self, ip: impl Into<String>) -> Self {
        self.static_ip = Some(ip.into());
        self
    }

    /// Replace the engine settings
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Empty values are treated the same as unset ones. The result is
    /// validated before it is returned.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_token = get(ENV_API_TOKEN).ok_or_else(|| {
            Error::config(format!(
                "{} is required. Set it via: export {}=your_token",
                ENV_API_TOKEN, ENV_API_TOKEN
            ))
        })?;

        let zone_name = get(ENV_ZONE).ok_or_else(|| {
            Error::config(format!(
                "{} is required. Set it via: export {}=example.com",
                ENV_ZONE, ENV_ZONE
            ))
        })?;

        // Unset or empty means the zone apex
        let record_name = get(ENV_NAME).unwrap_or_else(|| APEX_NAME.to_string());

        let zone_id = get(ENV_ZONE_ID).filter(|id| id != ZONE_ID_PLACEHOLDER);

        let record_type = match get(ENV_RECORD_TYPE) {
            Some(value) => value.parse()?,
            None => RecordType::A,
        };

        let static_ip_key = match record_type {
            RecordType::A => ENV_STATIC_IPV4,
            RecordType::Aaaa => ENV_STATIC_IPV6,
        };

        let dry_run = match get(ENV_MODE).map(|m| m.to_lowercase()) {
            None => false,
            Some(mode) if mode == "live" => false,
            Some(mode) if mode == "dry-run" => true,
            Some(mode) => {
                return Err(Error::config(format!(
                    "{} '{}' is not valid. Valid modes: live, dry-run",
                    ENV_MODE, mode
                )));
            }
        };

        let config = Self {
            api_token,
            zone_id,
            zone_name,
            record_name,
            record_type,
            ttl: parse_var(&get, ENV_RECORD_TTL, AUTOMATIC_TTL)?,
            static_ip: get(static_ip_key),
            ip_source_url: get(ENV_IP_URL).unwrap_or_else(|| DEFAULT_IP_SOURCE_URL.to_string()),
            api_base_url: get(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            dry_run,
            log_level: get(ENV_LOG_LEVEL).unwrap_or_else(|| "info".to_string()),
            engine: EngineConfig {
                initial_delay_secs: parse_var(&get, ENV_DELAY, default_initial_delay_secs())?,
                interval_secs: parse_var(&get, ENV_INTERVAL, default_interval_secs())?,
                max_retries: parse_var(&get, ENV_TRIES, default_max_retries())?,
                retry_backoff_secs: default_retry_backoff_secs(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_token.is_empty() {
            return Err(Error::config(format!("{} cannot be empty", ENV_API_TOKEN)));
        }

        validate_domain_name(&self.zone_name)?;
        validate_domain_name(&self.fqdn())?;

        if self.ttl != AUTOMATIC_TTL && !(60..=86400).contains(&self.ttl) {
            return Err(Error::config(format!(
                "{} must be 1 (automatic) or between 60 and 86400 seconds. Got: {}",
                ENV_RECORD_TTL, self.ttl
            )));
        }

        if let Some(ref ip) = self.static_ip {
            let parsed: IpAddr = ip.parse().map_err(|_| {
                Error::config(format!("Static IP override '{}' is not an IP address", ip))
            })?;
            if !self.record_type.accepts(&parsed) {
                return Err(Error::config(format!(
                    "Static IP override {} cannot be used for a {} record",
                    ip, self.record_type
                )));
            }
        }

        for (key, url) in [
            (ENV_IP_URL, &self.ip_source_url),
            (ENV_API_URL, &self.api_base_url),
        ] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(Error::config(format!(
                    "{} must use HTTP or HTTPS scheme. Got: {}",
                    key, url
                )));
            }
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(Error::config(format!(
                    "{} '{}' is not valid. Valid levels: trace, debug, info, warn, error",
                    ENV_LOG_LEVEL, self.log_level
                )));
            }
        }

        self.engine.validate()
    }

    /// Whether the record name denotes the zone apex
    pub fn is_apex(&self) -> bool {
        let name = self.record_name.trim_end_matches('.');
        name.is_empty() || name == APEX_NAME || name.eq_ignore_ascii_case(&self.zone_name)
    }

    /// Fully-qualified record name: `name.zone`, or the bare zone for the apex
    pub fn fqdn(&self) -> String {
        if self.is_apex() {
            self.zone_name.clone()
        } else {
            format!("{}.{}", self.record_name.trim_end_matches('.'), self.zone_name)
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// One-time delay before the first tick (in seconds)
    pub initial_delay_secs: u64,

    /// Delay between ticks (in seconds)
    pub interval_secs: u64,

    /// Maximum attempts per tick
    pub max_retries: usize,

    /// Fixed delay between failed attempts within a tick (in seconds)
    pub retry_backoff_secs: u64,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(Error::config(format!("{} must be at least 1", ENV_TRIES)));
        }
        if self.interval_secs == 0 {
            return Err(Error::config(format!(
                "{} must be at least 1 second",
                ENV_INTERVAL
            )));
        }
        Ok(())
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: default_initial_delay_secs(),
            interval_secs: default_interval_secs(),
            max_retries: default_max_retries(),
            retry_backoff_secs: default_retry_backoff_secs(),
        }
    }
}

fn default_initial_delay_secs() -> u64 {
    0
}

fn default_interval_secs() -> u64 {
    300
}

fn default_max_retries() -> usize {
    3
}

fn default_retry_backoff_secs() -> u64 {
    10
}

fn parse_var<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|e| {
            Error::config(format!("{} must be a non-negative integer. Got '{}': {}", key, raw, e))
        }),
        None => Ok(default),
    }
}

/// Basic RFC 1035 domain name validation
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(Error::config("Domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(Error::config(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        // Underscore is allowed for service-style labels
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::config(format!(
                "Domain label contains invalid characters. Label: '{}'",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}
