//! Error types for the reconciler
//!
//! Every failure the reconciler can observe maps to one of these variants.
//! Only [`Error::Config`] is fatal, and only at startup; everything else is
//! counted against the per-tick retry budget.

use thiserror::Error;

/// Result type alias for reconciler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The public IP could not be determined
    #[error("IP resolution failed: {0}")]
    IpResolution(String),

    /// The zone id could not be discovered from the zone name
    #[error("Zone lookup failed: {0}")]
    ZoneLookup(String),

    /// The existing record could not be fetched
    #[error("Record fetch failed: {0}")]
    RecordFetch(String),

    /// The record could not be created
    #[error("Record create failed: {0}")]
    RecordCreate(String),

    /// The record could not be updated
    #[error("Record update failed: {0}")]
    RecordUpdate(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an IP resolution error
    pub fn ip_resolution(msg: impl Into<String>) -> Self {
        Self::IpResolution(msg.into())
    }

    /// Create a zone lookup error
    pub fn zone_lookup(msg: impl Into<String>) -> Self {
        Self::ZoneLookup(msg.into())
    }

    /// Create a record fetch error
    pub fn record_fetch(msg: impl Into<String>) -> Self {
        Self::RecordFetch(msg.into())
    }

    /// Create a record create error
    pub fn record_create(msg: impl Into<String>) -> Self {
        Self::RecordCreate(msg.into())
    }

    /// Create a record update error
    pub fn record_update(msg: impl Into<String>) -> Self {
        Self::RecordUpdate(msg.into())
    }

    /// Short name of the step that failed, used in log lines
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::IpResolution(_) => "resolve_ip",
            Self::ZoneLookup(_) => "lookup_zone",
            Self::RecordFetch(_) => "fetch_record",
            Self::RecordCreate(_) => "create_record",
            Self::RecordUpdate(_) => "update_record",
            Self::Other(_) => "other",
        }
    }

    /// Whether the error is only ever raised at startup
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
