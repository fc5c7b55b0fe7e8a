// # cfddnsd - Cloudflare DDNS Daemon
//
// Thin integration layer. All reconciliation logic lives in cfddns-core; this
// binary only:
// 1. Reads configuration from environment variables
// 2. Installs the log subscriber
// 3. Builds the runtime, the IP resolver and the Cloudflare provider
// 4. Runs the reconciler until SIGTERM or SIGINT
//
// ## Configuration
//
// ### Record
// - `CLOUDFLARE_APITOKEN`: API token (required)
// - `CLOUDFLARE_ZONE`: Zone name, e.g. example.com (required)
// - `CLOUDFLARE_ZONEID`: Zone ID (optional, discovered from the zone name)
// - `CLOUDFLARE_NAME`: Record name; `@`, empty or the zone name for the apex (default: @)
// - `CLOUDFLARE_RECORDTYPE`: A or AAAA (default: A)
// - `CLOUDFLARE_RECORDTTL`: 1 (automatic) or 60..=86400 (default: 1)
//
// ### IP Address
// - `CLOUDFLARE_IPV4` / `CLOUDFLARE_IPV6`: Static address, skips the lookup
// - `CLOUDFLARE_IP_URL`: IP echo service (default: http://myip.dnsomatic.com/)
//
// ### Timing
// - `CLOUDFLARE_DELAY`: Seconds to wait before the first tick (default: 0)
// - `CLOUDFLARE_INTERVAL`: Seconds between ticks (default: 300)
// - `CLOUDFLARE_TRIES`: Attempts per tick (default: 3)
//
// ### Misc
// - `CLOUDFLARE_API_URL`: API base URL (default: https://api.cloudflare.com/client/v4)
// - `CLOUDFLARE_MODE`: `dry-run` to log writes instead of sending them
// - `CLOUDFLARE_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export CLOUDFLARE_APITOKEN=your_token
// export CLOUDFLARE_ZONE=example.com
// export CLOUDFLARE_NAME=home
//
// cfddnsd
// ```

use anyhow::Result;
use cfddns_core::config::LOG_TIME_FORMAT;
use cfddns_core::{DdnsConfig, Reconciler};
use cfddns_ip_http::HttpIpResolver;
use cfddns_provider_cloudflare::CloudflareProvider;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::ChronoLocal;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let config = match DdnsConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = init_tracing(&config.log_level) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting cfddnsd {}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {:?}", config);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match build_reconciler(config) {
            Ok(reconciler) => match run_daemon(reconciler).await {
                Ok(()) => DdnsExitCode::CleanShutdown,
                Err(e) => {
                    error!("Daemon error: {:#}", e);
                    DdnsExitCode::RuntimeError
                }
            },
            Err(e) => {
                error!("Startup error: {:#}", e);
                DdnsExitCode::ConfigError
            }
        }
    });

    result.into()
}

/// Install the stdout subscriber with local timestamps and a level filter
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level.to_lowercase())?;

    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new(LOG_TIME_FORMAT.to_string()))
        .with_target(false)
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

/// Wire the IP resolver and the provider into a reconciler
fn build_reconciler(config: DdnsConfig) -> Result<Reconciler> {
    let resolver = HttpIpResolver::new(config.ip_source_url.clone(), Some(config.record_type))?;
    let provider = CloudflareProvider::from_config(&config)?;

    if let Some(ref ip) = config.static_ip {
        info!("Using static IP {} instead of {}", ip, resolver.url());
    }

    let reconciler = Reconciler::new(config, Box::new(resolver), Box::new(provider))?;
    Ok(reconciler)
}

/// Run the reconciler until a shutdown signal arrives
async fn run_daemon(reconciler: Reconciler) -> Result<()> {
    let shutdown = shutdown_signal()?;

    reconciler
        .run_until(async {
            let signal = shutdown.await;
            info!("Received shutdown signal: {}", signal);
        })
        .await;

    info!("Shutting down daemon");
    Ok(())
}

/// Register handlers for SIGTERM and SIGINT
///
/// Handlers are installed before the reconciler starts so an early signal is
/// not lost. The returned future resolves with the signal's name.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Fallback for non-Unix platforms: CTRL-C only
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
            std::future::pending::<()>().await;
        }
        "SIGINT"
    })
}
