// # dockdnsd - container-label DNS daemon
//
// This is a thin integration layer. All reconciliation logic lives in
// dockdns-core; the daemon only:
// 1. Reads configuration from environment variables and the credentials file
// 2. Initializes logging and the runtime
// 3. Registers providers and IP sources
// 4. Runs the reconciliation loop (or a single cycle with `--one-time`)
//
// ## Configuration
//
// - `DOMAIN`: Base domain (required)
// - `PROVIDER`: DNS provider name (required, `cloudflare`)
// - `AUTH_FILE`: Credentials file (default `/auth/credentials.ini`)
// - `LOOP_INTERVAL`: Seconds between cycles (default 5)
// - `IP_SERVICE_URL`: Public IP service (default `https://ifconfig.me`)
// - `DOCKER_HOST`: Docker Engine endpoint (default `unix:///var/run/docker.sock`)
// - `REPAIR_IP_DRIFT`: Recreate owned records with a stale IP (default false)
// - `LOG_LEVEL`: trace, debug, info, warn, error (default info)
// - `ONE_TIME`: Same as `--one-time`
//
// ## Example
//
// ```bash
// export DOMAIN=example.com
// export PROVIDER=cloudflare
// export AUTH_FILE=/auth/credentials.ini
//
// dockdnsd
// ```

use anyhow::{Context, Result};
use clap::Parser;
use dockdns_core::{EngineEvent, LoopMode, ProviderRegistry, ReconcileEngine, Settings};
use dockdns_source_docker::DockerLabelSource;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (failed one-shot cycle)
#[derive(Debug, Clone, Copy)]
enum DockdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<DockdnsExitCode> for ExitCode {
    fn from(code: DockdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Publish container hostnames as DNS records
#[derive(Debug, Parser)]
#[command(name = "dockdnsd", version, about)]
struct Cli {
    /// Run a single reconciliation cycle and exit
    #[arg(long = "one-time", env = "ONE_TIME")]
    one_time: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DockdnsExitCode::ConfigError.into();
        }
    };

    let log_level = match settings.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DockdnsExitCode::ConfigError.into();
    }

    info!("Starting dockdnsd for domain {}", settings.domain);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DockdnsExitCode::ConfigError.into();
        }
    };

    let mode = if cli.one_time {
        LoopMode::Once
    } else {
        LoopMode::Every(settings.interval)
    };

    rt.block_on(async {
        let (engine, events, source) = match build(&settings) {
            Ok(parts) => parts,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return DockdnsExitCode::ConfigError;
            }
        };
        tokio::spawn(log_events(events));

        match engine.run(&source, mode).await {
            Ok(()) => {
                info!("dockdnsd stopped");
                DockdnsExitCode::CleanShutdown
            }
            Err(e) => {
                error!("Reconciliation failed: {}", e);
                DockdnsExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Wire the registry, provider, IP source and container source together
fn build(
    settings: &Settings,
) -> Result<(ReconcileEngine, mpsc::Receiver<EngineEvent>, DockerLabelSource)> {
    let registry = ProviderRegistry::new();
    dockdns_provider_cloudflare::register(&registry);
    dockdns_ip_http::register(&registry);
    info!("Registered providers: {}", registry.list_providers().join(", "));

    let provider = registry
        .create_provider(&settings.provider)
        .context("Failed to initialize DNS provider")?;
    let ip_source = registry
        .create_ip_source(&settings.ip_source)
        .context("Failed to initialize IP source")?;
    let source = DockerLabelSource::from_config(&settings.desired_state)
        .context("Failed to initialize Docker source")?;

    let (engine, events) = ReconcileEngine::new(provider, ip_source, &settings.engine)
        .context("Failed to create engine")?;

    info!(
        "Using provider {}, IP source {}, reconcile interval {:?}",
        settings.provider.type_name(),
        settings.ip_source.type_name(),
        settings.interval
    );

    Ok((engine, events, source))
}

/// Drain engine events into the debug log
async fn log_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::CycleCompleted {
                created,
                replaced,
                deleted,
            } => debug!(created, replaced, deleted, "cycle completed"),
            EngineEvent::CycleFailed { error } => debug!(%error, "cycle failed"),
            other => debug!(event = ?other, "engine event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_time_flag_parses() {
        let cli = Cli::try_parse_from(["dockdnsd", "--one-time"]).unwrap();
        assert!(cli.one_time);
    }

    #[tokio::test]
    async fn event_logger_drains_until_engine_is_dropped() {
        let (tx, rx) = mpsc::channel(4);
        let logger = tokio::spawn(log_events(rx));

        tx.send(EngineEvent::CycleStarted { desired_count: 1 }).await.unwrap();
        tx.send(EngineEvent::CycleFailed {
            error: "boom".to_string(),
        })
        .await
        .unwrap();
        drop(tx);

        tokio::time::timeout(std::time::Duration::from_secs(5), logger)
            .await
            .expect("logger stops once the sender is gone")
            .unwrap();
    }

    #[test]
    fn exit_codes_are_stable() {
        assert_eq!(DockdnsExitCode::CleanShutdown as u8, 0);
        assert_eq!(DockdnsExitCode::ConfigError as u8, 1);
        assert_eq!(DockdnsExitCode::RuntimeError as u8, 2);
    }
}
