//! Reconciliation engine
//!
//! The ReconcileEngine is responsible for:
//! - Fetching the provider's current records
//! - Diffing them against the desired hostnames ([`plan`])
//! - Resolving the public IP once per cycle, only when something is created
//! - Applying creates before deletes, stopping at the first failure
//! - Driving cycles on a fixed interval until shutdown
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────┐
//! │ DesiredStateSource │─── DesiredHostnames ──┐
//! └────────────────────┘                       │
//!                                              ▼
//!                                    ┌─────────────────┐
//!                                    │ ReconcileEngine │
//!                                    └─────────────────┘
//!                                              │
//!         ┌────────────────────────────────────┼──────────────────────────┐
//!         │                                    │                          │
//!         ▼                                    ▼                          ▼
//! ┌─────────────┐                     ┌──────────────┐            ┌─────────────┐
//! │  IpSource   │                     │ DnsProvider  │            │   Events    │
//! │ (public IP) │                     │ (fetch/apply)│            │  (notify)   │
//! └─────────────┘                     └──────────────┘            └─────────────┘
//! ```
//!
//! ## Cycle
//!
//! 1. Fetch current records; on failure abort with no changes
//! 2. Compute the plan
//! 3. Create missing pairs, replace drifted pairs, delete released pairs,
//!    then delete lone ownership markers
//! 4. Return a [`ReconcileReport`] or the first error
//!
//! Nothing is carried between cycles: a cycle that failed halfway is
//! repaired by the next one re-deriving the diff from scratch.

pub mod plan;

pub use plan::{Addition, ReconcilePlan, plan};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::record::DesiredHostnames;
use crate::traits::{DesiredStateSource, DnsProvider, IpSource};
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Events emitted by the ReconcileEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A cycle started
    CycleStarted {
        desired_count: usize,
    },

    /// A hostname pair was created
    HostnameCreated {
        hostname: String,
        ip: IpAddr,
    },

    /// An owned hostname pair was deleted
    HostnameDeleted {
        hostname: String,
    },

    /// A lone ownership marker for an undesired hostname was deleted
    MarkerDeleted {
        hostname: String,
    },

    /// A stale owned pair was recreated with the current IP
    HostnameReplaced {
        hostname: String,
        ip: IpAddr,
    },

    /// An undesired hostname was left alone (no ownership marker)
    ForeignRecordSkipped {
        hostname: String,
    },

    /// A cycle finished without error
    CycleCompleted {
        created: usize,
        replaced: usize,
        deleted: usize,
    },

    /// A cycle was abandoned
    CycleFailed {
        error: String,
    },

    /// The loop stopped
    Stopped {
        reason: String,
    },
}

/// What one cycle changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Hostnames published this cycle
    pub created: Vec<String>,
    /// Hostnames recreated with a fresh IP
    pub replaced: Vec<String>,
    /// Hostnames unpublished this cycle
    pub deleted: Vec<String>,
    /// Hostnames whose lone ownership marker was deleted
    pub released_markers: Vec<String>,
    /// Undesired hostnames left untouched
    pub skipped_foreign: Vec<String>,
}

impl ReconcileReport {
    /// Number of pair operations performed
    pub fn changes(&self) -> usize {
        self.created.len() + self.replaced.len() + self.deleted.len() + self.released_markers.len()
    }
}

/// How the controller loop runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// Run a single cycle and return its result
    Once,
    /// Run a cycle, sleep, repeat until shutdown
    Every(Duration),
}

/// Core reconciliation engine
///
/// Owns the provider and the IP source. Cycles are strictly sequential, so
/// provider-side caches (the zone identifier) need no locking.
pub struct ReconcileEngine {
    /// DNS provider for fetching and changing records
    provider: Box<dyn DnsProvider>,

    /// Public IP discovery
    ip_source: Box<dyn IpSource>,

    /// Recreate owned records whose address is stale
    repair_ip_drift: bool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl ReconcileEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        provider: Box<dyn DnsProvider>,
        ip_source: Box<dyn IpSource>,
        config: &EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        if config.event_channel_capacity == 0 {
            return Err(Error::config("event channel capacity must be > 0"));
        }

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            provider,
            ip_source,
            repair_ip_drift: config.repair_ip_drift,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run one reconciliation cycle against the given desired state
    ///
    /// # Returns
    ///
    /// - `Ok(ReconcileReport)`: Everything in the plan was applied
    /// - `Err(Error)`: The first failure; later operations were not attempted
    pub async fn reconcile(&self, desired: &DesiredHostnames) -> Result<ReconcileReport> {
        self.emit_event(EngineEvent::CycleStarted {
            desired_count: desired.len(),
        });

        match self.reconcile_inner(desired).await {
            Ok(report) => {
                self.emit_event(EngineEvent::CycleCompleted {
                    created: report.created.len(),
                    replaced: report.replaced.len(),
                    deleted: report.deleted.len(),
                });
                Ok(report)
            }
            Err(e) => {
                self.emit_event(EngineEvent::CycleFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn reconcile_inner(&self, desired: &DesiredHostnames) -> Result<ReconcileReport> {
        let current = self.provider.fetch_records().await?;
        debug!(
            "{} reports {} address and {} ownership record(s)",
            self.provider.provider_name(),
            current.address.len(),
            current.ownership.len()
        );

        let drift_ip = if self.repair_ip_drift {
            Some(self.ip_source.current().await?)
        } else {
            None
        };

        let plan = plan(desired, &current, drift_ip);
        let mut report = ReconcileReport {
            skipped_foreign: plan.foreign.clone(),
            ..ReconcileReport::default()
        };

        for hostname in &plan.foreign {
            debug!("Leaving {} alone: no ownership marker", hostname);
            self.emit_event(EngineEvent::ForeignRecordSkipped {
                hostname: hostname.clone(),
            });
        }

        if plan.is_empty() {
            debug!("Nothing to change ({} hostname(s) desired)", desired.len());
            return Ok(report);
        }

        debug!(
            "Plan: {} addition(s), {} replacement(s), {} removal(s), {} lone marker(s)",
            plan.additions.len(),
            plan.replacements.len(),
            plan.removals.len(),
            plan.orphan_markers.len()
        );

        let ip = match (drift_ip, plan.needs_ip()) {
            (Some(ip), _) => Some(ip),
            (None, true) => Some(self.ip_source.current().await?),
            (None, false) => None,
        };

        if let Some(ip) = ip {
            for addition in &plan.additions {
                self.provider
                    .create_hostname(&addition.hostname, ip, addition.ownership_exists)
                    .await?;
                info!("Created {} -> {}", addition.hostname, ip);
                self.emit_event(EngineEvent::HostnameCreated {
                    hostname: addition.hostname.clone(),
                    ip,
                });
                report.created.push(addition.hostname.clone());
            }

            for owned in &plan.replacements {
                self.provider.delete_hostname(owned).await?;
                self.provider.create_hostname(&owned.hostname, ip, false).await?;
                info!(
                    "Replaced {} -> {} (was: {})",
                    owned.hostname, ip, owned.address.content
                );
                self.emit_event(EngineEvent::HostnameReplaced {
                    hostname: owned.hostname.clone(),
                    ip,
                });
                report.replaced.push(owned.hostname.clone());
            }
        }

        for owned in &plan.removals {
            self.provider.delete_hostname(owned).await?;
            info!("Deleted {}", owned.hostname);
            self.emit_event(EngineEvent::HostnameDeleted {
                hostname: owned.hostname.clone(),
            });
            report.deleted.push(owned.hostname.clone());
        }

        for marker in &plan.orphan_markers {
            self.provider.delete_marker(marker).await?;
            info!("Deleted lone ownership marker for {}", marker.hostname);
            self.emit_event(EngineEvent::MarkerDeleted {
                hostname: marker.hostname.clone(),
            });
            report.released_markers.push(marker.hostname.clone());
        }

        Ok(report)
    }

    /// Pull desired state from the source and reconcile it
    pub async fn run_cycle(&self, source: &dyn DesiredStateSource) -> Result<ReconcileReport> {
        let desired = source.desired_hostnames().await?;
        debug!(
            "{} source wants {} hostname(s)",
            source.source_name(),
            desired.len()
        );
        self.reconcile(&desired).await
    }

    /// Run the controller loop
    ///
    /// Cycle errors are logged and never stop a periodic loop. In
    /// [`LoopMode::Once`] the cycle's error is returned to the caller.
    /// A periodic loop stops on SIGINT/SIGTERM.
    pub async fn run(&self, source: &dyn DesiredStateSource, mode: LoopMode) -> Result<()> {
        self.run_internal(source, mode, None).await
    }

    /// Run the controller loop with a programmatic shutdown signal
    ///
    /// **TESTING ONLY**: production code should use `run()`, which stops on
    /// OS signals.
    pub async fn run_with_shutdown(
        &self,
        source: &dyn DesiredStateSource,
        mode: LoopMode,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(source, mode, shutdown_rx).await
    }

    async fn run_internal(
        &self,
        source: &dyn DesiredStateSource,
        mode: LoopMode,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                    "shutdown channel"
                }
                None => wait_for_signal().await,
            }
        };
        tokio::pin!(shutdown);

        loop {
            let result = self.run_cycle(source).await;
            match &result {
                Ok(report) if report.changes() > 0 => info!(
                    "Cycle complete: {} created, {} replaced, {} deleted",
                    report.created.len(),
                    report.replaced.len(),
                    report.deleted.len()
                ),
                Ok(_) => debug!("Cycle complete: in sync"),
                Err(e) => error!("Reconciliation cycle failed: {}", e),
            }

            let interval = match mode {
                LoopMode::Once => return result.map(|_| ()),
                LoopMode::Every(interval) => interval,
            };

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                reason = &mut shutdown => {
                    info!("Shutdown signal received ({})", reason);
                    self.emit_event(EngineEvent::Stopped {
                        reason: reason.to_string(),
                    });
                    return Ok(());
                }
            }
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = tokio::signal::ctrl_c() => "SIGINT",
            }
        }
        Err(e) => {
            warn!("Failed to setup SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            "SIGINT"
        }
    }
}

/// Wait for SIGINT
#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "SIGINT"
}
