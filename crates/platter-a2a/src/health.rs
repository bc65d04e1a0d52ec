//! Health monitor — periodically re-resolves every configured agent address
//!
//! Probes within one cycle run concurrently. The monitor only adds registry
//! entries and flips liveness flags; it never touches conversation state.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::{Notify, OnceCell};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::client::AgentTransport;
use crate::registry::AgentRegistry;

/// Outcome of one health-check cycle, by address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub reachable: Vec<String>,
    pub unreachable: Vec<String>,
}

/// Floor for the re-check period; `tokio::time::interval` rejects zero
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

pub struct HealthMonitor {
    addresses: Vec<String>,
    interval: Duration,
    transport: Arc<dyn AgentTransport>,
    registry: Arc<AgentRegistry>,
    started: OnceCell<()>,
    wake: Notify,
}

impl HealthMonitor {
    pub fn new(
        addresses: Vec<String>,
        interval: Duration,
        transport: Arc<dyn AgentTransport>,
        registry: Arc<AgentRegistry>,
    ) -> Self {
        let interval = if interval.is_zero() {
            warn!("Health check interval of zero, using {:?}", MIN_INTERVAL);
            MIN_INTERVAL
        } else {
            interval
        };
        Self {
            addresses,
            interval,
            transport,
            registry,
            started: OnceCell::new(),
            wake: Notify::new(),
        }
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_started(&self) -> bool {
        self.started.initialized()
    }

    /// Probe every configured address once and apply the results
    pub async fn run_cycle(&self) -> CycleReport {
        let probes = self.addresses.iter().map(|address| {
            let transport = Arc::clone(&self.transport);
            async move {
                let result = transport.fetch_agent_card(address).await;
                (address.clone(), result)
            }
        });

        let mut report = CycleReport::default();
        for (address, result) in join_all(probes).await {
            match result {
                Ok(card) => {
                    self.registry
                        .record_success(&address, card, Arc::clone(&self.transport));
                    report.reachable.push(address);
                }
                Err(e) => {
                    warn!("Health check failed for {}: {}", address, e);
                    self.registry.record_failure(&address);
                    report.unreachable.push(address);
                }
            }
        }

        debug!(
            "Health cycle: {} reachable, {} unreachable",
            report.reachable.len(),
            report.unreachable.len()
        );
        report
    }

    /// Start the background loop on first use.
    ///
    /// The first cycle completes before this returns, so the registry is
    /// populated for the caller. Later calls return immediately.
    pub async fn ensure_started(self: &Arc<Self>) {
        self.started
            .get_or_init(|| async {
                if self.addresses.is_empty() {
                    warn!("No remote agent addresses configured");
                }
                let report = self.run_cycle().await;
                info!(
                    "Health monitor started: {}/{} agent(s) reachable, checking every {:?}",
                    report.reachable.len(),
                    self.addresses.len(),
                    self.interval
                );
                self.spawn_loop();
            })
            .await;
    }

    /// Ask for an immediate cycle instead of waiting for the next tick
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    fn spawn_loop(self: &Arc<Self>) {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(monitor.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; the initial cycle already ran.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = monitor.wake.notified() => {
                        debug!("Health monitor woken early");
                        interval.reset();
                    }
                }
                monitor.run_cycle().await;
            }
        });
    }
}
