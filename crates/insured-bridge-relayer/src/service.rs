// Periodic driver for the relayer sweeps
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;
use tracing::{error, info};

use crate::error::Result;
use crate::relay::{Relayer, SweepReport};

/// Runs the relay, dispute and settle sweeps on a fixed interval until shut down
pub struct RelayerService {
    relayer: Arc<Relayer>,
    interval: Duration,
    /// Shutdown signal
    shutdown: watch::Receiver<bool>,
}

impl RelayerService {
    /// Create the service along with the sender that stops it
    pub fn new(relayer: Arc<Relayer>, interval: Duration) -> (Self, watch::Sender<bool>) {
        let (shutdown_sender, shutdown) = watch::channel(false);
        (Self { relayer, interval, shutdown }, shutdown_sender)
    }

    /// Main loop. Returns the number of completed ticks.
    ///
    /// Sweeps within a tick run one after another so transactions from the
    /// same account never race. A batching error is fatal and ends the loop.
    pub async fn run(&mut self) -> Result<u64> {
        info!(at = "Relayer#Service", interval = ?self.interval, "🚀 Starting insured bridge relayer");
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        let mut ticks = 0u64;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.relayer.run_sweeps().await {
                        Ok(reports) => {
                            log_reports(&reports);
                            ticks += 1;
                        }
                        Err(e) => {
                            error!(at = "Relayer#Service", error = %e, "Sweep aborted");
                            return Err(e);
                        }
                    }
                }

                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        info!(at = "Relayer#Service", ticks, "🛑 Relayer shutdown requested");
                        break;
                    }
                }
            }
        }

        Ok(ticks)
    }
}

fn log_reports(reports: &[SweepReport]) {
    for report in reports {
        if report.is_idle() {
            continue;
        }
        info!(
            at = report.sweep.location(),
            sweep = %report.sweep,
            actions = report.actions.len(),
            skipped = report.skipped.len(),
            failures = report.failures.len(),
            sent = report.sent(),
            "Sweep complete"
        );
    }
}
