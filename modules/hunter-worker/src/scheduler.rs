use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::orchestrator::Orchestrator;

/// Runs a harvest cycle, then waits a fixed interval, until cancelled.
pub struct Scheduler {
    interval: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Returns the number of cycles completed. A cycle already in flight when
    /// `cancel` fires runs to completion; the wait after it is cut short.
    pub async fn run(&self, orchestrator: &Orchestrator, cancel: CancellationToken) -> u64 {
        let mut cycles = 0u64;

        while !cancel.is_cancelled() {
            let outcome = orchestrator.run_cycle().await;
            cycles += 1;
            info!(cycle = cycles, "Cycle finished: {outcome}");

            info!(secs = self.interval.as_secs(), "Waiting for next cycle");
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!(cycles, "Scheduler stopped");
        cycles
    }
}
