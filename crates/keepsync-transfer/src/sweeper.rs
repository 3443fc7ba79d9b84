//! Background expiry of abandoned upload sessions.

use std::sync::{Arc, Weak};

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::assembler::ChunkAssembler;

/// Owns the sweep task. Dropping the handle stops it.
#[derive(Debug)]
pub struct SweeperHandle {
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweep task now.
    pub fn stop(self) {
        // Drop aborts.
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn the periodic sweep on the current tokio runtime.
///
/// The task only holds a weak reference, so it also ends on its own once
/// the assembler is dropped.
pub fn spawn_sweeper(assembler: &Arc<ChunkAssembler>) -> SweeperHandle {
    let period = assembler.config().sweep_interval;
    let weak: Weak<ChunkAssembler> = Arc::downgrade(assembler);

    let task = tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let Some(assembler) = weak.upgrade() else {
                break;
            };

            let removed = assembler.sweep_expired();
            if removed > 0 {
                tracing::info!(removed, remaining = assembler.len(), "expired upload sessions swept");
            } else {
                tracing::trace!("sweep found no expired upload sessions");
            }
        }
    });

    SweeperHandle { task }
}
