//! Global flood protection.
//!
//! One process-wide counter caps average admitted requests per second. Every
//! request increments it; a ticker subtracts the budget once a second,
//! flooring at zero. This permits short bursts up to roughly the budget and
//! has no per-client fairness.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Process-wide admission counter.
#[derive(Debug)]
pub struct FloodGate {
    budget: u64,
    count: AtomicU64,
}

impl FloodGate {
    pub fn new(budget: u64) -> Self {
        Self {
            budget,
            count: AtomicU64::new(0),
        }
    }

    /// Count this request and decide admission: the post-increment value
    /// must not exceed the budget.
    pub fn admit(&self) -> bool {
        self.count.fetch_add(1, Ordering::Relaxed) + 1 <= self.budget
    }

    /// Subtract one budget's worth from the counter, flooring at zero.
    pub fn drain(&self) {
        let _ = self
            .count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                Some(c.saturating_sub(self.budget))
            });
    }

    /// Current counter value.
    pub fn pressure(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Spawn the once-a-second drain ticker.
    pub fn spawn_drain(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let gate = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(1));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                gate.drain();
            }
        })
    }
}
