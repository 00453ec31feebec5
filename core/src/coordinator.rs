//! Tick coordinator
//!
//! Advances every channel exactly once per control-loop period, in
//! registration order, so that channels sampled on the same tick line up
//! again on replay.

use std::time::{Duration, Instant};

use crate::channel::{Channel, ChannelEvent, ChannelId};
use crate::error::ChannelError;
use crate::session::SessionCommand;

/// Outcome of one tick
#[derive(Debug, Default)]
pub struct TickReport {
    /// Index of this tick (the first tick is 1)
    pub tick: u64,
    /// Wall time spent advancing channels
    pub elapsed: Duration,
    /// Sessions that ended on this tick
    pub events: Vec<(ChannelId, ChannelEvent)>,
    /// Deferred commands that could not be applied
    pub rejected: Vec<(SessionCommand, ChannelError)>,
}

impl TickReport {
    /// True if nothing ended and nothing was rejected
    pub fn is_quiet(&self) -> bool {
        self.events.is_empty() && self.rejected.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct TickCoordinator {
    tick: u64,
    period: Duration,
    cpu_budget: Duration,
}

impl TickCoordinator {
    pub fn new(period: Duration, cpu_budget: Duration) -> Self {
        Self {
            tick: 0,
            period,
            cpu_budget,
        }
    }

    /// Fixed control-loop period
    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn cpu_budget(&self) -> Duration {
        self.cpu_budget
    }

    /// Index of the last completed tick (0 before the first tick)
    pub fn tick_index(&self) -> u64 {
        self.tick
    }

    /// Advance every channel once, in order
    pub fn advance(&mut self, channels: &mut [Channel]) -> TickReport {
        self.tick += 1;
        let start = Instant::now();

        let events = channels
            .iter_mut()
            .enumerate()
            .filter_map(|(index, channel)| {
                channel
                    .advance(self.tick)
                    .map(|event| (ChannelId(index), event))
            })
            .collect();

        let elapsed = start.elapsed();
        if elapsed > self.cpu_budget {
            tracing::warn!(
                "Tick {} took {:?}, exceeds budget of {:?}",
                self.tick,
                elapsed,
                self.cpu_budget
            );
        }

        TickReport {
            tick: self.tick,
            elapsed,
            events,
            rejected: Vec::new(),
        }
    }
}
