//! Page-lifetime engagement milestones.
//!
//! Scroll depth keeps a single high-water mark and reports at most one
//! milestone per sample: the smallest one newly crossed. Time on page checks
//! every threshold on each poll and reports all that became due. Either way a
//! milestone fires at most once.

use std::collections::BTreeSet;
use std::time::Duration;

pub const SCROLL_MILESTONES: [u8; 5] = [25, 50, 75, 90, 100];
pub const TIME_MILESTONES_SECS: [u64; 4] = [30, 60, 180, 300];
pub const TIME_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
pub struct ScrollMilestones {
    high_water: u8,
}

impl ScrollMilestones {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn high_water(&self) -> u8 {
        self.high_water
    }

    /// Feed one scroll-depth sample (percent).
    pub fn record(&mut self, depth: f64) -> Option<u8> {
        let next = SCROLL_MILESTONES
            .iter()
            .copied()
            .find(|&m| m > self.high_water && depth >= m as f64)?;
        self.high_water = next;
        Some(next)
    }
}

#[derive(Debug)]
pub struct TimeMilestones {
    mounted_at_ms: f64,
    tracked: BTreeSet<u64>,
}

impl TimeMilestones {
    pub fn new(mounted_at_ms: f64) -> Self {
        Self {
            mounted_at_ms,
            tracked: BTreeSet::new(),
        }
    }

    /// Thresholds (seconds) that became due since the last poll.
    pub fn poll(&mut self, now_ms: f64) -> Vec<u64> {
        let elapsed_secs = (now_ms - self.mounted_at_ms) / 1000.0;
        let mut due = Vec::new();
        for secs in TIME_MILESTONES_SECS {
            if elapsed_secs >= secs as f64 && self.tracked.insert(secs) {
                due.push(secs);
            }
        }
        due
    }

    pub fn is_complete(&self) -> bool {
        self.tracked.len() == TIME_MILESTONES_SECS.len()
    }
}
