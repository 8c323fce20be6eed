//! Scroll-cycle bookkeeping for rendered acquisition.

/// When to stop scrolling a lazily loaded page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollPolicy {
    /// Always run exactly `count` cycles.
    Fixed { count: u32 },
    /// Stop when two consecutive snapshots are identical, or after `max` cycles.
    Adaptive { max: u32 },
}

impl ScrollPolicy {
    pub fn limit(&self) -> u32 {
        match self {
            Self::Fixed { count } => *count,
            Self::Adaptive { max } => *max,
        }
    }
}

/// Tracks performed cycles and, for the adaptive policy, content snapshots.
#[derive(Debug)]
pub struct ScrollTracker {
    policy: ScrollPolicy,
    cycles: u32,
    previous: Option<String>,
    settled: bool,
}

impl ScrollTracker {
    pub fn new(policy: ScrollPolicy) -> Self {
        Self {
            policy,
            cycles: 0,
            previous: None,
            settled: false,
        }
    }

    /// Whether another scroll cycle should run.
    pub fn next_cycle(&self) -> bool {
        !self.settled && self.cycles < self.policy.limit()
    }

    /// Whether the caller should capture a snapshot after each cycle.
    pub fn wants_snapshot(&self) -> bool {
        matches!(self.policy, ScrollPolicy::Adaptive { .. })
    }

    /// Record a finished cycle and the markup captured after it.
    pub fn record_cycle(&mut self, snapshot: Option<String>) {
        self.cycles += 1;
        if let Some(current) = snapshot {
            if self.previous.as_deref() == Some(current.as_str()) {
                self.settled = true;
            }
            self.previous = Some(current);
        }
    }

    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn settled(&self) -> bool {
        self.settled
    }

    /// Markup captured after the last cycle, if any.
    pub fn into_last_snapshot(self) -> Option<String> {
        self.previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(tracker: &mut ScrollTracker, snapshots: &[&str]) {
        let mut feed = snapshots.iter();
        while tracker.next_cycle() {
            let snapshot = if tracker.wants_snapshot() {
                feed.next().map(|s| s.to_string())
            } else {
                None
            };
            tracker.record_cycle(snapshot);
        }
    }

    #[test]
    fn test_fixed_runs_every_cycle() {
        let mut tracker = ScrollTracker::new(ScrollPolicy::Fixed { count: 5 });
        assert!(!tracker.wants_snapshot());
        drive(&mut tracker, &[]);
        assert_eq!(tracker.cycles(), 5);
        assert!(!tracker.settled());
        assert!(tracker.into_last_snapshot().is_none());
    }

    #[test]
    fn test_fixed_zero_cycles() {
        let mut tracker = ScrollTracker::new(ScrollPolicy::Fixed { count: 0 });
        drive(&mut tracker, &[]);
        assert_eq!(tracker.cycles(), 0);
    }

    #[test]
    fn test_adaptive_stops_on_identical_snapshots() {
        let mut tracker = ScrollTracker::new(ScrollPolicy::Adaptive { max: 100 });
        drive(&mut tracker, &["a", "ab", "abc", "abc", "never"]);
        assert_eq!(tracker.cycles(), 4);
        assert!(tracker.settled());
        assert_eq!(tracker.into_last_snapshot().as_deref(), Some("abc"));
    }

    #[test]
    fn test_adaptive_respects_bound() {
        let mut tracker = ScrollTracker::new(ScrollPolicy::Adaptive { max: 3 });
        drive(&mut tracker, &["a", "b", "c", "d"]);
        assert_eq!(tracker.cycles(), 3);
        assert!(!tracker.settled());
        assert_eq!(tracker.into_last_snapshot().as_deref(), Some("c"));
    }
}
