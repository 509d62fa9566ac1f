use std::time::Duration;

use journal_storage_core::SyncReport;

/// Caller-side cadence for draining the sync queue.
///
/// The delay resets to `base` after a full drain and doubles (up to `max`)
/// after every drain that stopped early.
#[derive(Debug, Clone)]
pub struct SyncBackoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl SyncBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let max = max.max(base);
        Self {
            base,
            max,
            current: base,
        }
    }

    /// Delay to wait before the next drain, given the last drain's outcome.
    pub fn next_delay(&mut self, report: &SyncReport) -> Duration {
        if report.is_complete() {
            self.current = self.base;
            return self.base;
        }
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }
}

impl Default for SyncBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(300))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn halted() -> SyncReport {
        SyncReport {
            synced: 0,
            remaining: 3,
            halted_on: Some("A".into()),
        }
    }

    #[test]
    fn test_doubles_until_cap_then_resets() {
        let mut backoff = SyncBackoff::new(Duration::from_millis(100), Duration::from_millis(350));

        let delays: Vec<_> = (0..4).map(|_| backoff.next_delay(&halted())).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(350),
                Duration::from_millis(350),
            ]
        );

        assert_eq!(backoff.next_delay(&SyncReport::default()), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(&halted()), Duration::from_millis(100));
    }
}
