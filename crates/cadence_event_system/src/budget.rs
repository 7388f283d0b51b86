//! Per-pass time budget for `dispatch`.
//!
//! The budget is only checked between listener invocations, so a single slow
//! listener can overrun it; listeners are never preempted.

use std::time::{Duration, Instant};

/// How long a dispatch pass may keep invoking listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Budget {
    /// Run until the queue (or its filtered part) is drained.
    #[default]
    Unbounded,
    /// Stop once this much time has elapsed since the pass started.
    Limited(Duration),
}

impl Budget {
    /// Builds a budget from milliseconds. Zero or negative means unbounded.
    pub fn from_millis(ms: i64) -> Self {
        match u64::try_from(ms) {
            Ok(0) | Err(_) => Budget::Unbounded,
            Ok(ms) => Budget::Limited(Duration::from_millis(ms)),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, Budget::Unbounded)
    }

    /// Starts the clock for one pass.
    pub(crate) fn start(self) -> Deadline {
        Deadline {
            started: Instant::now(),
            budget: self,
        }
    }
}

impl From<Duration> for Budget {
    fn from(duration: Duration) -> Self {
        if duration.is_zero() {
            Budget::Unbounded
        } else {
            Budget::Limited(duration)
        }
    }
}

impl From<i64> for Budget {
    fn from(ms: i64) -> Self {
        Budget::from_millis(ms)
    }
}

impl From<Option<Duration>> for Budget {
    fn from(duration: Option<Duration>) -> Self {
        duration.map(Budget::from).unwrap_or_default()
    }
}

/// Running clock of one dispatch pass.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    started: Instant,
    budget: Budget,
}

impl Deadline {
    /// Returns true once the pass has used up its budget.
    #[inline]
    pub(crate) fn expired(&self) -> bool {
        match self.budget {
            Budget::Unbounded => false,
            Budget::Limited(limit) => self.started.elapsed() >= limit,
        }
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_positive_millis_are_unbounded() {
        assert_eq!(Budget::from_millis(0), Budget::Unbounded);
        assert_eq!(Budget::from_millis(-1), Budget::Unbounded);
        assert_eq!(Budget::from_millis(i64::MIN), Budget::Unbounded);
        assert!(Budget::from(0i64).is_unbounded());
    }

    #[test]
    fn test_millis_convert_to_exact_duration() {
        let budget = Budget::from_millis(5);
        assert_eq!(budget, Budget::Limited(Duration::from_nanos(5 * 1_000_000)));
    }

    #[test]
    fn test_duration_conversions() {
        assert_eq!(Budget::from(Duration::ZERO), Budget::Unbounded);
        assert_eq!(Budget::from(None::<Duration>), Budget::Unbounded);
        assert_eq!(
            Budget::from(Some(Duration::from_millis(3))),
            Budget::Limited(Duration::from_millis(3))
        );
    }

    #[test]
    fn test_deadline_expiry() {
        assert!(!Budget::Unbounded.start().expired());

        let deadline = Budget::Limited(Duration::from_millis(1)).start();
        std::thread::sleep(Duration::from_millis(3));
        assert!(deadline.expired());
        assert!(deadline.elapsed() >= Duration::from_millis(1));
    }
}
