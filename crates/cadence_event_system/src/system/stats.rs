//! Statistics tracking for the event system

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of event system counters for monitoring.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSystemStats {
    /// Events enqueued by `publish` / `publish_default`
    pub events_published: u64,
    /// Events removed from the queue by a dispatch pass
    pub events_dispatched: u64,
    /// Events discarded by `flush`, group switches with flush, or `reset`
    pub events_flushed: u64,
    /// Immediate deliveries through `broadcast` / `broadcast_default`
    pub broadcasts: u64,
    /// Individual listener calls, deferred and immediate
    pub listener_invocations: u64,
    /// Listener calls that returned an error
    pub listener_failures: u64,
    /// Dispatch passes that ran (early no-op returns included)
    pub dispatch_passes: u64,
    /// Dispatch passes that stopped because the budget ran out
    pub budget_exhausted_passes: u64,
}

/// Lock-free counters behind [`EventSystemStats`].
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    events_published: AtomicU64,
    events_dispatched: AtomicU64,
    events_flushed: AtomicU64,
    broadcasts: AtomicU64,
    listener_invocations: AtomicU64,
    listener_failures: AtomicU64,
    dispatch_passes: AtomicU64,
    budget_exhausted_passes: AtomicU64,
}

impl StatsCounters {
    #[inline]
    pub(crate) fn published(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn dispatched(&self) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn flushed(&self, count: usize) {
        self.events_flushed.fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn broadcast(&self) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn invoked(&self) {
        self.listener_invocations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn failed(&self) {
        self.listener_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn pass(&self) {
        self.dispatch_passes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn budget_exhausted(&self) {
        self.budget_exhausted_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> EventSystemStats {
        EventSystemStats {
            events_published: self.events_published.load(Ordering::Relaxed),
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            events_flushed: self.events_flushed.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            listener_invocations: self.listener_invocations.load(Ordering::Relaxed),
            listener_failures: self.listener_failures.load(Ordering::Relaxed),
            dispatch_passes: self.dispatch_passes.load(Ordering::Relaxed),
            budget_exhausted_passes: self.budget_exhausted_passes.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn clear(&self) {
        for counter in [
            &self.events_published,
            &self.events_dispatched,
            &self.events_flushed,
            &self.broadcasts,
            &self.listener_invocations,
            &self.listener_failures,
            &self.dispatch_passes,
            &self.budget_exhausted_passes,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
