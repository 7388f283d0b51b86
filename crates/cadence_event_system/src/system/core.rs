//! Core EventSystem implementation

use crate::queue::EventQueue;
use crate::registry::GroupRegistry;
use super::stats::{EventSystemStats, StatsCounters};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::cell::RefCell;
use std::thread::ThreadId;
use tracing::info;

/// The event system context: queue, subscriber groups and dispatch state.
///
/// One instance is normally constructed at startup and shared behind an `Arc`
/// with every thread that publishes, subscribes or runs the frame loop.
/// Independent instances never share state, which keeps tests isolated.
///
/// # Locking
///
/// Three independent critical sections keep unrelated operations from
/// serializing against each other:
///
/// - **Queue** (`ReentrantMutex`): held for publish, flush and for the whole of
///   a dispatch pass. Listeners running inside the pass re-enter it on the same
///   thread, so publishing from a listener never deadlocks. Publishers on other
///   threads wait until the pass finishes.
/// - **Dispatch gate**: one pass at a time. The thread already running a pass
///   gets [`EventError::ReentrantDispatch`](crate::EventError::ReentrantDispatch)
///   instead of blocking; other threads wait their turn.
/// - **Registry** (`RwLock`): held only while reading or mutating groups, never
///   across a listener call. Dispatch and broadcast copy the subscription list
///   of each event before invoking anyone, so concurrent subscribe/unsubscribe
///   calls take effect from the next event on.
///
/// Locks are always taken in the order gate, queue, registry.
pub struct EventSystem<P> {
    /// Pending events, lowest priority first
    pub(super) queue: ReentrantMutex<RefCell<EventQueue<P>>>,
    /// Named subscriber groups and the active selection
    pub(super) registry: RwLock<GroupRegistry<P>>,
    /// Serializes dispatch passes across threads
    pub(super) dispatch_gate: Mutex<()>,
    /// Thread currently running a dispatch pass, if any
    pub(super) dispatch_owner: Mutex<Option<ThreadId>>,
    /// Monitoring counters
    pub(super) stats: StatsCounters,
}

impl<P> std::fmt::Debug for EventSystem<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSystem")
            .field("queue", &"[queue]")
            .field("registry", &"[registry]")
            .field("dispatching", &self.dispatch_owner.lock().is_some())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

impl<P: Send + 'static> EventSystem<P> {
    /// Creates an event system with an empty queue and an empty, active
    /// "default" subscriber group.
    pub fn new() -> Self {
        Self {
            queue: ReentrantMutex::new(RefCell::new(EventQueue::new())),
            registry: RwLock::new(GroupRegistry::new()),
            dispatch_gate: Mutex::new(()),
            dispatch_owner: Mutex::new(None),
            stats: StatsCounters::default(),
        }
    }

    /// Returns the system to its initial state.
    ///
    /// Clears the queue, drops every subscriber group and leaves a single empty
    /// "default" group active. Both changes happen under the queue lock, so no
    /// publish can interleave with them. Statistics are not cleared.
    pub fn reset(&self) {
        let queue = self.queue.lock();
        let flushed = queue.borrow_mut().clear();
        *self.registry.write() = GroupRegistry::new();
        self.stats.flushed(flushed);
        info!("🔄 Event system reset ({} queued events discarded)", flushed);
    }

    /// Number of events waiting to be dispatched.
    pub fn queue_len(&self) -> usize {
        self.queue.lock().borrow().len()
    }

    pub fn is_queue_empty(&self) -> bool {
        self.queue.lock().borrow().is_empty()
    }

    /// Gets the current event system statistics
    #[inline]
    pub fn stats(&self) -> EventSystemStats {
        self.stats.snapshot()
    }

    /// Zeroes every statistics counter.
    pub fn reset_stats(&self) {
        self.stats.clear();
    }
}

impl<P: Send + 'static> Default for EventSystem<P> {
    fn default() -> Self {
        Self::new()
    }
}
