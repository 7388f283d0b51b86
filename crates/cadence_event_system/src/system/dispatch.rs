//! Budget-aware dispatch pass

use crate::budget::Budget;
use crate::events::{Event, EventError, EventType, Route};
use crate::queue::EventQueue;
use super::core::EventSystem;
use parking_lot::{Mutex, MutexGuard};
use std::cell::RefCell;
use std::collections::HashSet;
use std::thread::{self, ThreadId};
use tracing::{debug, warn};

impl<P: Send + 'static> EventSystem<P> {
    /// Drains the whole queue with no budget and no filter.
    #[inline]
    pub fn dispatch_all(&self) -> Result<(), EventError> {
        self.dispatch(Budget::Unbounded, None)
    }

    /// Delivers queued events to the active group's subscribers.
    ///
    /// Events are popped lowest priority first and each one is delivered to its
    /// subscriptions in ascending priority order. The subscription list is
    /// copied before the first listener runs, so listeners may subscribe and
    /// unsubscribe freely.
    ///
    /// - **Budget**: after every listener call the elapsed time is compared to
    ///   the budget. Once it is used up, the remaining listeners of the current
    ///   event are skipped and the pass ends; events not yet popped stay queued.
    /// - **Filter**: events whose type is not in `event_types` are parked and
    ///   put back when the pass ends. An empty set means no filter. Parked
    ///   events still count as queued, so a listener that flushes, resets or
    ///   switches groups during the pass sees them.
    /// - **Errors**: a listener error ends the pass and is returned. The event
    ///   being delivered is consumed, every other event stays queued.
    ///
    /// Calling `dispatch` from inside a listener returns
    /// [`EventError::ReentrantDispatch`]. A pass running on another thread is
    /// waited for instead.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cadence_event_system::{Budget, EventSystem, ListenerHandle};
    /// use std::collections::HashSet;
    ///
    /// let events: EventSystem<String> = EventSystem::new();
    /// events.subscribe(1, ListenerHandle::new(|msg: &String| {
    ///     println!("input: {msg}");
    ///     Ok(())
    /// }));
    /// events.publish_with_priority(1, 0, "jump".to_string());
    /// events.publish(2, "unheard".to_string());
    ///
    /// events.dispatch(Budget::from_millis(4), Some(&HashSet::from([1]))).unwrap();
    /// assert_eq!(events.queue_len(), 1);
    /// ```
    pub fn dispatch(
        &self,
        budget: impl Into<Budget>,
        event_types: Option<&HashSet<EventType>>,
    ) -> Result<(), EventError> {
        let budget = budget.into();
        let _pass = self.enter_dispatch()?;
        let queue = self.queue.lock();
        self.stats.pass();

        debug!("dispatch: budget={:?}, event_types={:?}", budget, event_types);
        if self.nothing_to_deliver(&queue) {
            return Ok(());
        }

        let filter = event_types.filter(|types| !types.is_empty());
        let deadline = budget.start();
        let _unpark = Unpark { queue: &queue };
        let mut delivered = 0usize;

        'events: while let Some(event) = Self::pop_next(&queue) {
            if filter.is_some_and(|types| !types.contains(&event.event_type)) {
                queue.borrow_mut().park(event);
                continue;
            }

            self.stats.dispatched();
            delivered += 1;
            let subscriptions = self
                .registry
                .read()
                .snapshot(event.event_type, event.route == Route::WithDefault);

            for subscription in &subscriptions {
                self.invoke(subscription, event.event_type, &event.payload)?;
                if deadline.expired() {
                    self.stats.budget_exhausted();
                    debug!(
                        "⏱️ dispatch budget exhausted after {:?} ({} events delivered)",
                        deadline.elapsed(),
                        delivered
                    );
                    break 'events;
                }
            }
        }

        debug!(
            "dispatch complete: delivered={}, set_aside={}, elapsed={:?}",
            delivered,
            queue.borrow().parked_len(),
            deadline.elapsed()
        );
        Ok(())
    }

    /// Early-out check: an empty queue, or no subscriber that could hear anything.
    fn nothing_to_deliver(&self, queue: &RefCell<EventQueue<P>>) -> bool {
        let queue = queue.borrow();
        if queue.is_empty() {
            return true;
        }
        let registry = self.registry.read();
        registry.active().is_empty()
            && (registry.default_is_active()
                || registry.default_group().is_empty()
                || !queue.has_default_routed())
    }

    /// Pops under a short borrow so listeners can publish re-entrantly.
    #[inline]
    fn pop_next(queue: &RefCell<EventQueue<P>>) -> Option<Event<P>> {
        queue.borrow_mut().pop_min()
    }

    /// Claims the dispatch gate for the current thread.
    fn enter_dispatch(&self) -> Result<DispatchPass<'_>, EventError> {
        let current = thread::current().id();
        if *self.dispatch_owner.lock() == Some(current) {
            warn!("⚠️ dispatch called from within a dispatch pass; refusing");
            return Err(EventError::ReentrantDispatch);
        }

        let gate = self.dispatch_gate.lock();
        *self.dispatch_owner.lock() = Some(current);
        Ok(DispatchPass {
            owner: &self.dispatch_owner,
            _gate: gate,
        })
    }
}

/// Held for the duration of one dispatch pass.
struct DispatchPass<'a> {
    owner: &'a Mutex<Option<ThreadId>>,
    _gate: MutexGuard<'a, ()>,
}

impl Drop for DispatchPass<'_> {
    fn drop(&mut self) {
        *self.owner.lock() = None;
    }
}

/// Returns parked events to the heap when the pass ends for any reason,
/// including a listener error or panic.
struct Unpark<'a, P> {
    queue: &'a RefCell<EventQueue<P>>,
}

impl<P> Drop for Unpark<'_, P> {
    fn drop(&mut self) {
        self.queue.borrow_mut().unpark();
    }
}
