//! Event publication, immediate broadcast and queue flushing

use crate::events::{Event, EventError, EventType, Priority, Route, LOWEST_PRIORITY};
use crate::registry::Subscription;
use super::core::EventSystem;
use std::collections::HashSet;
use tracing::{debug, trace, warn};

impl<P: Send + 'static> EventSystem<P> {
    /// Queues an event at the lowest priority for the next dispatch pass.
    #[inline]
    pub fn publish(&self, event_type: EventType, payload: P) {
        self.publish_with_priority(event_type, LOWEST_PRIORITY, payload);
    }

    /// Queues an event for the next dispatch pass.
    ///
    /// Safe to call from any thread and from inside a listener. A listener
    /// publishing during a pass adds the event to the queue being drained, so
    /// it may be delivered by that same pass.
    pub fn publish_with_priority(&self, event_type: EventType, priority: Priority, payload: P) {
        self.enqueue(Event::new(event_type, priority, payload));
    }

    /// Queues an event that reaches the "default" group's subscribers in
    /// addition to the active group's, whichever group is active at delivery.
    pub fn publish_default(&self, event_type: EventType, priority: Priority, payload: P) {
        self.enqueue(Event::new(event_type, priority, payload).with_route(Route::WithDefault));
    }

    fn enqueue(&self, event: Event<P>) {
        debug!(
            "📤 publish: event_type={}, priority={}, route={:?}",
            event.event_type, event.priority, event.route
        );
        let queue = self.queue.lock();
        queue.borrow_mut().push(event);
        self.stats.published();
    }

    /// Delivers a payload to the active group's subscribers immediately.
    #[inline]
    pub fn broadcast(&self, event_type: EventType, payload: P) -> Result<(), EventError> {
        self.broadcast_with_priority(event_type, LOWEST_PRIORITY, payload)
    }

    /// Delivers a payload to the active group's subscribers immediately,
    /// bypassing the queue.
    ///
    /// There is no budget and no filter. Listeners run on the calling thread
    /// in ascending subscription priority, and the first listener error stops
    /// delivery and is returned. Broadcasting from inside a listener is allowed.
    /// The priority is informational only, since nothing is queued.
    pub fn broadcast_with_priority(
        &self,
        event_type: EventType,
        priority: Priority,
        payload: P,
    ) -> Result<(), EventError> {
        self.deliver_now(event_type, priority, Route::Active, payload)
    }

    /// Immediate delivery to both the active group and the "default" group.
    pub fn broadcast_default(
        &self,
        event_type: EventType,
        priority: Priority,
        payload: P,
    ) -> Result<(), EventError> {
        self.deliver_now(event_type, priority, Route::WithDefault, payload)
    }

    fn deliver_now(
        &self,
        event_type: EventType,
        priority: Priority,
        route: Route,
        payload: P,
    ) -> Result<(), EventError> {
        let subscriptions = self
            .registry
            .read()
            .snapshot(event_type, route == Route::WithDefault);
        debug!(
            "📣 broadcast: event_type={}, priority={}, route={:?}, listeners={}",
            event_type,
            priority,
            route,
            subscriptions.len()
        );
        self.stats.broadcast();

        for subscription in &subscriptions {
            self.invoke(subscription, event_type, &payload)?;
        }
        Ok(())
    }

    /// Calls one listener, recording the outcome.
    pub(super) fn invoke(
        &self,
        subscription: &Subscription<P>,
        event_type: EventType,
        payload: &P,
    ) -> Result<(), EventError> {
        trace!(
            "invoke: event_type={}, listener={}, priority={}",
            event_type,
            subscription.listener.name(),
            subscription.priority
        );
        self.stats.invoked();

        subscription.listener.invoke(payload).map_err(|e| {
            self.stats.failed();
            warn!(
                "❌ Listener {} failed on event_type={}: {}",
                subscription.listener.name(),
                event_type,
                e
            );
            e
        })
    }

    /// Drops queued events without invoking any listener.
    ///
    /// With a non-empty set only events of those types are removed; otherwise
    /// the whole queue is emptied. Returns the number of events dropped.
    pub fn flush(&self, event_types: Option<&HashSet<EventType>>) -> usize {
        let queue = self.queue.lock();
        let flushed = match event_types.filter(|types| !types.is_empty()) {
            Some(types) => queue.borrow_mut().remove_types(types),
            None => queue.borrow_mut().clear(),
        };
        self.stats.flushed(flushed);
        debug!("🧹 flush: event_types={:?}, flushed={}", event_types, flushed);
        flushed
    }
}
