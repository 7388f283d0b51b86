//! Subscription and subscriber group management

use crate::events::{EventError, EventType, ListenerHandle, Priority, LOWEST_PRIORITY};
use crate::registry::Subscription;
use super::core::EventSystem;
use tracing::debug;

impl<P: Send + 'static> EventSystem<P> {
    /// Registers a listener for an event type in the active group at the lowest priority.
    pub fn subscribe(&self, event_type: EventType, listener: ListenerHandle<P>) {
        self.subscribe_with_priority(event_type, listener, LOWEST_PRIORITY);
    }

    /// Registers a listener for an event type in the active group.
    ///
    /// Listeners of one event are called in ascending priority order. The same
    /// listener may be registered more than once and will then be called once
    /// per registration.
    pub fn subscribe_with_priority(
        &self,
        event_type: EventType,
        listener: ListenerHandle<P>,
        priority: Priority,
    ) {
        let mut registry = self.registry.write();
        debug!(
            "📝 subscribe: event_type={}, priority={}, listener={}, group={}",
            event_type,
            priority,
            listener.name(),
            registry.active_name()
        );
        registry
            .active_mut()
            .insert(event_type, Subscription::new(priority, listener));
    }

    /// Removes every registration of `listener` for `event_type` in the active group.
    ///
    /// Unknown event types or listeners are ignored. Returns how many
    /// registrations were removed.
    pub fn unsubscribe(&self, event_type: EventType, listener: &ListenerHandle<P>) -> usize {
        let removed = self.registry.write().active_mut().remove(event_type, listener);
        debug!(
            "unsubscribe: event_type={}, listener={}, removed={}",
            event_type,
            listener.name(),
            removed
        );
        removed
    }

    /// Removes every subscription of every event type from the active group.
    ///
    /// The group itself stays registered and accepts new subscriptions.
    pub fn unsubscribe_all(&self) -> usize {
        let mut registry = self.registry.write();
        let removed = registry.active_mut().clear();
        debug!(
            "unsubscribe_all: group={}, removed={}",
            registry.active_name(),
            removed
        );
        removed
    }

    /// Creates an empty subscriber group, silently replacing one with the same name.
    pub fn create_subscriber_group(&self, name: &str) {
        let replaced = self.registry.write().create_group(name);
        debug!(
            "create subscriber group: name=\"{}\", replaced={}",
            name, replaced
        );
    }

    /// Switches which subscriber group receives events.
    ///
    /// With `flush` set, the queue is emptied first. The switch is then refused
    /// with [`EventError::PendingEvents`] while events are still queued, since
    /// they were published against the old group. Only after both steps is the
    /// name looked up: a group that was never created fails with
    /// [`EventError::UnknownGroup`], and a flush requested alongside it has
    /// already happened.
    pub fn set_active_subscriber_group(&self, name: &str, flush: bool) -> Result<(), EventError> {
        let queue = self.queue.lock();
        let mut registry = self.registry.write();

        if flush {
            let flushed = queue.borrow_mut().clear();
            self.stats.flushed(flushed);
            debug!("flush: {} events discarded before group switch", flushed);
        }

        let queued = queue.borrow().len();
        if queued != 0 {
            return Err(EventError::PendingEvents { queued });
        }

        if !registry.contains(name) {
            return Err(EventError::UnknownGroup(name.to_string()));
        }

        registry.set_active(name);
        debug!("set active subscriber group: name=\"{}\"", name);
        Ok(())
    }

    /// Name of the active subscriber group.
    pub fn active_group(&self) -> String {
        self.registry.read().active_name().to_string()
    }

    /// Names of every subscriber group, sorted.
    pub fn group_names(&self) -> Vec<String> {
        self.registry.read().group_names()
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.registry.read().contains(name)
    }

    /// Total subscriptions in the active group across all event types.
    pub fn subscriber_count(&self) -> usize {
        self.registry.read().active().len()
    }

    /// Subscriptions for one event type in the active group.
    pub fn subscribers_for(&self, event_type: EventType) -> usize {
        self.registry.read().active().get(event_type).len()
    }
}
