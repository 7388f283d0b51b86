//! Subscriber groups and the registry that switches between them.
//!
//! A [`SubscriberGroup`] maps event types to subscription lists kept sorted by
//! ascending priority. The [`GroupRegistry`] owns every group by name, always
//! holds a group called [`DEFAULT_GROUP`], and tracks which group is active.
//!
//! Subscription lists use `SmallVec` since most event types have only a
//! handful of listeners, and are cheap to snapshot because each entry is just a
//! priority plus an `Arc`.

use crate::events::{EventType, ListenerHandle, Priority};
use compact_str::CompactString;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Name of the group that always exists and is active after construction or reset.
pub const DEFAULT_GROUP: &str = "default";

/// Inline capacity of a subscription list before it spills to the heap.
const INLINE_SUBSCRIPTIONS: usize = 4;

/// Ordered list of subscriptions for one event type.
pub type SubscriptionList<P> = SmallVec<[Subscription<P>; INLINE_SUBSCRIPTIONS]>;

/// A prioritized registration of a listener.
///
/// Ordering is by priority only; the listener carries identity but no order.
pub struct Subscription<P> {
    pub priority: Priority,
    pub listener: ListenerHandle<P>,
}

impl<P> Subscription<P> {
    pub fn new(priority: Priority, listener: ListenerHandle<P>) -> Self {
        Self { priority, listener }
    }
}

impl<P> Clone for Subscription<P> {
    fn clone(&self) -> Self {
        Self {
            priority: self.priority,
            listener: self.listener.clone(),
        }
    }
}

impl<P: 'static> std::fmt::Debug for Subscription<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("priority", &self.priority)
            .field("listener", &self.listener.name())
            .finish()
    }
}

/// Mapping from event type to its subscriptions, each list sorted by priority.
///
/// A missing key means "no subscribers", never an error.
pub struct SubscriberGroup<P> {
    subscriptions: HashMap<EventType, SubscriptionList<P>>,
}

impl<P: 'static> SubscriberGroup<P> {
    pub fn new() -> Self {
        Self {
            subscriptions: HashMap::new(),
        }
    }

    /// Inserts a subscription keeping the list sorted by ascending priority.
    ///
    /// Duplicate registrations of the same listener are all kept.
    pub fn insert(&mut self, event_type: EventType, subscription: Subscription<P>) {
        let list = self.subscriptions.entry(event_type).or_default();
        let position = list.partition_point(|existing| existing.priority <= subscription.priority);
        list.insert(position, subscription);
    }

    /// Removes every subscription of `listener` for `event_type`.
    ///
    /// Returns the number of subscriptions removed.
    pub fn remove(&mut self, event_type: EventType, listener: &ListenerHandle<P>) -> usize {
        let Some(list) = self.subscriptions.get_mut(&event_type) else {
            return 0;
        };

        let before = list.len();
        list.retain(|subscription| !subscription.listener.same_listener(listener));
        let removed = before - list.len();

        if list.is_empty() {
            self.subscriptions.remove(&event_type);
        }
        removed
    }

    /// Empties the group in place. The mapping stays usable for new subscriptions.
    pub fn clear(&mut self) -> usize {
        let removed = self.len();
        self.subscriptions.clear();
        removed
    }

    /// Subscriptions for an event type, in delivery order.
    pub fn get(&self, event_type: EventType) -> &[Subscription<P>] {
        self.subscriptions
            .get(&event_type)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }

    /// Total number of subscriptions across all event types.
    pub fn len(&self) -> usize {
        self.subscriptions.values().map(|list| list.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.values().all(|list| list.is_empty())
    }

    /// Event types that currently have at least one subscription.
    pub fn event_types(&self) -> impl Iterator<Item = EventType> + '_ {
        self.subscriptions
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(event_type, _)| *event_type)
    }
}

impl<P: 'static> Default for SubscriberGroup<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Named subscriber groups plus the currently active one.
///
/// Invariants: a group named [`DEFAULT_GROUP`] always exists, and the active
/// name always refers to a group present in the registry. Groups are never
/// deleted, so switching is the only way the active name changes.
pub struct GroupRegistry<P> {
    groups: HashMap<CompactString, SubscriberGroup<P>>,
    active: CompactString,
}

impl<P: 'static> GroupRegistry<P> {
    /// Creates a registry holding only an empty, active default group.
    pub fn new() -> Self {
        let mut groups = HashMap::new();
        groups.insert(CompactString::new(DEFAULT_GROUP), SubscriberGroup::new());
        Self {
            groups,
            active: CompactString::new(DEFAULT_GROUP),
        }
    }

    /// Inserts an empty group under `name`, replacing any existing group.
    ///
    /// Replacing the active group leaves it active, now empty.
    pub fn create_group(&mut self, name: &str) -> bool {
        self.groups
            .insert(CompactString::new(name), SubscriberGroup::new())
            .is_some()
    }

    /// Makes `name` the active group if it exists.
    pub fn set_active(&mut self, name: &str) -> bool {
        match self.groups.get_key_value(name) {
            Some((key, _)) => {
                self.active = key.clone();
                true
            }
            None => false,
        }
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    pub fn active(&self) -> &SubscriberGroup<P> {
        self.groups
            .get(&self.active)
            .expect("active subscriber group is always registered")
    }

    pub fn active_mut(&mut self) -> &mut SubscriberGroup<P> {
        self.groups
            .get_mut(&self.active)
            .expect("active subscriber group is always registered")
    }

    pub fn default_group(&self) -> &SubscriberGroup<P> {
        self.groups
            .get(DEFAULT_GROUP)
            .expect("default subscriber group is always registered")
    }

    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Names of every registered group, sorted.
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.keys().map(|name| name.to_string()).collect();
        names.sort_unstable();
        names
    }

    /// Returns true if the active group is the default group.
    pub fn default_is_active(&self) -> bool {
        self.active.as_str() == DEFAULT_GROUP
    }
}

impl<P: 'static> GroupRegistry<P> {
    /// Point-in-time copy of the subscriptions an event should reach.
    ///
    /// For default-routed events the active and default lists are merged by
    /// ascending priority. When the default group is active it is only
    /// consulted once.
    pub fn snapshot(&self, event_type: EventType, include_default: bool) -> SubscriptionList<P> {
        let active = self.active().get(event_type);
        if !include_default || self.default_is_active() {
            return active.iter().cloned().collect();
        }

        let default = self.default_group().get(event_type);
        let mut merged = SubscriptionList::with_capacity(active.len() + default.len());
        let (mut a, mut d) = (active.iter().peekable(), default.iter().peekable());
        loop {
            let take_active = match (a.peek(), d.peek()) {
                (Some(x), Some(y)) => x.priority <= y.priority,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            let next = if take_active { a.next() } else { d.next() };
            merged.extend(next.cloned());
        }
        merged
    }
}

impl<P: 'static> Default for GroupRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listener() -> ListenerHandle<()> {
        ListenerHandle::new(|_: &()| Ok(()))
    }

    fn priorities(list: &[Subscription<()>]) -> Vec<i64> {
        list.iter().map(|s| s.priority).collect()
    }

    #[test]
    fn test_insert_keeps_priority_order() {
        let mut group = SubscriberGroup::new();
        for priority in [5, 1, 9, 3, 3, -2] {
            group.insert(1, Subscription::new(priority, listener()));
        }

        assert_eq!(priorities(group.get(1)), vec![-2, 1, 3, 3, 5, 9]);
        assert_eq!(group.len(), 6);
        assert!(group.get(2).is_empty());
    }

    #[test]
    fn test_remove_by_identity_removes_duplicates() {
        let mut group = SubscriberGroup::new();
        let target = listener();
        let bystander = listener();
        group.insert(1, Subscription::new(1, target.clone()));
        group.insert(1, Subscription::new(2, bystander.clone()));
        group.insert(1, Subscription::new(3, target.clone()));

        assert_eq!(group.remove(1, &target), 2);
        assert_eq!(group.get(1).len(), 1);
        assert!(group.get(1)[0].listener.same_listener(&bystander));

        // Unknown type or listener is a no-op.
        assert_eq!(group.remove(42, &target), 0);
        assert_eq!(group.remove(1, &target), 0);
    }

    #[test]
    fn test_clear_keeps_group_usable() {
        let mut group = SubscriberGroup::new();
        group.insert(1, Subscription::new(1, listener()));
        group.insert(2, Subscription::new(1, listener()));

        assert_eq!(group.clear(), 2);
        assert!(group.is_empty());

        group.insert(3, Subscription::new(1, listener()));
        assert_eq!(group.len(), 1);
        assert_eq!(group.event_types().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_registry_starts_with_active_default() {
        let registry: GroupRegistry<()> = GroupRegistry::new();
        assert_eq!(registry.active_name(), DEFAULT_GROUP);
        assert!(registry.default_is_active());
        assert_eq!(registry.group_names(), vec![DEFAULT_GROUP.to_string()]);
    }

    #[test]
    fn test_set_active_requires_existing_group() {
        let mut registry: GroupRegistry<()> = GroupRegistry::new();
        assert!(!registry.set_active("menu"));
        assert_eq!(registry.active_name(), DEFAULT_GROUP);

        assert!(!registry.create_group("menu"));
        assert!(registry.set_active("menu"));
        assert_eq!(registry.active_name(), "menu");
    }

    #[test]
    fn test_recreating_active_group_empties_it() {
        let mut registry: GroupRegistry<()> = GroupRegistry::new();
        registry.create_group("menu");
        registry.set_active("menu");
        registry.active_mut().insert(1, Subscription::new(1, listener()));

        assert!(registry.create_group("menu"));
        assert_eq!(registry.active_name(), "menu");
        assert!(registry.active().is_empty());
    }

    #[test]
    fn test_snapshot_merges_default_group_by_priority() {
        let mut registry: GroupRegistry<()> = GroupRegistry::new();
        registry.active_mut().insert(1, Subscription::new(2, listener()));
        registry.active_mut().insert(1, Subscription::new(6, listener()));
        registry.create_group("game");
        registry.set_active("game");
        registry.active_mut().insert(1, Subscription::new(1, listener()));
        registry.active_mut().insert(1, Subscription::new(4, listener()));

        assert_eq!(priorities(&registry.snapshot(1, false)), vec![1, 4]);
        assert_eq!(priorities(&registry.snapshot(1, true)), vec![1, 2, 4, 6]);
    }

    #[test]
    fn test_snapshot_with_default_active_is_not_doubled() {
        let mut registry: GroupRegistry<()> = GroupRegistry::new();
        registry.active_mut().insert(1, Subscription::new(1, listener()));

        assert_eq!(registry.snapshot(1, true).len(), 1);
    }
}
