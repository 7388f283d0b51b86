//! Priority-ordered event queue.
//!
//! A binary min-heap keyed on event priority. `push` and `pop_min` are
//! logarithmic, `remove_where` is a linear filter followed by a heap rebuild.
//!
//! Among events of equal priority the pop order is unspecified: it depends on
//! the heap's internal layout, not on insertion order. Callers must not rely on
//! FIFO behaviour for ties.
//!
//! Events skipped by a filtered dispatch pass are parked rather than handed
//! out of the queue. Parked events are invisible to `pop_min` but still count
//! as queued, so `len`, `clear` and `remove_where` see them while the pass is
//! running. `unpark` puts them back with a single heap rebuild.

use crate::events::{Event, EventType, Route};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

/// Multiset of events awaiting dispatch, popped lowest priority first.
pub struct EventQueue<P> {
    heap: BinaryHeap<Reverse<Event<P>>>,
    /// Events set aside by the running dispatch pass
    parked: Vec<Event<P>>,
    /// Queued events (heap and parked) that also target the default group
    default_routed: usize,
}

impl<P> EventQueue<P> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            parked: Vec::new(),
            default_routed: 0,
        }
    }

    /// Adds an event to the queue.
    #[inline]
    pub fn push(&mut self, event: Event<P>) {
        if event.route == Route::WithDefault {
            self.default_routed += 1;
        }
        self.heap.push(Reverse(event));
    }

    /// Removes and returns the event with the lowest priority value.
    ///
    /// Parked events are never returned.
    #[inline]
    pub fn pop_min(&mut self) -> Option<Event<P>> {
        let Reverse(event) = self.heap.pop()?;
        if event.route == Route::WithDefault {
            self.default_routed -= 1;
        }
        Some(event)
    }

    /// Holds a popped event back until the next `unpark`.
    pub fn park(&mut self, event: Event<P>) {
        if event.route == Route::WithDefault {
            self.default_routed += 1;
        }
        self.parked.push(event);
    }

    /// Returns every parked event to the heap with a single rebuild.
    pub fn unpark(&mut self) -> usize {
        let count = self.parked.len();
        if count == 0 {
            return 0;
        }
        let mut items = std::mem::take(&mut self.heap).into_vec();
        items.extend(self.parked.drain(..).map(Reverse));
        self.heap = BinaryHeap::from(items);
        count
    }

    /// Number of queued events, parked ones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len() + self.parked.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty() && self.parked.is_empty()
    }

    /// Number of events currently parked.
    #[inline]
    pub fn parked_len(&self) -> usize {
        self.parked.len()
    }

    /// Returns true if any queued event also targets the default group.
    #[inline]
    pub fn has_default_routed(&self) -> bool {
        self.default_routed > 0
    }

    /// Removes every event matching `predicate`, parked or not, returning how
    /// many were dropped.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Event<P>) -> bool,
    {
        let before = self.len();
        self.heap.retain(|Reverse(event)| !predicate(event));
        self.parked.retain(|event| !predicate(event));
        self.recount_default_routed();
        before - self.len()
    }

    /// Removes every event whose type is in `event_types`.
    pub fn remove_types(&mut self, event_types: &HashSet<EventType>) -> usize {
        self.remove_where(|event| event_types.contains(&event.event_type))
    }

    /// Drops every queued event, parked ones included, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.len();
        self.heap.clear();
        self.parked.clear();
        self.default_routed = 0;
        count
    }

    fn recount_default_routed(&mut self) {
        let is_routed = |event: &Event<P>| event.route == Route::WithDefault;
        self.default_routed = self.heap.iter().filter(|Reverse(event)| is_routed(event)).count()
            + self.parked.iter().filter(|event| is_routed(event)).count();
    }
}

impl<P> Default for EventQueue<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> std::fmt::Debug for EventQueue<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("len", &self.heap.len())
            .field("parked", &self.parked.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain_priorities(queue: &mut EventQueue<&'static str>) -> Vec<i64> {
        std::iter::from_fn(|| queue.pop_min())
            .map(|event| event.priority)
            .collect()
    }

    #[test]
    fn test_pop_returns_minimum_priority() {
        let mut queue = EventQueue::new();
        for priority in [42, 7, 19, -3, 100, 0, 8] {
            queue.push(Event::new(1, priority, "payload"));
        }

        assert_eq!(queue.len(), 7);
        assert_eq!(drain_priorities(&mut queue), vec![-3, 0, 7, 8, 19, 42, 100]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_empty_queue_is_not_an_error() {
        let mut queue: EventQueue<()> = EventQueue::new();
        assert!(queue.pop_min().is_none());
        assert_eq!(queue.remove_where(|_| true), 0);
        assert_eq!(queue.clear(), 0);
        assert_eq!(queue.unpark(), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_equal_priorities_all_come_out() {
        // Ties have no defined order, only the multiset is checked.
        let mut queue = EventQueue::new();
        queue.push(Event::new(1, 5, "a"));
        queue.push(Event::new(2, 5, "b"));
        queue.push(Event::new(3, 5, "c"));
        queue.push(Event::new(4, 1, "first"));

        assert_eq!(queue.pop_min().map(|e| e.payload), Some("first"));
        let mut rest: Vec<_> = std::iter::from_fn(|| queue.pop_min())
            .map(|e| e.payload)
            .collect();
        rest.sort_unstable();
        assert_eq!(rest, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove_types_keeps_heap_order() {
        let mut queue = EventQueue::new();
        queue.push(Event::new(1, 30, "one"));
        queue.push(Event::new(2, 10, "two"));
        queue.push(Event::new(1, 20, "one"));
        queue.push(Event::new(2, 5, "two"));
        queue.push(Event::new(3, 1, "three"));

        let removed = queue.remove_types(&HashSet::from([2]));
        assert_eq!(removed, 2);
        assert_eq!(queue.len(), 3);
        assert_eq!(drain_priorities(&mut queue), vec![1, 20, 30]);
    }

    #[test]
    fn test_default_routed_tracking() {
        let mut queue = EventQueue::new();
        queue.push(Event::new(1, 1, "plain"));
        queue.push(Event::new(2, 2, "routed").with_route(Route::WithDefault));
        assert!(queue.has_default_routed());

        queue.remove_types(&HashSet::from([2]));
        assert!(!queue.has_default_routed());

        queue.park(Event::new(2, 0, "routed").with_route(Route::WithDefault));
        assert!(queue.has_default_routed());
        queue.unpark();
        assert_eq!(queue.pop_min().map(|e| e.payload), Some("routed"));
        assert!(!queue.has_default_routed());
    }

    #[test]
    fn test_parked_events_are_queued_but_not_popped() {
        let mut queue = EventQueue::new();
        queue.push(Event::new(1, 4, "kept"));
        queue.push(Event::new(2, 2, "early"));
        queue.push(Event::new(2, 9, "late"));

        let early = queue.pop_min().unwrap();
        queue.park(early);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.parked_len(), 1);
        assert_eq!(queue.pop_min().map(|e| e.payload), Some("kept"));
        let late = queue.pop_min().unwrap();
        queue.park(late);
        assert!(queue.pop_min().is_none());
        assert!(!queue.is_empty());

        assert_eq!(queue.unpark(), 2);
        assert_eq!(queue.parked_len(), 0);
        assert_eq!(drain_priorities(&mut queue), vec![2, 9]);
    }

    #[test]
    fn test_clear_and_remove_reach_parked_events() {
        let mut queue = EventQueue::new();
        queue.push(Event::new(1, 1, "one"));
        queue.park(Event::new(2, 0, "two"));
        queue.park(Event::new(3, 0, "three"));

        assert_eq!(queue.remove_types(&HashSet::from([2])), 1);
        assert_eq!(queue.parked_len(), 1);
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.unpark(), 0);
    }
}
