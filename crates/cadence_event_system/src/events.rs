//! # Events and Listeners
//!
//! The value records that flow through the dispatcher and the capability
//! interface listeners implement.
//!
//! - [`Event`] - a prioritized, typed unit of deferred work carrying an opaque payload
//! - [`Listener`] - anything that can be invoked with a payload reference
//! - [`ListenerHandle`] - a shared, identity-comparable listener reference
//! - [`EventError`] - every failure the event system can report
//!
//! ## Ordering
//!
//! Events compare by priority only. Lower values are dispatched earlier and the
//! payload never participates in ordering or equality. Two events with the same
//! priority are "equal" for ordering purposes, so their relative delivery order
//! is unspecified.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Integer tag identifying the kind of an event.
pub type EventType = u32;

/// Delivery priority. Lower values are delivered first.
pub type Priority = i64;

/// Sentinel priority used when the caller does not specify one.
///
/// Unprioritized events and subscriptions sink to the back of their queue.
pub const LOWEST_PRIORITY: Priority = Priority::MAX;

/// Which subscriber groups an event is resolved against at delivery time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    /// Only the subscriber group active at delivery time.
    #[default]
    Active,
    /// The active group plus the "default" group, merged by subscription priority.
    WithDefault,
}

/// A queued event awaiting dispatch.
///
/// The payload is owned by the event until the dispatcher hands a reference of
/// it to each matching listener.
pub struct Event<P> {
    /// Delivery priority, lower first
    pub priority: Priority,
    /// Type tag used to resolve subscriptions
    pub event_type: EventType,
    /// Caller-supplied payload; never inspected by the event system
    pub payload: P,
    /// Group resolution rule
    pub route: Route,
}

impl<P> Event<P> {
    /// Creates an event routed to the active subscriber group.
    pub fn new(event_type: EventType, priority: Priority, payload: P) -> Self {
        Self {
            priority,
            event_type,
            payload,
            route: Route::Active,
        }
    }

    /// Changes how the event is resolved against subscriber groups.
    pub fn with_route(mut self, route: Route) -> Self {
        self.route = route;
        self
    }
}

impl<P> fmt::Debug for Event<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("priority", &self.priority)
            .field("event_type", &self.event_type)
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}

impl<P> PartialEq for Event<P> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}

impl<P> Eq for Event<P> {}

impl<P> PartialOrd for Event<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P> Ord for Event<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority.cmp(&other.priority)
    }
}

/// Capability interface for event listeners.
///
/// Listeners are invoked synchronously on the thread that runs `dispatch` or
/// `broadcast`. They may publish, subscribe and unsubscribe re-entrantly but
/// must not dispatch.
///
/// Closures of the form `Fn(&P) -> Result<(), EventError>` implement this
/// trait automatically.
///
/// # Examples
///
/// ```rust
/// use cadence_event_system::{EventSystem, ListenerHandle};
///
/// let events: EventSystem<String> = EventSystem::new();
/// let greeter = ListenerHandle::new(|name: &String| {
///     println!("hello {name}");
///     Ok(())
/// });
/// events.subscribe(1, greeter.clone());
/// events.publish(1, "world".to_string());
/// events.dispatch_all().unwrap();
/// events.unsubscribe(1, &greeter);
/// ```
pub trait Listener<P>: Send + Sync + 'static {
    /// Handles one event payload.
    ///
    /// Returning an error aborts the dispatch pass that invoked the listener.
    fn handle(&self, payload: &P) -> Result<(), EventError>;

    /// Human-readable name used in log output.
    fn name(&self) -> &str {
        "anonymous"
    }
}

impl<P, F> Listener<P> for F
where
    F: Fn(&P) -> Result<(), EventError> + Send + Sync + 'static,
{
    fn handle(&self, payload: &P) -> Result<(), EventError> {
        self(payload)
    }
}

/// A closure listener carrying a name for diagnostics.
pub struct NamedListener<F> {
    name: String,
    handler: F,
}

impl<F> NamedListener<F> {
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

impl<P, F> Listener<P> for NamedListener<F>
where
    F: Fn(&P) -> Result<(), EventError> + Send + Sync + 'static,
{
    fn handle(&self, payload: &P) -> Result<(), EventError> {
        (self.handler)(payload)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Shared reference to a listener.
///
/// Two handles are equal when they point at the same listener allocation, which
/// is what `unsubscribe` matches on. Clone the handle you subscribed with to
/// remove it later; wrapping the same closure twice yields two distinct
/// listeners.
pub struct ListenerHandle<P> {
    inner: Arc<dyn Listener<P>>,
}

impl<P: 'static> ListenerHandle<P> {
    /// Wraps a closure in a new shared handle.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&P) -> Result<(), EventError> + Send + Sync + 'static,
    {
        Self::from_listener(handler)
    }

    /// Wraps a closure together with a diagnostic name.
    pub fn named<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&P) -> Result<(), EventError> + Send + Sync + 'static,
    {
        Self::from_listener(NamedListener::new(name, handler))
    }

    /// Wraps any [`Listener`] implementation in a new shared handle.
    pub fn from_listener<L>(listener: L) -> Self
    where
        L: Listener<P>,
    {
        Self {
            inner: Arc::new(listener),
        }
    }
}

impl<P: 'static> ListenerHandle<P> {
    /// Invokes the listener with a payload.
    #[inline]
    pub fn invoke(&self, payload: &P) -> Result<(), EventError> {
        self.inner.handle(payload)
    }

    /// The listener's diagnostic name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Returns true if both handles refer to the same listener.
    #[inline]
    pub fn same_listener(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

impl<P> Clone for ListenerHandle<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: 'static> PartialEq for ListenerHandle<P> {
    fn eq(&self, other: &Self) -> bool {
        self.same_listener(other)
    }
}

impl<P: 'static> Eq for ListenerHandle<P> {}

impl<P: 'static> fmt::Debug for ListenerHandle<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ListenerHandle").field(&self.name()).finish()
    }
}

/// Errors that can occur during event system operations.
///
/// Every variant is a recoverable logic error surfaced synchronously to the
/// caller of the offending operation. Missing subscribers or an empty queue are
/// never errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// A subscriber group switch was attempted while events were still queued
    #[error("Attempt to switch subscriber group with non-empty event queue ({queued} pending)")]
    PendingEvents { queued: usize },
    /// The requested subscriber group was never created
    #[error("Unknown subscriber group: {0}")]
    UnknownGroup(String),
    /// `dispatch` was called while a dispatch pass was already running on this call chain
    #[error("Cannot dispatch from within a dispatch pass")]
    ReentrantDispatch,
    /// A listener failed while handling an event
    #[error("Handler execution error: {0}")]
    HandlerExecution(String),
}
