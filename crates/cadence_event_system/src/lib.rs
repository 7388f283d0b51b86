//! # Cadence Event System
//!
//! An in-process publish/subscribe dispatcher for real-time applications such
//! as game loops. Events are queued with a priority and delivered in priority
//! order by a dispatch pass that fits inside a per-frame time budget. An
//! immediate broadcast path bypasses the queue for logically synchronous
//! signals.
//!
//! ## Core Features
//!
//! - **Priority Ordering**: Lower priority values are delivered first, for
//!   events in the queue and for listeners of one event
//! - **Frame Budgets**: A dispatch pass stops between listener calls once its
//!   budget is spent and leaves undelivered events queued for the next frame
//! - **Type Filters**: A pass can be restricted to a set of event types; the
//!   rest stay queued untouched
//! - **Subscriber Groups**: Named sets of subscriptions (menu, gameplay,
//!   paused...) with exactly one active at a time
//! - **Thread Safety**: Publish, subscribe and dispatch may be called from any
//!   thread and from inside listeners
//!
//! ## Quick Start Example
//!
//! ```rust
//! use cadence_event_system::{Budget, EventSystem, ListenerHandle};
//!
//! const PLAYER_HIT: u32 = 1;
//!
//! let events: EventSystem<u32> = EventSystem::new();
//! events.subscribe_with_priority(PLAYER_HIT, ListenerHandle::new(|damage: &u32| {
//!     println!("took {damage} damage");
//!     Ok(())
//! }), 10);
//!
//! // Anywhere during the frame...
//! events.publish_with_priority(PLAYER_HIT, 0, 25);
//!
//! // ...and once per frame in the game loop, with a 4ms budget.
//! events.dispatch(Budget::from_millis(4), None).unwrap();
//! assert_eq!(events.queue_len(), 0);
//! ```
//!
//! ## Subscriber Groups
//!
//! ```rust
//! use cadence_event_system::{EventError, EventSystem, ListenerHandle};
//!
//! let events: EventSystem<()> = EventSystem::new();
//! events.create_subscriber_group("paused");
//!
//! events.publish(1, ());
//! // Queued events were published against the current group.
//! assert_eq!(
//!     events.set_active_subscriber_group("paused", false),
//!     Err(EventError::PendingEvents { queued: 1 })
//! );
//! events.set_active_subscriber_group("paused", true).unwrap();
//! assert_eq!(events.active_group(), "paused");
//! ```

pub mod budget;
pub mod events;
pub mod queue;
pub mod registry;
pub mod system;

// Re-export commonly used items for convenience
pub use budget::Budget;
pub use events::{
    Event, EventError, EventType, Listener, ListenerHandle, NamedListener, Priority, Route,
    LOWEST_PRIORITY,
};
pub use queue::EventQueue;
pub use registry::{GroupRegistry, SubscriberGroup, Subscription, DEFAULT_GROUP};
pub use system::{create_event_system, EventSystem, EventSystemStats};

/// Result type used throughout the event system
pub type Result<T> = std::result::Result<T, EventError>;
