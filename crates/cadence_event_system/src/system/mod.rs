//! Event system module - broken down into manageable components

mod core;
mod dispatch;
mod emitters;
mod handlers;
mod stats;

// Re-export all public items from submodules
pub use core::EventSystem;
pub use stats::EventSystemStats;

use std::sync::Arc;

/// Helper function to create a shareable event system
pub fn create_event_system<P: Send + 'static>() -> Arc<EventSystem<P>> {
    Arc::new(EventSystem::new())
}
