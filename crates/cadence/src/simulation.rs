//! Synthetic game workload driven by the frame loop.
//!
//! Publisher threads queue a steady stream of input, collision, spawn and
//! audio events. Listeners simulate a fixed amount of work per call so that
//! the per-frame dispatch budget actually bites.

use crate::config::SimulationSettings;
use cadence_event_system::{
    EventError, EventSystem, EventType, ListenerHandle, Priority, DEFAULT_GROUP,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, trace, warn};

pub const INPUT: EventType = 1;
pub const COLLISION: EventType = 2;
pub const SPAWN: EventType = 3;
pub const AUDIO: EventType = 4;

/// Group that only listens for input while the game is paused.
pub const PAUSED_GROUP: &str = "paused";

/// Payload carried by every simulated event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameEvent {
    /// Index of the publisher thread that queued the event
    pub publisher: usize,
    /// Per-publisher sequence number
    pub sequence: u64,
}

fn simulate_work(cost: Duration) {
    if !cost.is_zero() {
        thread::sleep(cost);
    }
}

fn worker(name: &'static str, cost: Duration) -> ListenerHandle<GameEvent> {
    ListenerHandle::named(name, move |event: &GameEvent| {
        simulate_work(cost);
        trace!(
            "{} handled event #{} from publisher {}",
            name,
            event.sequence,
            event.publisher
        );
        Ok(())
    })
}

/// Registers the gameplay listeners in the default group and the pause menu
/// listener in the [`PAUSED_GROUP`], leaving the default group active.
///
/// Must run while the queue is empty, before any publisher starts.
pub fn install_listeners(
    events: &EventSystem<GameEvent>,
    cost: Duration,
) -> Result<(), EventError> {
    events.subscribe_with_priority(INPUT, worker("input", cost), 0);
    events.subscribe_with_priority(COLLISION, worker("physics", cost), 10);
    events.subscribe_with_priority(COLLISION, worker("damage", cost), 20);
    events.subscribe_with_priority(SPAWN, worker("spawner", cost), 0);
    events.subscribe(AUDIO, worker("audio", cost));

    events.create_subscriber_group(PAUSED_GROUP);
    events.set_active_subscriber_group(PAUSED_GROUP, false)?;
    events.subscribe(INPUT, worker("pause_menu", cost));
    events.set_active_subscriber_group(DEFAULT_GROUP, false)?;

    debug!(
        "Installed {} gameplay listeners and the pause menu",
        events.subscriber_count()
    );
    Ok(())
}

/// Picks the event type and priority for a publisher's `sequence`-th event.
///
/// Input always outranks collisions, which outrank spawns and audio.
pub fn classify(sequence: u64) -> (EventType, Priority) {
    let jitter = (sequence.wrapping_mul(7919) % 50) as Priority;
    match sequence % 4 {
        0 => (INPUT, jitter),
        1 => (COLLISION, 100 + jitter),
        2 => (SPAWN, 200 + jitter),
        _ => (AUDIO, 300 + jitter),
    }
}

/// Background threads publishing events at frame cadence.
pub struct PublisherPool {
    stop: Arc<AtomicBool>,
    handles: Vec<thread::JoinHandle<u64>>,
}

impl PublisherPool {
    /// Starts `settings.publisher_threads` named publisher threads.
    pub fn spawn(
        events: Arc<EventSystem<GameEvent>>,
        settings: &SimulationSettings,
        tick: Duration,
    ) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(settings.publisher_threads);

        for publisher in 0..settings.publisher_threads {
            let events = events.clone();
            let stop = stop.clone();
            let per_frame = settings.events_per_frame;

            let handle = thread::Builder::new()
                .name(format!("publisher-{publisher}"))
                .spawn(move || {
                    let mut sequence = 0u64;
                    while !stop.load(Ordering::Acquire) {
                        for _ in 0..per_frame {
                            let payload = GameEvent {
                                publisher,
                                sequence,
                            };
                            match classify(sequence) {
                                // Spawns must be seen by gameplay even while paused.
                                (SPAWN, priority) => events.publish_default(SPAWN, priority, payload),
                                (event_type, priority) => {
                                    events.publish_with_priority(event_type, priority, payload)
                                }
                            }
                            sequence += 1;
                        }
                        thread::sleep(tick);
                    }
                    sequence
                })?;
            handles.push(handle);
        }

        debug!("Started {} publisher threads", handles.len());
        Ok(Self { stop, handles })
    }

    /// Stops every publisher and returns how many events they queued in total.
    pub fn shutdown(self) -> u64 {
        self.stop.store(true, Ordering::Release);
        self.handles
            .into_iter()
            .filter_map(|handle| match handle.join() {
                Ok(published) => Some(published),
                Err(_) => {
                    warn!("⚠️ A publisher thread panicked");
                    None
                }
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_listeners() {
        let events = EventSystem::new();
        install_listeners(&events, Duration::ZERO).unwrap();

        assert_eq!(events.active_group(), DEFAULT_GROUP);
        assert_eq!(events.subscriber_count(), 5);
        assert_eq!(events.subscribers_for(COLLISION), 2);
        assert!(events.has_group(PAUSED_GROUP));

        events.set_active_subscriber_group(PAUSED_GROUP, false).unwrap();
        assert_eq!(events.subscriber_count(), 1);
        assert_eq!(events.subscribers_for(INPUT), 1);
    }

    #[test]
    fn test_classify_keeps_input_ahead() {
        for sequence in 0..400 {
            let (event_type, priority) = classify(sequence);
            let band = match event_type {
                INPUT => 0..50,
                COLLISION => 100..150,
                SPAWN => 200..250,
                AUDIO => 300..350,
                other => panic!("unexpected event type {other}"),
            };
            assert!(band.contains(&priority), "{event_type}: {priority}");
        }
    }

    #[test]
    fn test_publisher_pool_counts_published_events() {
        let events = Arc::new(EventSystem::new());
        let settings = SimulationSettings {
            publisher_threads: 3,
            events_per_frame: 4,
            listener_cost_us: 0,
            pause_every_frames: 0,
        };

        let pool = PublisherPool::spawn(events.clone(), &settings, Duration::from_millis(1))
            .unwrap();
        thread::sleep(Duration::from_millis(10));
        let published = pool.shutdown();

        assert!(published >= 12);
        assert_eq!(published, events.queue_len() as u64);
        assert_eq!(published, events.stats().events_published);
    }
}
