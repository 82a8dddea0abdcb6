//! Typed notifications published by the circuit and the simulator.
//!
//! UI and board collaborators call [`EventBus::subscribe`] and drain the
//! returned channel on their own schedule; the core never calls back into
//! them directly. Each subscription buffers at most [`SUBSCRIBER_CAPACITY`]
//! events; a subscriber that falls further behind misses the newest ones.

use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::element::ComponentId;

/// Events buffered per subscriber before further events are dropped.
pub const SUBSCRIBER_CAPACITY: usize = 1024;

/// Receiving end handed out by [`EventBus::subscribe`].
pub type Subscription = Receiver<Event>;

/// A simulation or topology notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Nodes or bindings changed; the simulator must re-index.
    TopologyChanged,
    SimulationStarted,
    SimulationStopped,
    SimulationReset,
    /// One full nonlinear resolve finished.
    StepCompleted { iterations: usize, time: f64 },
    ConvergenceAchieved { iterations: usize },
    ConvergenceFailed { iterations: usize },
    SolverError(String),
    /// A component's derived state changed (LED on/off, brightness, pin value).
    ComponentStateChanged { component: ComponentId },
    /// A component entered its overloaded state. Sent once per transition.
    OverloadDetected { component: ComponentId },
}

/// Fan-out publisher for [`Event`]s.
///
/// Clones share the same subscriber list. Subscribers whose receiver has
/// been dropped are pruned on the next publish. Publishing never blocks.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Sender<Event>>>>,
}

impl EventBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = channel::bounded(SUBSCRIBER_CAPACITY);
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver an event to every live subscriber.
    pub fn publish(&self, event: Event) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                log::debug!("subscriber queue full, dropping {:?}", dropped);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    /// Number of registered subscribers (including ones not yet pruned).
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(Event::SimulationStarted);

        assert_eq!(a.try_recv().ok(), Some(Event::SimulationStarted));
        assert_eq!(b.try_recv().ok(), Some(Event::SimulationStarted));
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(Event::TopologyChanged);

        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.try_recv().ok(), Some(Event::TopologyChanged));
    }

    #[test]
    fn test_clones_share_subscribers() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        let clone = bus.clone();

        clone.publish(Event::ConvergenceFailed { iterations: 100 });

        assert_eq!(
            rx.try_recv().ok(),
            Some(Event::ConvergenceFailed { iterations: 100 })
        );
    }

    #[test]
    fn test_full_subscriber_drops_newest() {
        let bus = EventBus::new();
        let rx = bus.subscribe();

        for iterations in 0..SUBSCRIBER_CAPACITY + 10 {
            bus.publish(Event::ConvergenceAchieved { iterations });
        }

        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(rx.len(), SUBSCRIBER_CAPACITY);
        assert_eq!(
            rx.try_recv().ok(),
            Some(Event::ConvergenceAchieved { iterations: 0 })
        );
        assert_eq!(
            rx.try_iter().last(),
            Some(Event::ConvergenceAchieved {
                iterations: SUBSCRIBER_CAPACITY - 1
            })
        );
    }
}
