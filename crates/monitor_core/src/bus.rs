//! Bounded, single-consumer intent queue that drops the oldest entry on overflow.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use tokio::sync::Notify;
use tracing::debug;

use crate::error::BusError;

/// Events that can be produced without any payload by the refresh timer.
pub trait RefreshEvent {
    fn refresh() -> Self;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Published {
    Queued,
    /// The buffer was full; the oldest pending event was discarded to make room.
    DroppedOldest,
    Closed,
}

pub struct EventBus<E> {
    shared: Arc<Shared<E>>,
}

pub struct EventReceiver<E> {
    shared: Arc<Shared<E>>,
}

struct Shared<E> {
    name: &'static str,
    capacity: usize,
    queue: Mutex<Queue<E>>,
    ready: Notify,
    subscribed: AtomicBool,
}

struct Queue<E> {
    pending: VecDeque<E>,
    dropped: u64,
    closed: bool,
}

impl<E> Shared<E> {
    fn lock(&self) -> MutexGuard<'_, Queue<E>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E> EventBus<E> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            shared: Arc::new(Shared {
                name,
                capacity,
                queue: Mutex::new(Queue {
                    pending: VecDeque::with_capacity(capacity),
                    dropped: 0,
                    closed: false,
                }),
                ready: Notify::new(),
                subscribed: AtomicBool::new(false),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Never blocks. A full buffer loses its oldest pending event.
    pub fn publish(&self, event: E) -> Published {
        let outcome = {
            let mut queue = self.shared.lock();
            if queue.closed {
                return Published::Closed;
            }
            let outcome = if queue.pending.len() >= self.shared.capacity {
                queue.pending.pop_front();
                queue.dropped += 1;
                Published::DroppedOldest
            } else {
                Published::Queued
            };
            queue.pending.push_back(event);
            outcome
        };

        self.shared.ready.notify_one();
        if outcome == Published::DroppedOldest {
            debug!(bus = self.shared.name, "event bus full; dropped oldest pending event");
        }
        outcome
    }

    /// Registers the one consumer this bus feeds.
    pub fn subscribe(&self) -> Result<EventReceiver<E>, BusError> {
        if self.shared.subscribed.swap(true, Ordering::AcqRel) {
            return Err(BusError::AlreadySubscribed(self.shared.name));
        }
        Ok(EventReceiver {
            shared: Arc::clone(&self.shared),
        })
    }

    /// Rejects further events. The consumer still drains what is pending.
    pub fn close(&self) {
        self.shared.lock().closed = true;
        self.shared.ready.notify_one();
    }

    pub fn pending(&self) -> usize {
        self.shared.lock().pending.len()
    }

    pub fn dropped(&self) -> u64 {
        self.shared.lock().dropped
    }

    pub fn refresh(&self) -> Published
    where
        E: RefreshEvent,
    {
        self.publish(E::refresh())
    }
}

impl<E> EventReceiver<E> {
    /// Waits for the next event; `None` once the bus is closed and drained.
    pub async fn recv(&mut self) -> Option<E> {
        loop {
            {
                let mut queue = self.shared.lock();
                if let Some(event) = queue.pending.pop_front() {
                    return Some(event);
                }
                if queue.closed {
                    return None;
                }
            }
            self.shared.ready.notified().await;
        }
    }

    pub fn try_recv(&mut self) -> Option<E> {
        self.shared.lock().pending.pop_front()
    }
}

impl<E> Drop for EventReceiver<E> {
    fn drop(&mut self) {
        self.shared.subscribed.store(false, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "tests/bus_tests.rs"]
mod tests;
