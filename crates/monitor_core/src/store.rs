//! Single-slot holder of the latest published state.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

pub struct StateStore<S> {
    tx: Arc<watch::Sender<S>>,
}

impl<S> Clone for StateStore<S> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<S: Clone> StateStore<S> {
    pub fn new(initial: S) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Replaces the current state and wakes every observer.
    pub fn emit(&self, state: S) {
        self.tx.send_replace(state);
    }

    pub fn current(&self) -> S {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.tx.subscribe()
    }

    /// Yields the current state first, then every later one.
    pub fn stream(&self) -> WatchStream<S>
    where
        S: Send + Sync + 'static,
    {
        WatchStream::new(self.tx.subscribe())
    }
}

impl<S: Clone + Default> Default for StateStore<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}
