//! Recording broadcast events in tests.

use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

/// Collects events from a broadcast receiver.
///
/// Generic over the event type so it can sit below the crates that define
/// their own event enums.
#[derive(Debug)]
pub struct EventRecorder<T> {
    receiver: broadcast::Receiver<T>,
    events: Vec<T>,
    lagged: u64,
}

impl<T: Clone> EventRecorder<T> {
    pub fn new(receiver: broadcast::Receiver<T>) -> Self {
        Self {
            receiver,
            events: Vec::new(),
            lagged: 0,
        }
    }

    /// Pull everything already published without waiting.
    pub fn drain(&mut self) -> &[T] {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => self.events.push(event),
                Err(TryRecvError::Lagged(n)) => self.lagged += n,
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        &self.events
    }

    /// Wait up to `timeout` for the next event and record it.
    pub async fn next(&mut self, timeout: Duration) -> Option<T> {
        loop {
            match tokio::time::timeout(timeout, self.receiver.recv()).await {
                Ok(Ok(event)) => {
                    self.events.push(event.clone());
                    return Some(event);
                }
                Ok(Err(RecvError::Lagged(n))) => self.lagged += n,
                Ok(Err(RecvError::Closed)) | Err(_) => return None,
            }
        }
    }

    /// Receive until an event matches `predicate`, recording everything seen.
    /// Gives up after `timeout` per event.
    pub async fn wait_for<F>(&mut self, timeout: Duration, predicate: F) -> Option<T>
    where
        F: Fn(&T) -> bool,
    {
        while let Some(event) = self.next(timeout).await {
            if predicate(&event) {
                return Some(event);
            }
        }
        None
    }

    /// Everything recorded so far, in arrival order.
    pub fn events(&self) -> &[T] {
        &self.events
    }

    /// Number of events the receiver dropped for falling behind.
    pub fn lagged(&self) -> u64 {
        self.lagged
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
