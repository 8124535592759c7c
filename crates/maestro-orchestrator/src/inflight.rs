//! In-flight request bookkeeping.
//!
//! All reads and writes go through one mutex, which is never held across an
//! `.await`. Each registration gets a generation number so that a request
//! cancelled and resubmitted under the same id is never deregistered by the
//! stale execution.

use maestro_core::{OrchestratorError, OrchestratorResult, RequestId, RequestState};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

use crate::events::{EventBus, OrchestratorEvent};

#[derive(Debug)]
struct Entry {
    token: CancellationToken,
    generation: u64,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<RequestId, Entry>,
    next_generation: u64,
    current_model: Option<String>,
}

/// Point-in-time view of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InFlightSnapshot {
    pub active: Vec<RequestId>,
    pub current_model: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct InFlightRegistry {
    state: Mutex<State>,
}

impl InFlightRegistry {
    fn lock(&self) -> MutexGuard<'_, State> {
        // The critical sections cannot leave the map half-updated.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `id`, failing if it is already in flight.
    pub fn register(&self, id: &RequestId) -> OrchestratorResult<(CancellationToken, u64)> {
        let mut state = self.lock();
        if state.entries.contains_key(id) {
            return Err(OrchestratorError::DuplicateRequest(id.clone()));
        }
        state.next_generation += 1;
        let generation = state.next_generation;
        let token = CancellationToken::new();
        state.entries.insert(
            id.clone(),
            Entry {
                token: token.clone(),
                generation,
            },
        );
        Ok((token, generation))
    }

    /// Signal and remove the entry for `id`. Returns false if not in flight.
    pub fn cancel(&self, id: &RequestId) -> bool {
        let removed = self.lock().entries.remove(id);
        match removed {
            Some(entry) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Remove the entry for `id` if it still belongs to `generation`.
    ///
    /// Returns false if the entry was already gone, which means the request
    /// was cancelled. Once this returns true, `cancel` no longer sees the
    /// request.
    pub fn deregister(&self, id: &RequestId, generation: u64) -> bool {
        let mut state = self.lock();
        if state
            .entries
            .get(id)
            .is_some_and(|entry| entry.generation == generation)
        {
            state.entries.remove(id);
            true
        } else {
            false
        }
    }

    pub fn set_current_model(&self, model: &str) {
        self.lock().current_model = Some(model.to_string());
    }

    pub fn snapshot(&self) -> InFlightSnapshot {
        let state = self.lock();
        let mut active: Vec<RequestId> = state.entries.keys().cloned().collect();
        active.sort();
        InFlightSnapshot {
            active,
            current_model: state.current_model.clone(),
        }
    }
}

/// Deregisters a request and publishes `RequestEnded` when dropped.
///
/// The guard is created in `Running`. Dropping it without
/// [`finish`](Self::finish) (an aborted or panicking execution) reports the
/// request as `Cancelled`.
pub(crate) struct InFlightGuard<'a> {
    registry: &'a InFlightRegistry,
    events: &'a EventBus,
    id: RequestId,
    generation: u64,
    state: RequestState,
}

impl<'a> InFlightGuard<'a> {
    pub fn new(
        registry: &'a InFlightRegistry,
        events: &'a EventBus,
        id: RequestId,
        generation: u64,
    ) -> Self {
        Self {
            registry,
            events,
            id,
            generation,
            state: RequestState::Running,
        }
    }

    /// End the request in `state`.
    pub fn finish(mut self, state: RequestState) {
        self.state = state;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            self.state = RequestState::Cancelled;
        }
        self.registry.deregister(&self.id, self.generation);
        tracing::info!(request_id = %self.id, state = %self.state, "Request ended");
        self.events.publish(OrchestratorEvent::RequestEnded {
            request_id: self.id.clone(),
            state: self.state,
        });
    }
}
