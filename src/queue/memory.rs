//! In-memory request queue.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::RequestQueue;
use crate::crawl::FetchRequest;
use crate::error_handling::QueueError;

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<FetchRequest>,
    known: HashSet<String>,
    in_progress: HashSet<String>,
    handled: usize,
}

/// Mutex-guarded FIFO plus the set of every key ever added.
#[derive(Debug, Default)]
pub struct MemoryRequestQueue {
    state: Mutex<QueueState>,
}

impl MemoryRequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut QueueState) -> T) -> T {
        match self.state.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    #[cfg(test)]
    pub fn handled_count(&self) -> usize {
        self.with_state(|s| s.handled)
    }
}

#[async_trait]
impl RequestQueue for MemoryRequestQueue {
    async fn add_request(&self, request: FetchRequest) -> Result<bool, QueueError> {
        Ok(self.with_state(|s| {
            if !s.known.insert(request.unique_key.clone()) {
                return false;
            }
            s.pending.push_back(request);
            true
        }))
    }

    async fn fetch_next(&self) -> Result<Option<FetchRequest>, QueueError> {
        Ok(self.with_state(|s| {
            let request = s.pending.pop_front()?;
            s.in_progress.insert(request.unique_key.clone());
            Some(request)
        }))
    }

    async fn mark_handled(&self, request: &FetchRequest) -> Result<(), QueueError> {
        self.with_state(|s| {
            if s.in_progress.remove(&request.unique_key) {
                s.handled += 1;
            }
        });
        Ok(())
    }

    async fn is_finished(&self) -> Result<bool, QueueError> {
        Ok(self.with_state(|s| s.pending.is_empty() && s.in_progress.is_empty()))
    }

    async fn pending_count(&self) -> Result<usize, QueueError> {
        Ok(self.with_state(|s| s.pending.len()))
    }
}
