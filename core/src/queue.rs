use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sniffr_common::network::host::Observation;

/// FIFO hand-off between the capture threads and the aggregator.
///
/// A capture thread holding the lock is not receiving, so each access is a
/// single append or a single batch swap.
#[derive(Debug, Clone, Default)]
pub struct ObservationQueue {
    inner: Arc<Mutex<VecDeque<Observation>>>,
}

impl ObservationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, observation: Observation) {
        self.lock().push_back(observation);
    }

    /// Takes everything queued so far, in enqueue order, under one lock
    /// acquisition.
    pub fn drain(&self) -> VecDeque<Observation> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Observation>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
