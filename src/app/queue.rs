use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::app::model::RecordingJob;

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<RecordingJob>,
    /// Pushed jobs that have not been marked done yet.
    outstanding: usize,
}

/// Pending recording jobs plus a barrier that opens once every pushed job
/// has been popped and marked done.
#[derive(Debug, Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    drained: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, job: RecordingJob) {
        let mut state = self.lock();
        state.pending.push_back(job);
        state.outstanding += 1;
    }

    /// Returns `None` as soon as nothing is pending, even while other jobs are in flight.
    pub fn try_pop(&self) -> Option<RecordingJob> {
        self.lock().pending.pop_front()
    }

    /// Call once per popped job, whatever its outcome.
    pub fn mark_done(&self) {
        let mut state = self.lock();
        if state.outstanding == 0 {
            tracing::warn!("mark_done called with no outstanding jobs");
            return;
        }
        state.outstanding -= 1;
        if state.outstanding == 0 {
            self.drained.notify_waiters();
        }
    }

    pub async fn wait_until_drained(&self) {
        loop {
            // Registered before the check so a concurrent final mark_done is not missed.
            let notified = self.drained.notified();
            if self.lock().outstanding == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Number of jobs not yet popped.
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn outstanding(&self) -> usize {
        self.lock().outstanding
    }
}

impl FromIterator<RecordingJob> for WorkQueue {
    fn from_iter<I: IntoIterator<Item = RecordingJob>>(iter: I) -> Self {
        let queue = WorkQueue::new();
        for job in iter {
            queue.push(job);
        }
        queue
    }
}

/// Marks the popped job done when dropped, including on unwind.
pub struct DoneGuard<'a> {
    queue: &'a WorkQueue,
}

impl<'a> DoneGuard<'a> {
    pub fn new(queue: &'a WorkQueue) -> Self {
        Self { queue }
    }
}

impl Drop for DoneGuard<'_> {
    fn drop(&mut self) {
        self.queue.mark_done();
    }
}
