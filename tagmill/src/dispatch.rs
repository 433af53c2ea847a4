//! Round-robin failover dispatch - the core of tagmill
//!
//! Every task starts at the slot given by its index, and each retryable
//! failure advances to the next slot (wrapping) until the attempt budget is
//! spent. Slot choice is a pure function of (task index, attempt, pool size),
//! so tasks never coordinate over selection state. A task that exhausts its
//! budget yields an empty result instead of aborting the batch.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::pool::EndpointPool;
use crate::throttle::Throttle;

/// One unit of work: an input record's position and its opaque payload
#[derive(Debug, Clone)]
pub struct Task {
    pub index: usize,
    pub prompt: String,
}

/// Terminal outcome for one task
///
/// `value` is `None` after the attempt budget is exhausted - the soft-failure
/// sentinel. The batch treats both outcomes as completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub index: usize,
    pub value: Option<String>,
}

/// Dispatch state, driven by per-attempt outcomes
enum DispatchState {
    Attempting { attempt: usize },
    Succeeded { value: String },
    Exhausted,
}

/// Per-attempt outcome consumed by the state machine
enum AttemptOutcome {
    Completed(String),
    Failed,
}

/// Slot position for an attempt: round-robin from the task's base slot
pub(crate) fn slot_position(index: usize, attempt: usize, size: usize) -> usize {
    (index % size + attempt) % size
}

/// Runs one task to completion against the endpoint pool
pub struct Dispatcher {
    pool: Arc<EndpointPool>,
    max_attempts: usize,
}

impl Dispatcher {
    pub fn new(pool: Arc<EndpointPool>, max_attempts: usize) -> Self {
        debug!(pool_size = pool.size(), max_attempts, "Dispatcher::new: called");
        Self { pool, max_attempts }
    }

    /// Run the task's attempt loop and return its terminal result
    ///
    /// The caller supplies its stream's throttle; pacing happens before every
    /// outbound call, including retries.
    pub async fn run(&self, task: &Task, throttle: &mut Throttle) -> TaskResult {
        let mut state = DispatchState::Attempting { attempt: 0 };

        loop {
            state = match state {
                DispatchState::Attempting { attempt } if attempt >= self.max_attempts => DispatchState::Exhausted,
                DispatchState::Attempting { attempt } => match self.attempt(task, attempt, throttle).await {
                    Ok(AttemptOutcome::Completed(value)) => DispatchState::Succeeded { value },
                    Ok(AttemptOutcome::Failed) => DispatchState::Attempting { attempt: attempt + 1 },
                    // Slot lookup failed - a defect, not an endpoint problem.
                    // Give this task up without burning the remaining budget.
                    Err(_) => DispatchState::Exhausted,
                },
                DispatchState::Succeeded { value } => {
                    return TaskResult {
                        index: task.index,
                        value: Some(value),
                    };
                }
                DispatchState::Exhausted => {
                    warn!(
                        task = task.index,
                        attempts = self.max_attempts,
                        "giving up, recording empty result"
                    );
                    return TaskResult {
                        index: task.index,
                        value: None,
                    };
                }
            };
        }
    }

    /// Issue one paced call against the attempt's slot
    async fn attempt(
        &self,
        task: &Task,
        attempt: usize,
        throttle: &mut Throttle,
    ) -> Result<AttemptOutcome, crate::pool::PoolError> {
        let position = slot_position(task.index, attempt, self.pool.size());
        let slot = match self.pool.slot_at(position) {
            Ok(slot) => slot,
            Err(err) => {
                error!(task = task.index, position, error = %err, "slot lookup failed");
                return Err(err);
            }
        };

        throttle.pace().await;

        match slot.client.complete(&task.prompt).await {
            Ok(value) => {
                info!(
                    task = task.index,
                    endpoint = %slot.identity,
                    attempt,
                    "attempt succeeded"
                );
                Ok(AttemptOutcome::Completed(value))
            }
            Err(err) => {
                warn!(
                    task = task.index,
                    endpoint = %slot.identity,
                    attempt,
                    error = %err,
                    "attempt failed, trying next endpoint"
                );
                Ok(AttemptOutcome::Failed)
            }
        }
    }
}
