//! Batch scheduler - bounded fan-out and result collection
//!
//! Runs one dispatcher loop per task with at most N tasks in flight, where N
//! is the pool size. The concurrency bound is a [`ThrottleLanes`] pool: a
//! task must hold a lane for its whole dispatcher run, and each lane carries
//! the throttle state of one call stream, so pacing survives across the
//! short-lived tasks that share the lane.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::dispatch::{Dispatcher, Task, TaskResult};
use crate::pool::EndpointPool;
use crate::throttle::Throttle;

/// Fixed set of call streams, each with its own throttle
///
/// Holds `size` lanes behind a semaphore with `size` permits. Acquiring
/// yields one free lane; dropping the [`Lane`] returns it. At most `size`
/// holders exist at any moment, which is the batch concurrency ceiling.
pub struct ThrottleLanes {
    permits: Arc<Semaphore>,
    lanes: Vec<Arc<Mutex<Throttle>>>,
}

/// Exclusive hold on one call stream for the duration of a task
pub struct Lane {
    throttle: OwnedMutexGuard<Throttle>,
    _permit: OwnedSemaphorePermit,
}

impl Lane {
    pub fn throttle(&mut self) -> &mut Throttle {
        &mut self.throttle
    }
}

impl ThrottleLanes {
    pub fn new(size: usize, interval: Duration) -> Self {
        debug!(size, ?interval, "ThrottleLanes::new: called");
        Self {
            permits: Arc::new(Semaphore::new(size)),
            lanes: (0..size).map(|_| Arc::new(Mutex::new(Throttle::new(interval)))).collect(),
        }
    }

    /// Wait for a free lane and take exclusive hold of it
    pub async fn acquire(&self) -> Lane {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .expect("lane semaphore should never close");

        for lane in &self.lanes {
            if let Ok(throttle) = lane.clone().try_lock_owned() {
                return Lane { throttle, _permit: permit };
            }
        }

        // A lane's lock is only ever held together with a permit, and the
        // lock is released first, so a fresh permit guarantees a free lane.
        unreachable!("permit held but no free lane");
    }
}

/// Fans a task batch out over the endpoint pool and collects every result
pub struct BatchScheduler {
    dispatcher: Arc<Dispatcher>,
    lanes: Arc<ThrottleLanes>,
}

impl BatchScheduler {
    /// Create a scheduler over `pool` with concurrency fixed at the pool size
    pub fn new(pool: Arc<EndpointPool>, call_interval: Duration, max_attempts: usize) -> Self {
        let lanes = Arc::new(ThrottleLanes::new(pool.size(), call_interval));
        Self {
            dispatcher: Arc::new(Dispatcher::new(pool, max_attempts)),
            lanes,
        }
    }

    /// Run every task to completion and return the index -> value mapping
    ///
    /// Returns only once each submitted task has produced exactly one entry.
    /// A task that dies unexpectedly (a panic in its execution) is logged and
    /// recorded as a soft failure; the batch itself never aborts early.
    pub async fn run_batch(&self, tasks: Vec<Task>) -> HashMap<usize, Option<String>> {
        let total = tasks.len();
        info!(total, "run_batch: starting");

        let mut join: JoinSet<TaskResult> = JoinSet::new();
        let mut submitted: HashMap<tokio::task::Id, usize> = HashMap::with_capacity(total);

        for task in tasks {
            let dispatcher = Arc::clone(&self.dispatcher);
            let lanes = Arc::clone(&self.lanes);
            let index = task.index;

            let handle = join.spawn(async move {
                let mut lane = lanes.acquire().await;
                dispatcher.run(&task, lane.throttle()).await
            });
            submitted.insert(handle.id(), index);
        }

        let mut results: HashMap<usize, Option<String>> = HashMap::with_capacity(total);
        while let Some(joined) = join.join_next_with_id().await {
            match joined {
                Ok((id, result)) => {
                    submitted.remove(&id);
                    let previous = results.insert(result.index, result.value);
                    debug_assert!(previous.is_none(), "duplicate result for task {}", result.index);
                }
                Err(join_err) => match submitted.remove(&join_err.id()) {
                    Some(index) => {
                        error!(task = index, error = %join_err, "task execution died, recording empty result");
                        results.insert(index, None);
                    }
                    None => {
                        error!(error = %join_err, "execution died for an unknown task");
                    }
                },
            }
        }

        let failures = results.values().filter(|value| value.is_none()).count();
        info!(total, failures, "run_batch: complete");
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatClient;
    use crate::llm::client::mock::{InFlightGauge, MockChatClient};
    use tokio::time::Instant;

    fn pool_of(clients: Vec<MockChatClient>) -> Arc<EndpointPool> {
        let endpoints = clients
            .into_iter()
            .enumerate()
            .map(|(i, client)| {
                let client: Arc<dyn ChatClient> = Arc::new(client);
                (format!("m{i}"), client)
            })
            .collect();
        Arc::new(EndpointPool::new(endpoints).unwrap())
    }

    fn batch(len: usize) -> Vec<Task> {
        (0..len)
            .map(|index| Task {
                index,
                prompt: format!("prompt {index}"),
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_task_gets_exactly_one_result() {
        let gauge = Arc::new(InFlightGauge::default());
        let clients = (0..4)
            .map(|i| {
                MockChatClient::ok(format!("m{i}"), "answer")
                    .with_delay(Duration::from_millis(10))
                    .with_gauge(gauge.clone())
            })
            .collect();
        let scheduler = BatchScheduler::new(pool_of(clients), Duration::ZERO, 3);

        let results = scheduler.run_batch(batch(100)).await;

        assert_eq!(results.len(), 100);
        for index in 0..100 {
            assert_eq!(results.get(&index).and_then(|v| v.as_deref()), Some("answer"));
        }
        // Peak in-flight calls never exceed the pool size
        assert_eq!(gauge.peak(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_endpoints_down_completes_with_sentinels() {
        let clients = (0..3).map(|i| MockChatClient::failing(format!("m{i}"))).collect();
        let scheduler = BatchScheduler::new(pool_of(clients), Duration::ZERO, 3);

        let results = scheduler.run_batch(batch(9)).await;

        assert_eq!(results.len(), 9);
        assert!(results.values().all(|value| value.is_none()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_task_becomes_soft_failure() {
        let clients = vec![
            MockChatClient::panicking("m0"),
            MockChatClient::ok("m1", "fine"),
        ];
        let scheduler = BatchScheduler::new(pool_of(clients), Duration::ZERO, 1);

        let results = scheduler.run_batch(batch(4)).await;

        assert_eq!(results.len(), 4);
        // Even indices start on the panicking slot and get the sentinel;
        // odd indices never touch it
        assert_eq!(results[&0], None);
        assert_eq!(results[&2], None);
        assert_eq!(results[&1].as_deref(), Some("fine"));
        assert_eq!(results[&3].as_deref(), Some("fine"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_lane_paces_consecutive_tasks() {
        let interval = Duration::from_secs(2);
        let clients = vec![MockChatClient::ok("m0", "answer")];
        let scheduler = BatchScheduler::new(pool_of(clients), interval, 3);

        let start = Instant::now();
        let results = scheduler.run_batch(batch(3)).await;

        assert_eq!(results.len(), 3);
        // Three calls on one stream: starts at 0s, 2s, 4s
        assert!(start.elapsed() >= interval * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deterministic_batch_is_idempotent() {
        let make_scheduler = || {
            let clients = vec![
                MockChatClient::failing("m0"),
                MockChatClient::ok("m1", "b"),
                MockChatClient::ok("m2", "c"),
            ];
            BatchScheduler::new(pool_of(clients), Duration::ZERO, 3)
        };

        let first = make_scheduler().run_batch(batch(12)).await;
        let second = make_scheduler().run_batch(batch(12)).await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_lane_returns_on_drop() {
        let lanes = ThrottleLanes::new(1, Duration::ZERO);

        let lane = lanes.acquire().await;
        drop(lane);
        // Would hang if the lane or permit leaked
        let _lane = lanes.acquire().await;
    }
}
