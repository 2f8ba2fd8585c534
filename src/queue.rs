//! Bounded priority background execution queue (spec §5.2).
//!
//! Jobs are ordered by `(priority, sequence)`: lower priority value first, and
//! among equal priorities, earlier-submitted first. `N` subscriber tasks pull
//! from a shared `BinaryHeap` guarded by a `Mutex` plus a `Notify` to wake
//! idle subscribers — there's no off-the-shelf async priority queue in the
//! dependency stack, so this hand-rolls over `Mutex` plus `Notify` rather
//! than reaching for a new crate.
//! `Poll` is destructive: a completed task is removed from the live map the
//! first time its result is observed.

use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, Semaphore};
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::error::{EngineError, Result};

pub type BoxedJob = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

struct QueuedJob {
    priority: i32,
    seq: u64,
    id: Uuid,
    job: BoxedJob,
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lower priority value runs first (spec §3: "priority, lower = earlier"),
        // so a lower value must sort as "greater" for this max-heap.
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Outcome of a submitted background task, as observed through [`BackgroundQueue::poll`].
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Running,
    Completed(std::result::Result<Value, String>),
}

/// A handle to a submitted background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskHandle(pub Uuid);

struct Heap {
    jobs: BinaryHeap<QueuedJob>,
}

/// Bounded priority queue feeding `N` background worker subscribers.
pub struct BackgroundQueue {
    heap: Arc<Mutex<Heap>>,
    notify: Arc<Notify>,
    capacity: Arc<Semaphore>,
    sequence: AtomicU64,
    tasks: Arc<Mutex<HashMap<Uuid, TaskOutcome>>>,
    shutting_down: Arc<AtomicBool>,
    subscriber_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl BackgroundQueue {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            heap: Arc::new(Mutex::new(Heap {
                jobs: BinaryHeap::new(),
            })),
            notify: Arc::new(Notify::new()),
            capacity: Arc::new(Semaphore::new(capacity.max(1))),
            sequence: AtomicU64::new(0),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            shutting_down: Arc::new(AtomicBool::new(false)),
            subscriber_handles: Mutex::new(Vec::new()),
        })
    }

    /// Starts `n` subscriber tasks draining the queue. Call once at engine
    /// scope entry (spec §5.2).
    pub async fn spawn_subscribers(self: &Arc<Self>, n: usize) {
        let mut handles = self.subscriber_handles.lock().await;
        for i in 0..n {
            let this = self.clone();
            handles.push(tokio::spawn(async move { this.subscriber_loop(i).await }));
        }
    }

    async fn subscriber_loop(self: Arc<Self>, worker_id: usize) {
        loop {
            if self.shutting_down.load(AtomicOrdering::SeqCst) {
                return;
            }

            let next = {
                let mut heap = self.heap.lock().await;
                heap.jobs.pop()
            };

            let Some(queued) = next else {
                tokio::select! {
                    _ = self.notify.notified() => continue,
                    _ = tokio::time::sleep(std::time::Duration::from_millis(100)) => continue,
                }
            };

            debug!("background worker {} running task {}", worker_id, queued.id);
            let result = queued.job.await;
            self.capacity.add_permits(1);

            self.tasks.lock().await.insert(
                queued.id,
                TaskOutcome::Completed(result.map_err(|e| e.to_string())),
            );
        }
    }

    /// Enqueues a job at the given priority. Blocks until the bounded queue
    /// has room.
    pub async fn submit(self: &Arc<Self>, priority: i32, job: BoxedJob) -> Result<TaskHandle> {
        let permit = self
            .capacity
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| EngineError::Protocol("background queue closed".into()))?;
        permit.forget();

        let id = Uuid::new_v4();
        let seq = self.sequence.fetch_add(1, AtomicOrdering::SeqCst);

        self.tasks.lock().await.insert(id, TaskOutcome::Running);
        self.heap.lock().await.jobs.push(QueuedJob {
            priority,
            seq,
            id,
            job,
        });
        self.notify.notify_one();

        Ok(TaskHandle(id))
    }

    /// Destructively observes a task's result: once `Completed` is returned,
    /// the task is removed from the live map and a second `poll` returns
    /// [`EngineError::NotFound`] (spec §5.2).
    pub async fn poll(&self, handle: TaskHandle) -> Result<TaskOutcome> {
        let mut tasks = self.tasks.lock().await;
        match tasks.get(&handle.0) {
            Some(TaskOutcome::Running) => Ok(TaskOutcome::Running),
            Some(TaskOutcome::Completed(_)) => {
                Ok(tasks.remove(&handle.0).expect("checked present above"))
            }
            None => Err(EngineError::not_found(handle.0.to_string())),
        }
    }

    /// Stops every subscriber task. Live (unpolled) task results are dropped.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, AtomicOrdering::SeqCst);
        self.notify.notify_waiters();
        let mut handles = self.subscriber_handles.lock().await;
        for handle in handles.drain(..) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_job(value: i64) -> BoxedJob {
        Box::pin(async move { Ok(Value::from(value)) })
    }

    #[tokio::test]
    async fn test_submit_and_poll_completed_task() {
        let queue = BackgroundQueue::new(8);
        queue.spawn_subscribers(2).await;

        let handle = queue.submit(1, ok_job(42)).await.unwrap();

        let outcome = loop {
            match queue.poll(handle).await.unwrap() {
                TaskOutcome::Running => tokio::task::yield_now().await,
                done @ TaskOutcome::Completed(_) => break done,
            }
        };

        match outcome {
            TaskOutcome::Completed(Ok(v)) => assert_eq!(v, Value::from(42)),
            other => panic!("unexpected outcome: {other:?}"),
        }

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_poll_is_destructive() {
        let queue = BackgroundQueue::new(8);
        queue.spawn_subscribers(1).await;

        let handle = queue.submit(1, ok_job(1)).await.unwrap();
        loop {
            if matches!(queue.poll(handle).await.unwrap(), TaskOutcome::Completed(_)) {
                break;
            }
            tokio::task::yield_now().await;
        }

        let second = queue.poll(handle).await;
        assert!(matches!(second, Err(EngineError::NotFound(_))));
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_lower_priority_value_runs_first() {
        let queue = BackgroundQueue::new(8);
        // No subscribers yet: jobs queue up in priority order before draining.
        let low_value = queue.submit(10, ok_job(1)).await.unwrap();
        let high_value = queue.submit(0, ok_job(2)).await.unwrap();

        queue.spawn_subscribers(1).await;

        let mut results = Vec::new();
        for handle in [high_value, low_value] {
            loop {
                match queue.poll(handle).await.unwrap() {
                    TaskOutcome::Completed(Ok(v)) => {
                        results.push(v);
                        break;
                    }
                    _ => tokio::task::yield_now().await,
                }
            }
        }
        assert_eq!(results, vec![Value::from(2), Value::from(1)]);
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_priority_ties_broken_by_arrival_order() {
        let queue = BackgroundQueue::new(8);
        let x = queue.submit(5, ok_job(1)).await.unwrap();
        let y = queue.submit(1, ok_job(2)).await.unwrap();
        let z = queue.submit(5, ok_job(3)).await.unwrap();

        queue.spawn_subscribers(1).await;

        let mut results = Vec::new();
        for handle in [y, x, z] {
            loop {
                match queue.poll(handle).await.unwrap() {
                    TaskOutcome::Completed(Ok(v)) => {
                        results.push(v);
                        break;
                    }
                    _ => tokio::task::yield_now().await,
                }
            }
        }
        assert_eq!(results, vec![Value::from(2), Value::from(1), Value::from(3)]);
        queue.shutdown().await;
    }
}
