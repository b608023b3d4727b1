//! Worker pool that moves songs from `Pending` to `Ready` by invoking
//! the resolver, honoring priority, bounded retry with backoff, and a
//! pool-level circuit breaker per failure class.

mod breaker;
mod error;
mod priority;
mod task;

pub use breaker::FailureClass;
pub use error::{ProcessorError, Result};
pub use priority::Priority;
pub use task::{ProcessingTask, ProgressCallback};

use aural_cache::Cache;
use aural_resolver::Resolve;
use breaker::CircuitBreaker;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

const BASE_DELAY: Duration = Duration::from_millis(500);
const CAP_DELAY: Duration = Duration::from_secs(30);
const BREAKER_TRIP_THRESHOLD: u32 = 5;
const BREAKER_COOLDOWN: Duration = Duration::from_secs(60);

struct QueueEntry {
    task: ProcessingTask,
    seq: u64,
    _permit: OwnedSemaphorePermit,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.task.priority == other.task.priority && self.seq == other.seq
    }
}
impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    /// Higher priority sorts greater (pops first); among equal
    /// priorities, the lower sequence number (enqueued earlier) sorts
    /// greater, giving FIFO order within a priority class.
    fn cmp(&self, other: &Self) -> Ordering {
        self.task
            .priority
            .cmp(&other.task.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Moves songs from `Pending` to `Ready`. Shared across tenants; tasks
/// reference songs owned by whichever tracklist enqueued them.
pub struct Processor<R: Resolve> {
    cache: Arc<Cache<R>>,
    heap: std::sync::Mutex<BinaryHeap<QueueEntry>>,
    notify: Notify,
    semaphore: Arc<Semaphore>,
    next_seq: AtomicU64,
    cancelled: std::sync::Mutex<HashSet<Uuid>>,
    running: std::sync::Mutex<HashMap<Uuid, CancellationToken>>,
    breaker: CircuitBreaker,
    accepting: AtomicBool,
    shutdown: CancellationToken,
    workers: std::sync::Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl<R: Resolve + 'static> Processor<R> {
    /// Spawns `worker_count` workers draining a queue bounded at
    /// `queue_capacity`.
    pub fn spawn(cache: Arc<Cache<R>>, worker_count: usize, queue_capacity: usize) -> Arc<Self> {
        let processor = Arc::new(Self {
            cache,
            heap: std::sync::Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
            semaphore: Arc::new(Semaphore::new(queue_capacity)),
            next_seq: AtomicU64::new(0),
            cancelled: std::sync::Mutex::new(HashSet::new()),
            running: std::sync::Mutex::new(HashMap::new()),
            breaker: CircuitBreaker::new(BREAKER_TRIP_THRESHOLD, BREAKER_COOLDOWN),
            accepting: AtomicBool::new(true),
            shutdown: CancellationToken::new(),
            workers: std::sync::Mutex::new(Vec::new()),
        });

        let handles: Vec<_> = (0..worker_count)
            .map(|id| {
                let worker_processor = processor.clone();
                tokio::spawn(async move { worker_processor.worker_loop(id).await })
            })
            .collect();
        *processor.workers.lock().unwrap() = handles;

        processor
    }

    /// Enqueues `task`, suspending if the queue is at capacity.
    pub async fn queue(self: &Arc<Self>, task: ProcessingTask) -> Result<()> {
        if !self.accepting.load(AtomicOrdering::SeqCst) {
            return Err(ProcessorError::ShuttingDown);
        }
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ProcessorError::ShuttingDown)?;
        let seq = self.next_seq.fetch_add(1, AtomicOrdering::SeqCst);
        self.heap.lock().unwrap().push(QueueEntry { task, seq, _permit: permit });
        self.notify.notify_one();
        Ok(())
    }

    /// Removes a still-queued task, or signals a running worker to
    /// abandon it (the song stays Pending for a later retry).
    pub fn cancel_task(&self, task_id: Uuid) -> bool {
        {
            let mut heap = self.heap.lock().unwrap();
            let mut rebuilt: BinaryHeap<QueueEntry> = BinaryHeap::new();
            let mut found = false;
            for entry in heap.drain() {
                if entry.task.task_id == task_id {
                    found = true;
                    continue;
                }
                rebuilt.push(entry);
            }
            *heap = rebuilt;
            if found {
                return true;
            }
        }

        if let Some(token) = self.running.lock().unwrap().get(&task_id) {
            token.cancel();
            return true;
        }
        self.cancelled.lock().unwrap().insert(task_id);
        false
    }

    /// Stops accepting new work and waits for in-flight workers to drain.
    pub async fn shutdown(self: &Arc<Self>) {
        self.accepting.store(false, AtomicOrdering::SeqCst);
        self.shutdown.cancel();
        self.notify.notify_waiters();
        let handles = std::mem::take(&mut *self.workers.lock().unwrap());
        for handle in handles {
            let _ = handle.await;
        }
    }

    pub fn queue_len(&self) -> usize {
        self.heap.lock().unwrap().len()
    }

    async fn worker_loop(self: Arc<Self>, worker_id: usize) {
        loop {
            let task = loop {
                if self.shutdown.is_cancelled() {
                    return;
                }
                if let Some(entry) = self.heap.lock().unwrap().pop() {
                    break entry.task;
                }
                tokio::select! {
                    _ = self.notify.notified() => {}
                    _ = self.shutdown.cancelled() => return,
                }
            };

            self.run_task(worker_id, task).await;
        }
    }

    async fn run_task(self: &Arc<Self>, worker_id: usize, mut task: ProcessingTask) {
        if self.cancelled.lock().unwrap().remove(&task.task_id) {
            debug!(worker_id, task_id = %task.task_id, "task cancelled before start");
            return;
        }

        // Pending -> Processing; a no-op Err on retries, which start out
        // already Processing from the first attempt.
        let _ = task.song.mark_processing().await;

        let token = CancellationToken::new();
        self.running.lock().unwrap().insert(task.task_id, token.clone());

        let canonical_input = task.song.original_input().to_string();
        let cache = self.cache.clone();

        let outcome = tokio::select! {
            result = cache.get_or_resolve(&canonical_input) => Outcome::Resolved(result),
            _ = token.cancelled() => Outcome::Cancelled,
        };

        self.running.lock().unwrap().remove(&task.task_id);

        match outcome {
            Outcome::Cancelled => {
                debug!(worker_id, task_id = %task.task_id, "task abandoned mid-flight");
            }
            Outcome::Resolved(Ok(resolution)) => {
                self.breaker.reset_all();
                let _ = task.song.mark_ready(
                    aural_song::SongMetadata {
                        title: resolution.title.clone(),
                        uploader: resolution.uploader.clone(),
                        duration_seconds: resolution.duration_seconds,
                        thumbnail_url: resolution.thumbnail_url.clone(),
                    },
                    resolution.stream_url.clone(),
                )
                .await;
                task.report_progress(100);
                info!(worker_id, task_id = %task.task_id, "song resolved");
            }
            Outcome::Resolved(Err(error)) => {
                let class = FailureClass::of(&error);
                self.breaker.record_failure(class);

                if self.breaker.is_open(class) {
                    warn!(?class, "circuit breaker open; failing fast");
                    let _ = task.song.mark_failed(format!("circuit open for {class:?}")).await;
                    return;
                }

                task.attempt += 1;
                if task.attempt <= task.max_attempts && error.is_retriable() {
                    let delay = backoff_delay(task.attempt);
                    warn!(
                        worker_id,
                        task_id = %task.task_id,
                        attempt = task.attempt,
                        delay_ms = delay.as_millis(),
                        "retrying after failure"
                    );
                    let requeued = self.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = requeued.queue(task).await;
                    });
                } else {
                    let _ = task.song.mark_failed(error.to_string()).await;
                }
            }
        }
    }
}

enum Outcome {
    Resolved(std::result::Result<aural_cache::CachedResolution, Arc<aural_resolver::ResolverError>>),
    Cancelled,
}

fn backoff_delay(attempt: u32) -> Duration {
    let scaled = BASE_DELAY.saturating_mul(2u32.saturating_pow(attempt));
    scaled.min(CAP_DELAY)
}
