// src/pipeline/enrich.rs

//! Background detail backfill.
//!
//! An [`EnrichmentManager`] runs at most one job per collection. A job loads
//! its collection once, queues every non-Short item that has neither
//! enrichment field, and drains the queue with a fixed number of workers:
//!
//! - workers claim queue indices from one atomic cursor, so each item is
//!   fetched at most once per job;
//! - a rate-limit answer opens the shared breaker; every worker finishes its
//!   current item and exits;
//! - progress is saved by a background persister at most once per
//!   `save_interval_ms`, and once more after all workers are done.
//!
//! Every save reloads the library under a store-wide lock and replaces only
//! the job's own collection, so jobs for different collections can share one
//! store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::{AppError, Result};
use crate::models::{Collection, EnrichmentConfig, EnrichmentJob, JobStatus};
use crate::pipeline::circuit_breaker::RateLimitBreaker;
use crate::platform::Platform;
use crate::services::ItemDetail;
use crate::storage::SnapshotStore;

/// Answer to a start request.
#[derive(Debug, Clone)]
pub struct StartOutcome {
    /// False when a job for the collection was already running
    pub started: bool,
    pub job: EnrichmentJob,
}

struct JobEntry {
    state: Arc<Mutex<EnrichmentJob>>,
    handle: Option<JoinHandle<()>>,
}

/// Owns the enrichment jobs of one process.
pub struct EnrichmentManager {
    platform: Arc<dyn Platform>,
    store: Arc<dyn SnapshotStore>,
    config: EnrichmentConfig,
    jobs: Mutex<HashMap<String, JobEntry>>,
    save_lock: Arc<AsyncMutex<()>>,
}

impl EnrichmentManager {
    pub fn new(
        platform: Arc<dyn Platform>,
        store: Arc<dyn SnapshotStore>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            platform,
            store,
            config,
            jobs: Mutex::new(HashMap::new()),
            save_lock: Arc::new(AsyncMutex::new(())),
        }
    }

    /// Start a job for `collection` unless one is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, collection: &str) -> StartOutcome {
        let mut jobs = lock(&self.jobs);

        if let Some(entry) = jobs.get(collection) {
            let job = lock(&entry.state).clone();
            if job.status == JobStatus::Running {
                log::info!("Enrichment for '{}' already running ({})", collection, job.id);
                return StartOutcome {
                    started: false,
                    job,
                };
            }
        }

        let job = EnrichmentJob::start(collection);
        let state = Arc::new(Mutex::new(job.clone()));
        let run = JobRun {
            collection: collection.to_string(),
            platform: Arc::clone(&self.platform),
            writer: CollectionWriter {
                store: Arc::clone(&self.store),
                lock: Arc::clone(&self.save_lock),
                name: collection.to_string(),
            },
            config: self.config.clone(),
            state: Arc::clone(&state),
        };
        log::info!("Starting enrichment job {} for '{}'", job.id, collection);
        let handle = tokio::spawn(run.execute());

        jobs.insert(
            collection.to_string(),
            JobEntry {
                state,
                handle: Some(handle),
            },
        );
        StartOutcome { started: true, job }
    }

    /// Current job state; an `Idle` job when none was ever started.
    pub fn status(&self, collection: &str) -> EnrichmentJob {
        lock(&self.jobs)
            .get(collection)
            .map(|entry| lock(&entry.state).clone())
            .unwrap_or_else(|| EnrichmentJob::idle(collection))
    }

    /// Wait for the collection's job to finish and return its final state.
    ///
    /// Only the first waiter joins the task; later calls return the state
    /// as it is.
    pub async fn wait(&self, collection: &str) -> EnrichmentJob {
        let handle = lock(&self.jobs)
            .get_mut(collection)
            .and_then(|entry| entry.handle.take());

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                self.mark_crashed(collection, &e.to_string());
            }
        }
        self.status(collection)
    }

    /// Join every job that has not been joined yet.
    pub async fn shutdown(&self) {
        let handles: Vec<(String, JoinHandle<()>)> = lock(&self.jobs)
            .iter_mut()
            .filter_map(|(key, entry)| entry.handle.take().map(|h| (key.clone(), h)))
            .collect();

        if !handles.is_empty() {
            log::info!("Waiting for {} enrichment jobs", handles.len());
        }
        for (key, handle) in handles {
            if let Err(e) = handle.await {
                self.mark_crashed(&key, &e.to_string());
            }
        }
    }

    fn mark_crashed(&self, collection: &str, message: &str) {
        log::error!("Enrichment task for '{}' crashed: {}", collection, message);
        if let Some(entry) = lock(&self.jobs).get(collection) {
            let mut job = lock(&entry.state);
            job.error = Some(message.to_string());
            job.finish(JobStatus::Error);
        }
    }
}

/// Position of a queued item in the loaded collection.
#[derive(Debug, Clone)]
struct QueueEntry {
    channel: usize,
    item: usize,
    id: String,
}

/// Allows one save per interval; the first call is always allowed.
#[derive(Debug)]
struct Debouncer {
    interval: Duration,
    last: Option<Instant>,
}

impl Debouncer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Writes one collection back into the shared store document.
#[derive(Clone)]
struct CollectionWriter {
    store: Arc<dyn SnapshotStore>,
    lock: Arc<AsyncMutex<()>>,
    name: String,
}

impl CollectionWriter {
    async fn load(&self) -> Result<Collection> {
        let mut library = self.store.load().await?;
        library
            .collections
            .remove(&self.name)
            .ok_or_else(|| AppError::CollectionNotFound(self.name.clone()))
    }

    /// Reload the library and replace this collection. Other collections are
    /// kept as stored.
    async fn save(&self, collection: &Collection) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut library = self.store.load().await?;
        library
            .collections
            .insert(self.name.clone(), collection.clone());
        self.store.save(&library).await
    }
}

/// State shared by the workers of one job.
struct Shared {
    collection: Mutex<Collection>,
    queue: Vec<QueueEntry>,
    next: AtomicUsize,
    breaker: RateLimitBreaker,
    debouncer: Mutex<Debouncer>,
}

struct JobRun {
    collection: String,
    platform: Arc<dyn Platform>,
    writer: CollectionWriter,
    config: EnrichmentConfig,
    state: Arc<Mutex<EnrichmentJob>>,
}

impl JobRun {
    async fn execute(self) {
        let status = match self.run().await {
            Ok(status) => status,
            Err(e) => {
                log::error!("Enrichment for '{}' failed: {}", self.collection, e);
                lock(&self.state).error = Some(e.to_string());
                JobStatus::Error
            }
        };

        let mut job = lock(&self.state);
        job.finish(status);
        log::info!(
            "Enrichment for '{}' finished: {:?} ({} enriched, {} skipped, {} failed of {})",
            self.collection,
            job.status,
            job.enriched_count,
            job.skipped_count,
            job.failed_count,
            job.total
        );
    }

    async fn run(&self) -> Result<JobStatus> {
        let collection = self.writer.load().await?;

        let queue: Vec<QueueEntry> = collection
            .channels
            .iter()
            .enumerate()
            .flat_map(|(channel, snapshot)| {
                snapshot
                    .videos
                    .iter()
                    .enumerate()
                    .filter(|(_, video)| video.needs_enrichment())
                    .map(move |(item, video)| QueueEntry {
                        channel,
                        item,
                        id: video.id.clone(),
                    })
            })
            .collect();

        let workers = self.config.concurrency.max(1).min(queue.len());
        lock(&self.state).total = queue.len();
        log::info!(
            "Enriching {} items in '{}' with {} workers",
            queue.len(),
            self.collection,
            workers
        );

        let shared = Shared {
            collection: Mutex::new(collection),
            queue,
            next: AtomicUsize::new(0),
            breaker: RateLimitBreaker::new(),
            debouncer: Mutex::new(Debouncer::new(Duration::from_millis(
                self.config.save_interval_ms,
            ))),
        };

        let (saves, pending) = mpsc::unbounded_channel();
        let persister = tokio::spawn(persist(
            self.writer.clone(),
            Arc::clone(&self.state),
            pending,
        ));

        join_all((0..workers).map(|worker| self.worker(worker, &shared, &saves))).await;

        drop(saves);
        if let Err(e) = persister.await {
            log::error!("Progress persister for '{}' crashed: {}", self.collection, e);
        }

        let collection = lock(&shared.collection).clone();
        self.writer.save(&collection).await?;
        lock(&self.state).last_saved_at = Some(Utc::now());

        Ok(if shared.breaker.is_open() {
            JobStatus::RateLimited
        } else {
            JobStatus::Complete
        })
    }

    async fn worker(&self, worker: usize, shared: &Shared, saves: &UnboundedSender<Collection>) {
        let delay = Duration::from_millis(self.config.request_delay_ms);

        loop {
            if shared.breaker.is_open() {
                break;
            }
            let index = shared.next.fetch_add(1, Ordering::SeqCst);
            let Some(entry) = shared.queue.get(index) else {
                break;
            };

            let result = self.platform.fetch_item_detail(&entry.id).await;
            self.apply(shared, entry, result);
            self.maybe_save(shared, saves);

            if shared.breaker.is_open() {
                break;
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        log::debug!("Enrichment worker {} for '{}' done", worker, self.collection);
    }

    fn apply(&self, shared: &Shared, entry: &QueueEntry, result: Result<ItemDetail>) {
        match result {
            Ok(detail) if detail.is_empty() => {
                lock(&self.state).skipped_count += 1;
            }
            Ok(detail) => {
                self.write_detail(shared, entry, detail);
                lock(&self.state).enriched_count += 1;
            }
            Err(e) if e.is_rate_limited() => {
                if shared.breaker.trip() {
                    log::warn!("Rate limited at item {}; stopping '{}'", entry.id, self.collection);
                    lock(&self.state).rate_limited = true;
                }
            }
            Err(e) => {
                log::warn!("Detail fetch for {} failed: {}", entry.id, e);
                lock(&self.state).failed_count += 1;
            }
        }
    }

    fn write_detail(&self, shared: &Shared, entry: &QueueEntry, detail: ItemDetail) {
        let mut collection = lock(&shared.collection);
        let item = collection
            .channels
            .get_mut(entry.channel)
            .and_then(|s| s.videos.get_mut(entry.item))
            .filter(|item| item.id == entry.id);

        match item {
            Some(item) => item.enrichment = detail.into_enrichment(),
            None => log::warn!("Queued item {} no longer in the collection", entry.id),
        }
    }

    fn maybe_save(&self, shared: &Shared, saves: &UnboundedSender<Collection>) {
        if !lock(&shared.debouncer).ready(Instant::now()) {
            return;
        }
        let collection = lock(&shared.collection).clone();
        if saves.send(collection).is_err() {
            log::warn!("Progress persister for '{}' is gone", self.collection);
        }
    }
}

/// Save queued collection copies, skipping to the newest when several
/// queued up.
async fn persist(
    writer: CollectionWriter,
    state: Arc<Mutex<EnrichmentJob>>,
    mut pending: UnboundedReceiver<Collection>,
) {
    while let Some(mut collection) = pending.recv().await {
        while let Ok(newer) = pending.try_recv() {
            collection = newer;
        }
        match writer.save(&collection).await {
            Ok(()) => {
                lock(&state).last_saved_at = Some(Utc::now());
            }
            Err(e) => log::warn!("Progress save failed: {}", e),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
