//! Tile download scheduling
//!
//! Two modes share the same per-job step ([`Fetcher::process`]):
//!
//! - sequential: jobs run one after another in enumeration order
//! - concurrent: a fixed pool of workers pulls from a bounded [`job_queue`]
//!
//! In the concurrent mode the first failure is stored in a shared slot and
//! cancels a [`CancellationToken`]; the feeder stops enqueueing and the other
//! workers abandon their current request. Either way the function only
//! returns after every worker has been joined.
//!
//! Cancelling the fetcher's own token from outside stops both modes the same
//! way and yields [`StitchError::Interrupted`].

use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::progress::{ProgressEvent, ProgressReporter};
use super::workspace::store_tile;
use crate::error::{Result, StitchError};
use crate::jobs::{TileJob, job_queue};
use crate::observability::FetchMetrics;
use crate::source::TileSource;

/// Everything a worker needs to turn a job into a stored tile.
#[derive(Clone)]
pub struct Fetcher {
    source: Arc<dyn TileSource>,
    metrics: Arc<FetchMetrics>,
    progress: Arc<dyn ProgressReporter>,
    total: u64,
    cancel: CancellationToken,
}

impl Fetcher {
    pub fn new(
        source: Arc<dyn TileSource>,
        metrics: Arc<FetchMetrics>,
        progress: Arc<dyn ProgressReporter>,
        total: u64,
    ) -> Self {
        Self {
            source,
            metrics,
            progress,
            total,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop fetching once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Download one tile and write it to its destination.
    pub async fn process(&self, job: TileJob) -> Result<()> {
        let bytes = match self.source.fetch(&job).await {
            Ok(bytes) => bytes,
            Err(source) => {
                self.fail(&job);
                return Err(StitchError::Network {
                    index: job.index,
                    url: job.url,
                    source,
                });
            }
        };

        if let Err(e) = store_tile(&job.destination, &bytes).await {
            self.fail(&job);
            return Err(e);
        }

        let done = self.metrics.tile_fetched(bytes.len());
        self.progress.report(ProgressEvent::TileFetched {
            seq: job.seq,
            total: self.total,
            done,
            index: job.index,
            url: job.url,
            bytes: bytes.len(),
        });

        Ok(())
    }

    fn fail(&self, job: &TileJob) {
        self.metrics.tile_failed();
        self.progress.report(ProgressEvent::TileFailed {
            seq: job.seq,
            index: job.index,
            url: job.url.clone(),
        });
    }
}

/// Fetch jobs one at a time, stopping at the first failure.
pub async fn fetch_sequential(jobs: Vec<TileJob>, fetcher: &Fetcher) -> Result<()> {
    for job in jobs {
        tokio::select! {
            biased;
            _ = fetcher.cancel.cancelled() => return Err(StitchError::Interrupted),
            outcome = fetcher.process(job) => outcome?,
        }
    }
    Ok(())
}

/// Keeps the first error reported by any worker.
#[derive(Clone, Default)]
struct FirstError(Arc<Mutex<Option<StitchError>>>);

impl FirstError {
    fn record(&self, err: StitchError) {
        let mut slot = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_none() {
            *slot = Some(err);
        } else {
            debug!(error = %err, "Suppressing error after first failure");
        }
    }

    fn take(&self) -> Option<StitchError> {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

/// Fetch jobs with `workers` tasks sharing one bounded queue.
pub async fn fetch_concurrent(
    jobs: Vec<TileJob>,
    fetcher: &Fetcher,
    workers: usize,
    queue_capacity: usize,
) -> Result<()> {
    let workers = workers.clamp(1, jobs.len().max(1));
    let cancel = fetcher.cancel.child_token();
    let first_error = FirstError::default();
    let (producer, consumer) = job_queue(queue_capacity);

    let mut pool = JoinSet::new();
    for worker_id in 0..workers {
        let consumer = consumer.clone();
        let fetcher = fetcher.clone();
        let cancel = cancel.clone();
        let first_error = first_error.clone();

        pool.spawn(async move {
            let mut processed = 0u64;
            loop {
                let job = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    job = consumer.pop() => match job {
                        Some(job) => job,
                        None => break,
                    },
                };

                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    outcome = fetcher.process(job) => outcome,
                };

                match outcome {
                    Ok(()) => processed += 1,
                    Err(err) => {
                        first_error.record(err);
                        cancel.cancel();
                        break;
                    }
                }
            }
            debug!(worker_id, processed, "Fetch worker finished");
        });
    }
    // Only workers hold the receiver now; if they all exit, pushes fail fast.
    drop(consumer);

    for job in jobs {
        let pushed = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            pushed = producer.push(job) => pushed,
        };
        if let Err(closed) = pushed {
            warn!(seq = closed.seq, "All fetch workers exited before the queue was drained");
            break;
        }
    }
    producer.close();

    while let Some(joined) = pool.join_next().await {
        if let Err(e) = joined {
            cancel.cancel();
            first_error.record(StitchError::WorkerCrashed(e.to_string()));
        }
    }

    match first_error.take() {
        Some(err) => Err(err),
        None if fetcher.cancel.is_cancelled() => Err(StitchError::Interrupted),
        None => Ok(()),
    }
}
