use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use super::TileJob;

#[derive(Debug, Error)]
#[error("job queue closed before job #{seq} could be delivered")]
pub struct QueueClosed {
    pub seq: u64,
}

/// Create a bounded job queue shared by one producer and any number of
/// consumers.
///
/// Architecture:
/// 1. The producer pushes jobs; pushes wait while the queue is full
/// 2. Consumers are cheap clones pulling from the same receiver, so the
///    next free worker takes the next job
/// 3. Dropping (or [`JobProducer::close`]-ing) the producer closes the
///    queue: consumers drain what is left and then see `None`
pub fn job_queue(capacity: usize) -> (JobProducer, JobConsumer) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    debug!(capacity, "Created job queue");

    let producer = JobProducer {
        tx,
        pushed: AtomicU64::new(0),
    };
    let consumer = JobConsumer {
        rx: Arc::new(Mutex::new(rx)),
    };

    (producer, consumer)
}

pub struct JobProducer {
    tx: mpsc::Sender<TileJob>,
    pushed: AtomicU64,
}

impl JobProducer {
    /// Enqueue a job, waiting for room when the queue is full.
    pub async fn push(&self, job: TileJob) -> Result<(), QueueClosed> {
        let seq = job.seq;
        self.tx.send(job).await.map_err(|_| QueueClosed { seq })?;
        self.pushed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Number of jobs accepted so far.
    pub fn pushed(&self) -> u64 {
        self.pushed.load(Ordering::Relaxed)
    }

    /// Close the queue. Consumers finish the remaining jobs, then stop.
    pub fn close(self) {
        debug!(pushed = self.pushed(), "Job queue closed");
    }
}

#[derive(Clone)]
pub struct JobConsumer {
    rx: Arc<Mutex<mpsc::Receiver<TileJob>>>,
}

impl JobConsumer {
    /// Take the next job, or `None` once the queue is closed and drained.
    pub async fn pop(&self) -> Option<TileJob> {
        self.rx.lock().await.recv().await
    }
}
