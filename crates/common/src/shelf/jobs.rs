//! Background job dispatcher
//!
//! A lightweight job queue on flume channels. Request handlers enqueue side
//! effects that must never delay or fail the response (recording a download
//! behind a redirect), and a single worker task drains the queue.

use tracing::{debug, info, warn};

use super::Shelf;

/// Background jobs that can be dispatched to the shelf worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Add one download to the counter of `url`.
    RecordDownload { url: String },
}

#[derive(Debug, thiserror::Error)]
#[error("job receiver has been dropped")]
pub struct DispatchError(pub Job);

/// Job dispatcher that can be cloned and shared across tasks
#[derive(Debug, Clone)]
pub struct JobDispatcher {
    tx: flume::Sender<Job>,
}

impl JobDispatcher {
    /// Create a new dispatcher and the receiver the worker consumes.
    pub fn new() -> (Self, JobReceiver) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, JobReceiver { rx })
    }

    /// Dispatch a job to the background worker. Never blocks.
    pub fn dispatch(&self, job: Job) -> Result<(), DispatchError> {
        self.tx.send(job).map_err(|e| DispatchError(e.into_inner()))
    }

    /// Queue a download increment. A missing worker is logged, not returned.
    pub fn record_download(&self, url: impl Into<String>) {
        if let Err(e) = self.dispatch(Job::RecordDownload { url: url.into() }) {
            warn!(job = ?e.0, "dropping job, no worker running");
        }
    }
}

/// Job receiver for the background worker
#[derive(Debug)]
pub struct JobReceiver {
    rx: flume::Receiver<Job>,
}

impl JobReceiver {
    /// Receive the next job, or `None` once every dispatcher is gone.
    pub async fn recv(&self) -> Option<Job> {
        self.rx.recv_async().await.ok()
    }

    /// Take a job if one is queued.
    pub fn try_recv(&self) -> Option<Job> {
        self.rx.try_recv().ok()
    }
}

/// Process jobs until every dispatcher has been dropped.
pub async fn run_worker(shelf: Shelf, receiver: JobReceiver) {
    info!("job worker started");
    while let Some(job) = receiver.recv().await {
        shelf.run_job(job).await;
    }
    info!("job worker stopped");
}

impl Shelf {
    /// Execute one job. Failures are logged and swallowed.
    pub async fn run_job(&self, job: Job) {
        match job {
            Job::RecordDownload { url } => match self.index.downloads().increment(&url).await {
                Ok(count) => debug!(url = %url, count, "download counted"),
                Err(e) => warn!(url = %url, error = %e, "failed to count download"),
            },
        }
    }
}
