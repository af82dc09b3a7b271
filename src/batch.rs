//! Batch hashing over a bounded worker pool.
//!
//! Jobs are fanned out to at most `min(requested, logical CPUs)` worker
//! threads and results stream back through a channel as they complete, in
//! completion order. An optional progress callback fires once per finished
//! item. The pool owns copies of the passwords and wipes each one as soon
//! as its job is done.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, unbounded};
use zeroize::Zeroize;

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::Argon2;

/// One unit of work: a password and the salt to hash it with.
pub struct BatchJob {
    pub password: Vec<u8>,
    pub salt: Vec<u8>,
}

impl BatchJob {
    pub fn new(password: impl Into<Vec<u8>>, salt: impl Into<Vec<u8>>) -> Self {
        Self {
            password: password.into(),
            salt: salt.into(),
        }
    }
}

/// Outcome of one job, tagged with its index in the submitted order.
#[derive(Debug)]
pub struct BatchResult {
    pub index: usize,
    pub result: Result<Vec<u8>>,
}

/// Snapshot handed to the progress callback after each completed item.
#[derive(Clone, Debug)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
    /// Linear estimate from throughput so far; `None` until the first
    /// item lands.
    pub eta: Option<Duration>,
}

pub type ProgressCallback = Arc<dyn Fn(&BatchProgress) + Send + Sync>;

/// Stream of [`BatchResult`]s, yielded as workers finish them.
///
/// Dropping the stream early is fine; workers notice the closed channel
/// and wind down after their current job.
pub struct BatchStream {
    results: Receiver<BatchResult>,
}

impl Iterator for BatchStream {
    type Item = BatchResult;

    fn next(&mut self) -> Option<Self::Item> {
        self.results.recv().ok()
    }
}

/// Hashes every job with `config`, using up to `workers` threads.
///
/// Results arrive in completion order, one per job. Cancelling `token`
/// makes in-flight jobs abort at their next slice boundary and remaining
/// jobs complete immediately as [`Error::Cancelled`].
pub fn hash_batch(
    config: &Argon2,
    jobs: Vec<BatchJob>,
    workers: usize,
    progress: Option<ProgressCallback>,
    token: &CancellationToken,
) -> BatchStream {
    let total = jobs.len();
    let pool_size = workers.clamp(1, num_cpus::get()).min(total.max(1));

    let (job_sender, job_receiver) = unbounded();
    for (index, job) in jobs.into_iter().enumerate() {
        let _ = job_sender.send((index, job));
    }
    drop(job_sender);

    let (result_sender, results) = unbounded();
    let counters = Arc::new(Counters::default());
    let started = Instant::now();

    for _ in 0..pool_size {
        let config = config.clone();
        let token = token.clone();
        let jobs = job_receiver.clone();
        let results = result_sender.clone();
        let progress = progress.clone();
        let counters = Arc::clone(&counters);

        thread::spawn(move || {
            while let Ok((index, mut job)) = jobs.recv() {
                let result = if token.is_cancelled() {
                    Err(Error::Cancelled)
                } else {
                    config.hash_password_with_token(&job.password, &job.salt, &token)
                };

                job.password.zeroize();
                job.salt.zeroize();

                let snapshot = counters.record(result.is_ok(), total, started);
                if let Some(callback) = &progress {
                    callback(&snapshot);
                }

                if results.send(BatchResult { index, result }).is_err() {
                    break;
                }
            }
        });
    }

    BatchStream { results }
}

#[derive(Default)]
struct Counters {
    completed: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

impl Counters {
    fn record(&self, success: bool, total: usize, started: Instant) -> BatchProgress {
        if success {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;

        let elapsed = started.elapsed();
        let eta = (completed > 0).then(|| {
            let remaining = total.saturating_sub(completed);
            elapsed.mul_f64(remaining as f64 / completed as f64)
        });

        BatchProgress {
            completed,
            total,
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            elapsed,
            eta,
        }
    }
}
