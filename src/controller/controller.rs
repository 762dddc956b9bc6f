//! # Blur Controller
//!
//! Owns the "current job" slot and decides, per submission, whether the job in
//! flight is superseded or left alone.
//!
//! ## Execution contexts
//!
//! ```text
//! caller ──submit()──▶ controller ──spawn──▶ job task (runtime) ──spawn_blocking──▶ transform
//!                                                 │                                    │
//!                                                 ◀───────────── blurred image ────────┘
//!                                                 │
//!                                                 └──▶ sink.deliver()   (unless cancelled)
//! ```
//!
//! `submit` never blocks: it updates the slot under a short lock and spawns the job
//! task on the runtime handle the controller was built with. The transform runs on
//! tokio's blocking pool; delivery happens back on the runtime.
//!
//! ## Supersession
//!
//! With `allow_multiple_task == false`, a submission cancels the tracked job before
//! spawning its own, and then waits for the previous job to finish, delivery included,
//! before starting. The filter call cannot be interrupted, so cancellation only suppresses
//! delivery; a job that is already cancelled when its turn comes skips the transform.
//! Completion and cancellation race through a compare-and-swap on the job state, so a
//! result is either delivered or dropped, never both.
//!
//! With `allow_multiple_task == true`, the previous job keeps running and both may
//! deliver, in completion order.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error};

use crate::bitmap::Image;
use crate::config::BlurConfig;
use crate::controller::job::{Job, JobId};
use crate::error::BlurError;
use crate::filter::BlurFilter;
use crate::sink::Sink;
use crate::transform::BlurTransform;

/// The job currently occupying the controller's slot.
struct TrackedJob {
    job: Arc<Job>,
    finished: watch::Receiver<bool>,
}

struct Shared {
    transform: BlurTransform,
    runtime: Handle,
    generation: AtomicU64,
    current: Mutex<Option<TrackedJob>>,
    closed: AtomicBool,
}

impl Shared {
    fn slot(&self) -> MutexGuard<'_, Option<TrackedJob>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear the slot if it still refers to `id`.
    fn release(&self, id: JobId) {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|tracked| tracked.job.id() == id) {
            *slot = None;
        }
    }
}

/// Releases the slot and wakes the successor when a job task ends, unwinding included.
struct JobExit {
    shared: Arc<Shared>,
    id: JobId,
    finished: watch::Sender<bool>,
}

impl Drop for JobExit {
    fn drop(&mut self) {
        self.shared.release(self.id);
        self.finished.send_replace(true);
    }
}

enum Outcome {
    Blurred(Image),
    Skipped,
    Failed,
}

/// Asynchronous blur job controller.
///
/// Cheap to clone; clones share the same slot and generation counter.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use image_blur::{BlurConfig, BlurController, BoxBlurFilter, Image, Preview};
///
/// # async fn example() -> Result<(), image_blur::BlurError> {
/// let controller = BlurController::with_current_runtime(Arc::new(BoxBlurFilter::default()))?;
/// let preview = Preview::new();
///
/// let image = Image::filled(640, 480, [30, 60, 90, 255]);
/// controller.submit(image, BlurConfig::new().with_intensity(12.0), preview.clone())?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BlurController {
    shared: Arc<Shared>,
}

impl BlurController {
    /// Build a controller around a filter backend and the runtime jobs are spawned on.
    pub fn new(filter: Arc<dyn BlurFilter>, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                transform: BlurTransform::new(filter),
                runtime,
                generation: AtomicU64::new(0),
                current: Mutex::new(None),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Build a controller on the runtime the caller is running in.
    ///
    /// # Errors
    ///
    /// Returns a misuse error when called outside a tokio runtime.
    pub fn with_current_runtime(filter: Arc<dyn BlurFilter>) -> Result<Self, BlurError> {
        let runtime = Handle::try_current()
            .map_err(|err| BlurError::misuse("with_current_runtime", err.to_string()))?;
        Ok(Self::new(filter, runtime))
    }

    pub fn transform(&self) -> &BlurTransform {
        &self.shared.transform
    }

    /// Schedule a blur of `image` and deliver the result to `sink`.
    ///
    /// Returns as soon as the job is spawned. The config is captured by value.
    ///
    /// # Errors
    ///
    /// Returns a misuse error if the controller has been shut down.
    pub fn submit<S: Sink>(
        &self,
        image: Image,
        config: BlurConfig,
        sink: S,
    ) -> Result<JobId, BlurError> {
        let id = JobId(self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1);
        let job = Arc::new(Job::new(id));
        let (finished_tx, finished_rx) = watch::channel(false);

        let predecessor = {
            let mut slot = self.shared.slot();
            // `shutdown` closes under this lock, so nothing is installed after it took the slot.
            self.ensure_open("submit")?;
            let previous = slot.take();
            *slot = Some(TrackedJob {
                job: Arc::clone(&job),
                finished: finished_rx,
            });
            match previous {
                Some(previous) if !config.allow_multiple_task() => {
                    if previous.job.cancel() {
                        debug!(job = %previous.job.id(), by = %id, "superseded by new request");
                    }
                    Some(previous.finished)
                }
                _ => None,
            }
        };

        debug!(
            job = %id,
            intensity = config.intensity(),
            scale = config.scale(),
            allow_multiple_task = config.allow_multiple_task(),
            "submitted blur job"
        );

        let shared = Arc::clone(&self.shared);
        self.shared.runtime.spawn(run_job(
            shared,
            job,
            image,
            config,
            sink,
            predecessor,
            finished_tx,
        ));
        Ok(id)
    }

    /// Blur on the worker pool and await the result, without job tracking.
    ///
    /// # Errors
    ///
    /// Misuse if the controller has been shut down; [`BlurError::Worker`] if the
    /// worker panicked (for instance inside an out-of-memory handler).
    pub async fn blur_async(&self, image: Image, config: BlurConfig) -> Result<Image, BlurError> {
        self.ensure_open("blur_async")?;
        let transform = self.shared.transform.clone();
        self.shared
            .runtime
            .spawn_blocking(move || transform.transform(&image, &config))
            .await
            .map_err(BlurError::from)
    }

    /// Blur on the calling thread, without job tracking.
    pub fn blur_sync(&self, image: &Image, config: &BlurConfig) -> Image {
        self.shared.transform.transform(image, config)
    }

    /// Id of the job currently tracked as in flight.
    pub fn current_job(&self) -> Option<JobId> {
        self.shared.slot().as_ref().map(|tracked| tracked.job.id())
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Refuse further work, cancel the tracked job and wait for it to finish.
    ///
    /// Jobs started with `allow_multiple_task` that are no longer tracked are left to
    /// complete on their own.
    pub async fn shutdown(&self) {
        let tracked = {
            let mut slot = self.shared.slot();
            if self.shared.closed.swap(true, Ordering::AcqRel) {
                return;
            }
            slot.take()
        };
        if let Some(mut tracked) = tracked {
            tracked.job.cancel();
            wait_finished(&mut tracked.finished).await;
        }
        debug!("blur controller shut down");
    }

    fn ensure_open(&self, operation: &'static str) -> Result<(), BlurError> {
        if self.is_shut_down() {
            return Err(BlurError::misuse(operation, "controller has been shut down"));
        }
        Ok(())
    }
}

/// Wait until a job has finished, delivery included. A dropped sender means the job's
/// task is gone, which counts as finished.
async fn wait_finished(finished: &mut watch::Receiver<bool>) {
    while !*finished.borrow_and_update() {
        if finished.changed().await.is_err() {
            break;
        }
    }
}

async fn run_job<S: Sink>(
    shared: Arc<Shared>,
    job: Arc<Job>,
    image: Image,
    config: BlurConfig,
    sink: S,
    predecessor: Option<watch::Receiver<bool>>,
    finished: watch::Sender<bool>,
) {
    // Successors only start once this job's result has been delivered or dropped.
    let _exit = JobExit {
        shared: Arc::clone(&shared),
        id: job.id(),
        finished,
    };

    if let Some(mut predecessor) = predecessor {
        wait_finished(&mut predecessor).await;
    }

    let outcome = if job.is_cancelled() {
        Outcome::Skipped
    } else {
        let transform = shared.transform.clone();
        let worker_job = Arc::clone(&job);
        let worker = shared.runtime.spawn_blocking(move || {
            if worker_job.is_cancelled() {
                return Outcome::Skipped;
            }
            Outcome::Blurred(transform.transform(&image, &config))
        });
        match worker.await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(job = %job.id(), error = %err, "blur worker failed");
                Outcome::Failed
            }
        }
    };

    match outcome {
        Outcome::Blurred(blurred) => {
            if job.complete() {
                sink.deliver(blurred).await;
                debug!(job = %job.id(), "delivered blurred image");
            } else {
                debug!(job = %job.id(), "cancelled, dropping blurred image");
            }
        }
        Outcome::Skipped => {
            debug!(job = %job.id(), "cancelled before transform started");
        }
        Outcome::Failed => {
            job.complete();
        }
    }
}
