// THEORY:
// Detection on one frame shares nothing with detection on another, so a batch
// of images is processed by a pool of workers with no coordination beyond
// handing out jobs. A dispatcher task spreads jobs round-robin over one channel
// per worker; each worker runs the blocking detection on tokio's blocking pool
// and answers on the job's own oneshot channel. Results come back in the order
// the jobs were submitted, whatever order the workers finish in.
//
// Both `WorkerPool::new` and `ParallelPipeline::new` spawn tasks and must be
// called from inside a tokio runtime.

use crate::error::PipelineError;
use crate::pipeline::{CorridorDetector, CorridorReport};
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// One image to process and where its annotated copy goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl ImageJob {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

/// A finished job.
#[derive(Debug)]
pub struct JobOutcome {
    pub job: ImageJob,
    pub result: Result<CorridorReport, PipelineError>,
}

struct JobTask {
    job: ImageJob,
    result_sender: oneshot::Sender<Result<CorridorReport, PipelineError>>,
}

pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<JobTask>,
    dispatcher: tokio::task::JoinHandle<()>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(detector: Arc<CorridorDetector>, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<JobTask>();

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<JobTask>())
            .unzip();

        // Spawn dispatcher
        let dispatcher = tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if worker_senders[worker_idx].send(task).is_err() {
                    log::warn!("worker {worker_idx} stopped, dropping job");
                }
                worker_idx = (worker_idx + 1) % worker_senders.len();
            }
        });

        // Spawn workers
        let workers = worker_receivers
            .into_iter()
            .map(|mut worker_receiver| {
                let worker_detector = Arc::clone(&detector);
                tokio::spawn(async move {
                    while let Some(JobTask { job, result_sender }) = worker_receiver.recv().await {
                        let result = Self::process_job(Arc::clone(&worker_detector), job).await;
                        // The submitter may have given up waiting; nothing to do then.
                        let _ = result_sender.send(result);
                    }
                })
            })
            .collect();

        Self {
            task_sender,
            dispatcher,
            workers,
        }
    }

    async fn process_job(
        detector: Arc<CorridorDetector>,
        job: ImageJob,
    ) -> Result<CorridorReport, PipelineError> {
        tokio::task::spawn_blocking(move || detector.process_file(&job.input, &job.output))
            .await
            .unwrap_or_else(|join_error| Err(PipelineError::WorkerUnavailable(join_error.to_string())))
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub async fn submit(&self, job: ImageJob) -> Result<CorridorReport, PipelineError> {
        let (result_sender, result_receiver) = oneshot::channel();

        self.task_sender
            .send(JobTask { job, result_sender })
            .map_err(|_| PipelineError::WorkerUnavailable("failed to send job to worker pool".to_string()))?;

        result_receiver
            .await
            .map_err(|_| PipelineError::WorkerUnavailable("failed to receive result from worker".to_string()))?
    }

    /// Stops accepting jobs and waits for queued ones to finish.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        let _ = self.dispatcher.await;
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

/// Processes batches of independent images on a worker pool.
pub struct ParallelPipeline {
    worker_pool: WorkerPool,
}

impl ParallelPipeline {
    /// One worker per logical CPU.
    pub fn new(detector: CorridorDetector) -> Self {
        Self::with_workers(detector, num_cpus::get())
    }

    pub fn with_workers(detector: CorridorDetector, worker_count: usize) -> Self {
        Self {
            worker_pool: WorkerPool::new(Arc::new(detector), worker_count),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_pool.worker_count()
    }

    /// Runs every job and returns one outcome per job, in submission order.
    /// A failing job does not affect the others.
    pub async fn process_batch(&self, jobs: Vec<ImageJob>) -> Vec<JobOutcome> {
        log::info!(
            "processing {} image(s) on {} worker(s)",
            jobs.len(),
            self.worker_count()
        );

        let pending = jobs.into_iter().map(|job| async move {
            let result = self.worker_pool.submit(job.clone()).await;
            JobOutcome { job, result }
        });
        join_all(pending).await
    }

    pub async fn shutdown(self) {
        self.worker_pool.shutdown().await;
    }
}
