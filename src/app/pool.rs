use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::Instrument as _;
use tracing::instrument::WithSubscriber as _;

use crate::app::model::{ChapterOutcome, RecordingJob, RunReport};
use crate::app::pipeline::ChapterPipeline;
use crate::app::queue::{DoneGuard, WorkQueue};
use crate::error::Interrupted;

/// Fixed number of workers draining a shared [`WorkQueue`].
///
/// Per-chapter failures (including panics) are logged and counted in the
/// returned [`RunReport`]; only an unusable pool configuration is an error.
/// When the pipeline is cancelled, workers stop taking jobs, every worker is
/// joined, and `run` returns [`Interrupted`]. Dropping the future returned by
/// [`WorkerPool::run`] aborts every worker and the chapter it is recording.
pub struct WorkerPool {
    workers: usize,
    pipeline: Arc<ChapterPipeline>,
}

impl WorkerPool {
    pub fn new(workers: usize, pipeline: Arc<ChapterPipeline>) -> Self {
        Self { workers, pipeline }
    }

    pub async fn run(&self, queue: Arc<WorkQueue>) -> anyhow::Result<RunReport> {
        if self.workers == 0 {
            anyhow::bail!("worker pool needs at least one worker");
        }

        tracing::info!(workers = self.workers, jobs = queue.len(), "starting workers");
        let mut workers = JoinSet::new();
        for id in 0..self.workers {
            let queue = Arc::clone(&queue);
            let pipeline = Arc::clone(&self.pipeline);
            workers.spawn(
                worker(queue, pipeline)
                    .instrument(tracing::info_span!("worker", id))
                    .with_current_subscriber(),
            );
        }

        tokio::select! {
            () = queue.wait_until_drained() => {}
            () = self.pipeline.cancelled() => {
                tracing::warn!(pending = queue.len(), "cancelled, waiting for workers to stop");
            }
        }

        let mut report = RunReport::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(tally) => report.merge(tally),
                Err(err) => tracing::error!(?err, "worker task ended abnormally"),
            }
        }

        if self.pipeline.is_cancelled() {
            return Err(Interrupted.into());
        }
        Ok(report)
    }
}

async fn worker(queue: Arc<WorkQueue>, pipeline: Arc<ChapterPipeline>) -> RunReport {
    let mut report = RunReport::default();
    while !pipeline.is_cancelled() {
        let Some(job) = queue.try_pop() else {
            break;
        };
        let _done = DoneGuard::new(&queue);
        let chapter = job.chapter_number;

        let outcome = run_isolated(Arc::clone(&pipeline), job).await;
        match &outcome {
            Ok(ChapterOutcome::Placed(path)) => {
                tracing::info!(chapter, "[✓] wrote file {}", path.display());
            }
            Ok(ChapterOutcome::Skipped(_)) => {}
            Err(_) if pipeline.is_cancelled() => {
                tracing::warn!(chapter, "chapter {chapter} interrupted");
            }
            Err(err) => {
                tracing::error!(chapter, "failed to convert chapter {chapter} to speech: {err}");
            }
        }
        report.record(chapter, outcome);
    }
    tracing::debug!("worker exiting");
    report
}

/// Runs one job in its own task so a panic only fails that chapter.
async fn run_isolated(
    pipeline: Arc<ChapterPipeline>,
    job: RecordingJob,
) -> Result<ChapterOutcome, String> {
    // Kept in a JoinSet so aborting the worker aborts the chapter too.
    let mut task = JoinSet::new();
    task.spawn(async move { pipeline.run(&job).await }.with_current_subscriber());

    match task.join_next().await {
        Some(Ok(Ok(outcome))) => Ok(outcome),
        Some(Ok(Err(err))) => Err(format!("{err:#}")),
        Some(Err(err)) => Err(format!("chapter task failed: {err}")),
        None => Err("chapter task was not scheduled".to_owned()),
    }
}
