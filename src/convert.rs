use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use tokio_util::sync::CancellationToken;

use crate::app::jobs::{JobParams, build_jobs};
use crate::app::model::{RunReport, VoiceSettings};
use crate::app::pipeline::ChapterPipeline;
use crate::app::pool::WorkerPool;
use crate::app::queue::WorkQueue;
use crate::app::supervisor;
use crate::chapters::{BookMetadata, extract_chapters};
use crate::cli::Cli;
use crate::config::ToolConfig;
use crate::ebook::Ebook;
use crate::error::Interrupted;
use crate::tools::Toolchain;

/// Converts `args.epub` into one mp3 per selected chapter.
///
/// Fatal errors (missing tools, unreadable book, bad range) surface before
/// any chapter is recorded. Chapter failures are logged and reported in the
/// returned [`RunReport`]. Cancelling `cancel` stops the workers and returns
/// [`Interrupted`] once they have all exited. Transient cache audio is swept
/// on every exit path, after the workers are gone.
pub async fn run(
    args: &Cli,
    config: &ToolConfig,
    tools: Arc<dyn Toolchain>,
    cancel: CancellationToken,
) -> anyhow::Result<RunReport> {
    let workers = args.worker_count();
    if workers == 0 {
        anyhow::bail!("worker pool needs at least one worker");
    }

    let voice = VoiceSettings {
        voice: args.voice.clone(),
        speed: args.speed,
        pause: args.pause,
    };

    let _janitor = tokio::select! {
        prepared = supervisor::prepare(config, tools.as_ref(), &voice.voice) => prepared?,
        () = cancel.cancelled() => return Err(Interrupted.into()),
    };

    tracing::info!(epub = %args.epub.display(), "reading book");
    let (book, chapters) = {
        let mut ebook = Ebook::open(&args.epub).context("read epub")?;
        let book = BookMetadata::from_book(&ebook);
        let chapters = extract_chapters(&mut ebook).context("extract chapters")?;
        (book, chapters)
    };
    tracing::info!(title = %book.title, author = %book.author, "book metadata");

    let jobs = build_jobs(
        chapters,
        &JobParams {
            start: args.start,
            end: args.end,
            book,
            voice,
            cache_dir: config.cache_dir.clone(),
            output_dir: args.audiobook_folder.clone(),
            overwrite: args.overwrite,
        },
    )?;

    std::fs::create_dir_all(&args.audiobook_folder).with_context(|| {
        format!(
            "create audiobook folder: {}",
            args.audiobook_folder.display()
        )
    })?;
    ensure_distinct_dirs(&args.audiobook_folder, &config.cache_dir)?;

    let queue: Arc<WorkQueue> = Arc::new(jobs.into_iter().collect());
    let pipeline = ChapterPipeline::new(tools).cancelled_by(cancel);
    let pool = WorkerPool::new(workers, Arc::new(pipeline));
    let report = pool.run(queue).await.context("run worker pool")?;

    tracing::info!(
        placed = report.placed,
        skipped = report.skipped,
        failed = report.failures.len(),
        "audiobook finished"
    );
    Ok(report)
}

/// The cache janitor deletes mp3 files, so the output must live elsewhere.
fn ensure_distinct_dirs(output_dir: &Path, cache_dir: &Path) -> anyhow::Result<()> {
    let output = std::fs::canonicalize(output_dir)
        .with_context(|| format!("resolve audiobook folder: {}", output_dir.display()))?;
    let cache = std::fs::canonicalize(cache_dir)
        .with_context(|| format!("resolve cache dir: {}", cache_dir.display()))?;
    if output == cache {
        anyhow::bail!(
            "audiobook folder must differ from the cache dir: {}",
            output.display()
        );
    }
    Ok(())
}
