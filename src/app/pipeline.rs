use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use tokio_util::sync::CancellationToken;

use crate::app::model::{ChapterOutcome, PipelineStage, RecordingJob};
use crate::error::Interrupted;
use crate::tags::{TrackTags, write_tags};
use crate::tools::Toolchain;

/// Records one chapter: synthesize, encode, tag, place.
///
/// Cancellation stops the external tool stages (their child processes are
/// killed); tagging and placement always run to completion.
pub struct ChapterPipeline {
    tools: Arc<dyn Toolchain>,
    cancel: CancellationToken,
}

impl ChapterPipeline {
    pub fn new(tools: Arc<dyn Toolchain>) -> Self {
        Self {
            tools,
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancelled_by(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    pub async fn run(&self, job: &RecordingJob) -> anyhow::Result<ChapterOutcome> {
        if self.is_cancelled() {
            return Err(Interrupted.into());
        }

        let final_path = job.final_path();
        if !job.overwrite && final_path.exists() {
            tracing::info!(
                chapter = job.chapter_number,
                path = %final_path.display(),
                "[-] skipped, already exists"
            );
            return Ok(ChapterOutcome::Skipped(final_path));
        }

        let wav_path = job.wav_path();
        let encoded_path = job.encoded_path();

        tracing::debug!(chapter = job.chapter_number, stage = %PipelineStage::Synthesizing, "stage");
        self.interruptible(
            self.tools
                .synthesize(&job.text, &job.voice, &job.cache_dir, &wav_path),
        )
        .await
        .with_context(|| stage_context(PipelineStage::Synthesizing, job))?;

        tracing::debug!(chapter = job.chapter_number, stage = %PipelineStage::Encoding, "stage");
        let encoded = self
            .interruptible(self.tools.encode(&wav_path, &encoded_path))
            .await;
        // Raw narration is dropped whether or not encoding worked.
        remove_if_exists(&wav_path).await;
        encoded.with_context(|| stage_context(PipelineStage::Encoding, job))?;

        tracing::debug!(chapter = job.chapter_number, stage = %PipelineStage::Tagging, "stage");
        let tags = TrackTags {
            artist: job.author.clone(),
            title: job.title.clone(),
            album: job.book_title.clone(),
            track: u32::try_from(job.chapter_number).context("chapter number exceeds u32")?,
        };
        let tag_path = encoded_path.clone();
        tokio::task::spawn_blocking(move || write_tags(&tag_path, &tags))
            .await
            .context("join tag writer")?
            .with_context(|| stage_context(PipelineStage::Tagging, job))?;

        tracing::debug!(chapter = job.chapter_number, stage = %PipelineStage::Placing, "stage");
        place(&encoded_path, &final_path)
            .await
            .with_context(|| stage_context(PipelineStage::Placing, job))?;

        Ok(ChapterOutcome::Placed(final_path))
    }

    async fn interruptible(
        &self,
        stage: impl Future<Output = anyhow::Result<()>>,
    ) -> anyhow::Result<()> {
        tokio::select! {
            result = stage => result,
            () = self.cancel.cancelled() => Err(Interrupted.into()),
        }
    }
}

fn stage_context(stage: PipelineStage, job: &RecordingJob) -> String {
    format!("{stage} chapter {}", job.chapter_number)
}

async fn remove_if_exists(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => tracing::warn!(path = %path.display(), ?err, "remove intermediate audio"),
    }
}

/// Moves a finished file into the output directory so that `to` only ever
/// names a complete file.
async fn place(from: &Path, to: &Path) -> anyhow::Result<()> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => return Ok(()),
        Err(err) => tracing::debug!(?err, "rename failed; copying through a temp file"),
    }

    let from = from.to_path_buf();
    let to = to.to_path_buf();
    tokio::task::spawn_blocking(move || copy_then_persist(&from, &to))
        .await
        .context("join placement")?
}

fn copy_then_persist(from: &Path, to: &Path) -> anyhow::Result<()> {
    let dir = to
        .parent()
        .ok_or_else(|| anyhow::anyhow!("output path must have parent: {}", to.display()))?;
    let mut staged = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;
    let mut source =
        std::fs::File::open(from).with_context(|| format!("open {}", from.display()))?;
    std::io::copy(&mut source, staged.as_file_mut())
        .with_context(|| format!("copy {} into {}", from.display(), dir.display()))?;
    staged
        .persist(to)
        .with_context(|| format!("persist {}", to.display()))?;
    std::fs::remove_file(from).with_context(|| format!("remove {}", from.display()))?;
    Ok(())
}
