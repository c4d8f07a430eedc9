use std::path::PathBuf;

use crate::app::model::{RecordingJob, VoiceSettings};
use crate::chapters::{BookMetadata, Chapter};
use crate::error::RangeError;

/// `end` value meaning "through the last chapter".
pub const LAST_CHAPTER: i64 = -1;

#[derive(Debug, Clone)]
pub struct JobParams {
    /// 1-based, inclusive.
    pub start: i64,
    /// 1-based, inclusive, or [`LAST_CHAPTER`].
    pub end: i64,
    pub book: BookMetadata,
    pub voice: VoiceSettings,
    pub cache_dir: PathBuf,
    pub output_dir: PathBuf,
    pub overwrite: bool,
}

/// Digits needed to print `count` (at least 1).
pub fn pad_width(count: usize) -> usize {
    count.max(1).ilog10() as usize + 1
}

/// Resolves `start..=end` against `total` chapters.
pub fn resolve_range(start: i64, end: i64, total: usize) -> Result<(usize, usize), RangeError> {
    let in_range = |value: i64| value >= 1 && usize::try_from(value).is_ok_and(|v| v <= total);

    if !in_range(start) {
        return Err(RangeError::StartOutOfRange { start, total });
    }
    if end != LAST_CHAPTER && !in_range(end) {
        return Err(RangeError::EndOutOfRange { end, total });
    }

    // Both bounds are within 1..=total at this point.
    let start = start as usize;
    let end = if end == LAST_CHAPTER { total } else { end as usize };
    if start > end {
        return Err(RangeError::StartAfterEnd { start, end });
    }
    Ok((start, end))
}

/// One job per selected non-blank chapter, in chapter order.
pub fn build_jobs(
    chapters: Vec<Chapter>,
    params: &JobParams,
) -> Result<Vec<RecordingJob>, RangeError> {
    let chapters: Vec<Chapter> = chapters
        .into_iter()
        .filter(|chapter| !chapter.text.trim().is_empty())
        .collect();
    tracing::info!("chapters count: {}", chapters.len());

    let (start, end) = resolve_range(params.start, params.end, chapters.len())?;
    let width = pad_width(chapters.len());

    let jobs = chapters
        .into_iter()
        .enumerate()
        .map(|(offset, chapter)| (offset + 1, chapter))
        .filter(|(idx, _)| (start..=end).contains(idx))
        .map(|(idx, chapter)| RecordingJob {
            file_name_prefix: format!("{idx:0width$}_{}", chapter.title),
            text: chapter.text,
            title: chapter.title,
            author: params.book.author.clone(),
            book_title: params.book.title.clone(),
            chapter_number: idx,
            cache_dir: params.cache_dir.clone(),
            output_dir: params.output_dir.clone(),
            overwrite: params.overwrite,
            voice: params.voice.clone(),
        })
        .collect::<Vec<_>>();

    tracing::debug!(start, end, width, jobs = jobs.len(), "built recording jobs");
    Ok(jobs)
}
