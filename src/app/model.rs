use std::fmt;
use std::path::PathBuf;

pub const TRANSIENT_AUDIO_EXT: &str = "wav";
pub const FINAL_AUDIO_EXT: &str = "mp3";

#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    /// Piper voice identifier, e.g. `en_US-joe-medium`.
    pub voice: String,
    /// Piper length scale; lower is faster.
    pub speed: f32,
    /// Seconds of silence after each sentence.
    pub pause: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            voice: "en_US-joe-medium".to_owned(),
            speed: 1.0,
            pause: 0.5,
        }
    }
}

/// Everything a worker needs to record one chapter.
#[derive(Debug, Clone)]
pub struct RecordingJob {
    pub text: String,
    pub title: String,
    pub author: String,
    pub book_title: String,
    /// 1-based position of the chapter in the book.
    pub chapter_number: usize,

    pub file_name_prefix: String,
    pub cache_dir: PathBuf,
    pub output_dir: PathBuf,
    pub overwrite: bool,

    pub voice: VoiceSettings,
}

impl RecordingJob {
    /// Raw narration written by the synthesizer.
    pub fn wav_path(&self) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{TRANSIENT_AUDIO_EXT}", self.file_name_prefix))
    }

    /// Encoded file while it is still being tagged inside the cache.
    pub fn encoded_path(&self) -> PathBuf {
        self.cache_dir.join(self.final_file_name())
    }

    pub fn final_path(&self) -> PathBuf {
        self.output_dir.join(self.final_file_name())
    }

    pub fn final_file_name(&self) -> String {
        format!("{}.{FINAL_AUDIO_EXT}", self.file_name_prefix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Synthesizing,
    Encoding,
    Tagging,
    Placing,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Synthesizing => "synthesize",
            PipelineStage::Encoding => "encode",
            PipelineStage::Tagging => "tag",
            PipelineStage::Placing => "place",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChapterOutcome {
    /// Recorded and moved into the output directory.
    Placed(PathBuf),
    /// Final file already existed and overwrite was off.
    Skipped(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterFailure {
    pub chapter_number: usize,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub placed: usize,
    pub skipped: usize,
    pub failures: Vec<ChapterFailure>,
}

impl RunReport {
    pub fn record(&mut self, chapter_number: usize, outcome: Result<ChapterOutcome, String>) {
        match outcome {
            Ok(ChapterOutcome::Placed(_)) => self.placed += 1,
            Ok(ChapterOutcome::Skipped(_)) => self.skipped += 1,
            Err(error) => self.failures.push(ChapterFailure {
                chapter_number,
                error,
            }),
        }
    }

    pub fn merge(&mut self, other: RunReport) {
        self.placed += other.placed;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
    }

    pub fn total(&self) -> usize {
        self.placed + self.skipped + self.failures.len()
    }
}
