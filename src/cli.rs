use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Convert an epub file to an audiobook directory of mp3s")]
pub struct Cli {
    /// Epub file.
    pub epub: PathBuf,

    /// Destination folder for the mp3 files.
    pub audiobook_folder: PathBuf,

    /// Chapter to start from (1-based).
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub start: i64,

    /// Chapter to finish at (-1 for the last chapter).
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub end: i64,

    /// Speed of the generated audio (lower is faster!).
    #[arg(long, default_value_t = 1.0)]
    pub speed: f32,

    /// Piper voice to narrate with; see the piper docs for valid options.
    #[arg(long, default_value = "en_US-joe-medium")]
    pub voice: String,

    /// Length of pauses between sentences, in seconds.
    #[arg(long, default_value_t = 0.5)]
    pub pause: f32,

    /// Re-record chapters whose mp3 already exists.
    #[arg(long)]
    pub overwrite: bool,

    /// Chapters recorded in parallel (default: available CPUs).
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    pub workers: Option<usize>,
}

impl Cli {
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        })
    }
}
