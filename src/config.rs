use std::path::PathBuf;

pub const APP_NAME: &str = "piperbook";

/// Bitrate handed to ffmpeg for the final MP3 files.
pub const MP3_BITRATE: &str = "64k";

#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub piper_bin: String,
    pub ffmpeg_bin: String,
    pub cache_dir: PathBuf,
}

impl ToolConfig {
    pub fn from_env() -> Self {
        let piper_bin =
            std::env::var("PIPERBOOK_PIPER_BIN").unwrap_or_else(|_| "piper".to_owned());
        let ffmpeg_bin =
            std::env::var("PIPERBOOK_FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".to_owned());
        let cache_dir = std::env::var_os("PIPERBOOK_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_cache_dir);
        Self {
            piper_bin,
            ffmpeg_bin,
            cache_dir,
        }
    }

    /// Executables that must resolve before any work starts.
    pub fn required_executables(&self) -> [&str; 2] {
        [self.piper_bin.as_str(), self.ffmpeg_bin.as_str()]
    }
}

pub fn default_cache_dir() -> PathBuf {
    match dirs::cache_dir() {
        Some(dir) => dir.join(APP_NAME),
        None => PathBuf::from(format!(".{APP_NAME}-cache")),
    }
}

/// Model weights and config piper expects for `voice` inside `cache_dir`.
pub fn voice_model_paths(cache_dir: &std::path::Path, voice: &str) -> (PathBuf, PathBuf) {
    (
        cache_dir.join(format!("{voice}.onnx")),
        cache_dir.join(format!("{voice}.onnx.json")),
    )
}
