use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::app::model::{FINAL_AUDIO_EXT, TRANSIENT_AUDIO_EXT};
use crate::config::{ToolConfig, voice_model_paths};
use crate::error::MissingTool;
use crate::tools::{Toolchain, find_executable};

/// Checks the environment before any chapter is queued and arms the cache
/// janitor for the lifetime of the run.
///
/// The voice fetch happens here, once, so workers never race to download it.
pub async fn prepare(
    config: &ToolConfig,
    tools: &dyn Toolchain,
    voice: &str,
) -> anyhow::Result<CacheJanitor> {
    check_executables(config)?;

    std::fs::create_dir_all(&config.cache_dir)
        .with_context(|| format!("create cache dir: {}", config.cache_dir.display()))?;
    let janitor = CacheJanitor::new(&config.cache_dir);

    ensure_voice_model(tools, voice, &config.cache_dir).await?;
    Ok(janitor)
}

pub fn check_executables(config: &ToolConfig) -> Result<(), MissingTool> {
    for tool in config.required_executables() {
        match find_executable(tool) {
            Some(path) => tracing::debug!(tool, path = %path.display(), "found executable"),
            None => {
                return Err(MissingTool {
                    tool: tool.to_owned(),
                });
            }
        }
    }
    Ok(())
}

pub fn voice_model_present(cache_dir: &Path, voice: &str) -> bool {
    let (model, model_config) = voice_model_paths(cache_dir, voice);
    model.is_file() && model_config.is_file()
}

pub async fn ensure_voice_model(
    tools: &dyn Toolchain,
    voice: &str,
    cache_dir: &Path,
) -> anyhow::Result<()> {
    if voice_model_present(cache_dir, voice) {
        return Ok(());
    }

    tracing::warn!(voice, "model {voice} not found, downloading");
    tools
        .fetch_voice(voice, cache_dir)
        .await
        .with_context(|| format!("fetch voice model: {voice}"))?;

    if !voice_model_present(cache_dir, voice) {
        let (model, model_config) = voice_model_paths(cache_dir, voice);
        anyhow::bail!(
            "voice model {voice} still missing after download (expected {} and {})",
            model.display(),
            model_config.display()
        );
    }
    Ok(())
}

/// Deletes leftover transient audio from the cache directory when dropped.
///
/// Only files directly inside the cache directory with a pipeline audio
/// extension are touched; voice models stay.
#[derive(Debug)]
pub struct CacheJanitor {
    cache_dir: PathBuf,
    armed: bool,
}

impl CacheJanitor {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            cache_dir: cache_dir.to_path_buf(),
            armed: true,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Sweeps now and disarms; later calls and the drop do nothing.
    pub fn sweep(&mut self) -> usize {
        if !std::mem::replace(&mut self.armed, false) {
            return 0;
        }

        let entries = match std::fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(dir = %self.cache_dir.display(), ?err, "list cache dir for cleanup");
                return 0;
            }
        };

        let leftovers: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_transient_audio(path))
            .collect();

        tracing::info!("cleaning up {} temporary audio files", leftovers.len());
        let mut removed = 0;
        for path in leftovers {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) => tracing::warn!(path = %path.display(), ?err, "remove temporary audio"),
            }
        }
        removed
    }
}

impl Drop for CacheJanitor {
    fn drop(&mut self) {
        self.sweep();
    }
}

fn is_transient_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == TRANSIENT_AUDIO_EXT || ext == FINAL_AUDIO_EXT)
}
