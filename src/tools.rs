use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use anyhow::Context as _;
use async_trait::async_trait;
use tokio::io::AsyncWriteExt as _;
use tokio::process::Command;

use crate::app::model::VoiceSettings;
use crate::config::{MP3_BITRATE, ToolConfig, voice_model_paths};

/// External collaborators the chapter pipeline drives.
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Narrates `text` into a raw audio file at `output`.
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceSettings,
        cache_dir: &Path,
        output: &Path,
    ) -> anyhow::Result<()>;

    /// Transcodes raw audio at `input` into an MP3 at `output`.
    async fn encode(&self, input: &Path, output: &Path) -> anyhow::Result<()>;

    /// Downloads the model files for `voice` into `cache_dir`.
    async fn fetch_voice(&self, voice: &str, cache_dir: &Path) -> anyhow::Result<()>;
}

/// `piper` and `ffmpeg` run as child processes.
#[derive(Debug, Clone)]
pub struct ExternalTools {
    config: ToolConfig,
}

impl ExternalTools {
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Toolchain for ExternalTools {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceSettings,
        cache_dir: &Path,
        output: &Path,
    ) -> anyhow::Result<()> {
        let (model, _) = voice_model_paths(cache_dir, &voice.voice);
        let mut cmd = Command::new(&self.config.piper_bin);
        cmd.arg("--output_file")
            .arg(output)
            .arg("--model")
            .arg(&model)
            .args(["--length-scale", &voice.speed.to_string()])
            .args(["--sentence-silence", &voice.pause.to_string()]);

        tracing::debug!(
            bin = %self.config.piper_bin,
            model = %model.display(),
            output = %output.display(),
            "piper synthesize"
        );
        run_with_stdin(cmd, &self.config.piper_bin, text.as_bytes()).await
    }

    async fn encode(&self, input: &Path, output: &Path) -> anyhow::Result<()> {
        let mut cmd = Command::new(&self.config.ffmpeg_bin);
        cmd.args(["-nostdin", "-y", "-loglevel", "error", "-i"])
            .arg(input)
            .args(["-codec:a", "libmp3lame", "-b:a", MP3_BITRATE])
            .arg(output);

        tracing::debug!(
            bin = %self.config.ffmpeg_bin,
            input = %input.display(),
            output = %output.display(),
            "ffmpeg encode"
        );
        let output = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("spawn {}", self.config.ffmpeg_bin))?;
        check_status(&self.config.ffmpeg_bin, output.status, &output.stderr)
    }

    async fn fetch_voice(&self, voice: &str, cache_dir: &Path) -> anyhow::Result<()> {
        let mut cmd = Command::new(&self.config.piper_bin);
        cmd.args(["-m", voice])
            .arg("--data-dir")
            .arg(cache_dir)
            .arg("--download-dir")
            .arg(cache_dir);

        tracing::info!(bin = %self.config.piper_bin, voice, "piper fetch voice");
        // piper downloads the model on first use, then narrates stdin.
        run_with_stdin(cmd, &self.config.piper_bin, b"y").await
    }
}

async fn run_with_stdin(mut cmd: Command, bin: &str, input: &[u8]) -> anyhow::Result<()> {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawn {bin}"))?;

    let mut stdin = child
        .stdin
        .take()
        .with_context(|| format!("open {bin} stdin"))?;
    let input = input.to_vec();
    // Fed from a separate task so a chatty stderr cannot stall stdin.
    let writer = tokio::spawn(async move {
        stdin.write_all(&input).await?;
        stdin.shutdown().await
    });

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("wait {bin}"))?;
    let write_result = writer.await.with_context(|| format!("join {bin} stdin writer"))?;

    check_status(bin, output.status, &output.stderr)?;
    if let Err(err) = write_result {
        tracing::warn!(bin, ?err, "child exited before reading all of stdin");
    }
    Ok(())
}

fn check_status(bin: &str, status: ExitStatus, stderr: &[u8]) -> anyhow::Result<()> {
    if status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(stderr);
    match stderr.lines().rev().find(|line| !line.trim().is_empty()) {
        Some(line) => anyhow::bail!("{bin} failed ({status}): {}", line.trim()),
        None => anyhow::bail!("{bin} failed ({status})"),
    }
}

/// Resolves `program` the way a shell would: paths are checked directly,
/// bare names are searched on `PATH`.
pub fn find_executable(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt as _;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
