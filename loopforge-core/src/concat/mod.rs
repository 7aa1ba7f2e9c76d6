use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

pub type ConcatResult<T> = Result<T, ConcatError>;

#[derive(Debug, Error)]
pub enum ConcatError {
    #[error("concatenation requires at least one input")]
    EmptyInput,
    #[error("failed to invoke {tool}: {source}")]
    Invoke { tool: String, source: io::Error },
    #[error("{tool} exited with status {status:?}: {stderr}")]
    ToolFailure {
        tool: String,
        status: Option<i32>,
        stderr: String,
    },
    #[error("expected output {path} was not produced")]
    MissingOutput { path: PathBuf },
    #[error("failed to write concat manifest: {source}")]
    Manifest { source: io::Error },
}

/// Joins an ordered list of media files into one output file by lossless
/// stream copy. Inputs are expected to share a compatible codec/container.
#[async_trait]
pub trait Concatenator: Send + Sync {
    async fn concat(&self, inputs: &[PathBuf], dest: &Path) -> ConcatResult<()>;
}

/// Muxes one video track and one audio track into a final file, copying
/// the video stream and trimming to the shorter input.
#[async_trait]
pub trait Muxer: Send + Sync {
    async fn mux(&self, video: &Path, audio: &Path, dest: &Path) -> ConcatResult<()>;
}

/// Concatenator backed by the ffmpeg concat demuxer (`-f concat -c copy`).
#[derive(Debug, Clone)]
pub struct FfmpegConcatenator {
    binary: String,
}

impl Default for FfmpegConcatenator {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".into(),
        }
    }
}

impl FfmpegConcatenator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

#[async_trait]
impl Concatenator for FfmpegConcatenator {
    async fn concat(&self, inputs: &[PathBuf], dest: &Path) -> ConcatResult<()> {
        if inputs.is_empty() {
            return Err(ConcatError::EmptyInput);
        }

        let mut manifest = tempfile::Builder::new()
            .prefix("concat_list_")
            .suffix(".txt")
            .tempfile()
            .map_err(|source| ConcatError::Manifest { source })?;
        manifest
            .write_all(manifest_contents(inputs).as_bytes())
            .map_err(|source| ConcatError::Manifest { source })?;
        manifest
            .flush()
            .map_err(|source| ConcatError::Manifest { source })?;

        debug!(inputs = inputs.len(), output = %dest.display(), "running ffmpeg concat");
        let mut command = Command::new(&self.binary);
        command
            .arg("-y")
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-f")
            .arg("concat")
            .arg("-safe")
            .arg("0")
            .arg("-i")
            .arg(manifest.path())
            .arg("-c")
            .arg("copy")
            .arg(dest);
        run_tool(&self.binary, command, dest).await
    }
}

/// Muxer backed by ffmpeg (`-map 0:v -map 1:a -c:v copy -shortest`).
#[derive(Debug, Clone)]
pub struct FfmpegMuxer {
    binary: String,
}

impl Default for FfmpegMuxer {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".into(),
        }
    }
}

impl FfmpegMuxer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    async fn mux(&self, video: &Path, audio: &Path, dest: &Path) -> ConcatResult<()> {
        debug!(video = %video.display(), audio = %audio.display(), output = %dest.display(), "running ffmpeg mux");
        let mut command = Command::new(&self.binary);
        command
            .arg("-y")
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(video)
            .arg("-i")
            .arg(audio)
            .arg("-map")
            .arg("0:v")
            .arg("-map")
            .arg("1:a")
            .arg("-c:v")
            .arg("copy")
            .arg("-c:a")
            .arg("aac")
            .arg("-b:a")
            .arg("192k")
            .arg("-shortest")
            .arg(dest);
        run_tool(&self.binary, command, dest).await
    }
}

// No deadline here: builds are offline batch jobs and block until the
// tool exits.
async fn run_tool(tool: &str, mut command: Command, dest: &Path) -> ConcatResult<()> {
    let output = command
        .output()
        .await
        .map_err(|source| ConcatError::Invoke {
            tool: tool.to_string(),
            source,
        })?;
    if !output.status.success() {
        return Err(ConcatError::ToolFailure {
            tool: tool.to_string(),
            status: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    if !dest.exists() {
        return Err(ConcatError::MissingOutput {
            path: dest.to_path_buf(),
        });
    }
    Ok(())
}

fn manifest_contents(inputs: &[PathBuf]) -> String {
    let mut contents = String::new();
    for input in inputs {
        let absolute = absolute_path(input);
        let escaped = absolute.to_string_lossy().replace('\'', "'\\''");
        contents.push_str(&format!("file '{escaped}'\n"));
    }
    contents
}

fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
