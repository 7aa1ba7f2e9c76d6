use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::warn;

/// Sentinel resolution reported when a clip cannot be probed.
pub const UNKNOWN_RESOLUTION: &str = "unknown";

/// Reports descriptive properties of source clips without assuming the
/// files are valid media.
///
/// Probe failures are absorbed into sentinels (`0.0`, `"unknown"`) so a
/// single corrupt clip only removes itself from planning; callers filter
/// on `duration > 0`.
#[async_trait]
pub trait MediaProber: Send + Sync {
    /// Duration in seconds, or `0.0` when the clip cannot be probed.
    async fn duration_seconds(&self, path: &Path) -> f64;

    /// Pixel resolution as `WIDTHxHEIGHT`, or [`UNKNOWN_RESOLUTION`].
    async fn resolution(&self, path: &Path) -> String;
}

/// Prober backed by the `ffprobe` command-line tool.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    binary: String,
    probe_timeout: Duration,
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self {
            binary: "ffprobe".into(),
            probe_timeout: Duration::from_secs(20),
        }
    }
}

impl FfprobeProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    async fn run(&self, path: &Path) -> Option<FfprobeOutput> {
        let mut command = Command::new(&self.binary);
        command
            .kill_on_drop(true)
            .arg("-v")
            .arg("quiet")
            .arg("-print_format")
            .arg("json")
            .arg("-show_streams")
            .arg("-show_format")
            .arg(path);
        match timeout(self.probe_timeout, command.output()).await {
            Ok(Ok(output)) if output.status.success() => {
                match serde_json::from_slice(&output.stdout) {
                    Ok(parsed) => Some(parsed),
                    Err(err) => {
                        warn!(file = %path.display(), error = %err, "ffprobe payload unparsable");
                        None
                    }
                }
            }
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!(file = %path.display(), stderr = %stderr.trim(), "ffprobe returned non-zero status");
                None
            }
            Ok(Err(err)) => {
                warn!(file = %path.display(), error = %err, "failed to invoke ffprobe");
                None
            }
            Err(_) => {
                warn!(file = %path.display(), timeout = ?self.probe_timeout, "ffprobe timed out");
                None
            }
        }
    }
}

#[async_trait]
impl MediaProber for FfprobeProber {
    async fn duration_seconds(&self, path: &Path) -> f64 {
        match self.run(path).await {
            Some(data) => duration_from(&data),
            None => 0.0,
        }
    }

    async fn resolution(&self, path: &Path) -> String {
        match self.run(path).await {
            Some(data) => resolution_from(&data),
            None => UNKNOWN_RESOLUTION.to_string(),
        }
    }
}

fn duration_from(data: &FfprobeOutput) -> f64 {
    data.format
        .duration
        .as_deref()
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value > 0.0)
        .unwrap_or(0.0)
}

fn resolution_from(data: &FfprobeOutput) -> String {
    data.streams
        .iter()
        .find(|stream| stream.codec_type.as_deref() == Some("video"))
        .and_then(|stream| Some(format!("{}x{}", stream.width?, stream.height?)))
        .unwrap_or_else(|| UNKNOWN_RESOLUTION.to_string())
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    #[serde(default)]
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    codec_type: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct FfprobeFormat {
    #[serde(default)]
    duration: Option<String>,
}
