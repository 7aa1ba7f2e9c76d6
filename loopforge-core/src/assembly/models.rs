use std::path::PathBuf;

use serde::Serialize;

/// One source media file considered as an atomic unit for assembly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipAsset {
    pub path: PathBuf,
    /// Seconds; `0.0` marks a clip whose probe failed.
    pub duration: f64,
    /// `WIDTHxHEIGHT` label or `"unknown"`; `None` for audio clips.
    pub resolution: Option<String>,
}

impl ClipAsset {
    pub fn audio(path: impl Into<PathBuf>, duration: f64) -> Self {
        Self {
            path: path.into(),
            duration,
            resolution: None,
        }
    }

    pub fn video(path: impl Into<PathBuf>, duration: f64, resolution: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            duration,
            resolution: Some(resolution.into()),
        }
    }

    pub fn usable(&self) -> bool {
        self.duration > 0.0
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }
}

/// One clip and the number of back-to-back repetitions it contributes to
/// the assembled timeline.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentDescriptor {
    pub clip: ClipAsset,
    pub repeat_count: u32,
}

impl SegmentDescriptor {
    pub fn planned_duration(&self) -> f64 {
        f64::from(self.repeat_count) * self.clip.duration
    }
}

/// Ordered segment descriptors plus the resolution chosen to describe the
/// assembled production.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentPlan {
    pub segments: Vec<SegmentDescriptor>,
    pub target_resolution: String,
}

impl SegmentPlan {
    pub fn planned_duration(&self) -> f64 {
        self.segments
            .iter()
            .map(SegmentDescriptor::planned_duration)
            .sum()
    }
}
