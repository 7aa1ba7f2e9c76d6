mod error;
mod finalize;
mod models;
pub mod playlist;
pub mod segments;

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::concat::Concatenator;
use crate::probe::MediaProber;

pub use error::{AssemblyError, AssemblyResult};
pub use finalize::{finalize_production, FinalizeRequest};
pub use models::{ClipAsset, SegmentDescriptor, SegmentPlan};
pub use playlist::build_audio_playlist;
pub use segments::plan_video_segments;

/// Inputs for one production music build.
#[derive(Debug, Clone)]
pub struct MusicRequest {
    pub clips: Vec<PathBuf>,
    pub duration_minutes: u32,
    pub output_dir: PathBuf,
    /// Skip clips whose path contains this fragment.
    pub exclude: Option<String>,
}

/// Inputs for one production video build.
#[derive(Debug, Clone)]
pub struct VideoRequest {
    pub clips: Vec<PathBuf>,
    pub duration_minutes: u32,
    pub output_dir: PathBuf,
}

/// The emitted production file plus its companion descriptive record.
#[derive(Debug, Clone, Serialize)]
pub struct ProductionOutput {
    pub output_path: PathBuf,
    pub record_path: PathBuf,
    pub requested_seconds: f64,
    pub actual_seconds: f64,
    pub clips_used: Vec<PathBuf>,
    pub target_resolution: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Builds production media to a requested duration by selecting, looping
/// and concatenating raw clips.
///
/// Probing and concatenation are delegated through the [`MediaProber`]
/// and [`Concatenator`] capabilities so the assembly logic can run
/// against fakes in tests. An explicit seed makes clip ordering
/// reproducible.
pub struct ProductionAssembler {
    prober: Arc<dyn MediaProber>,
    concatenator: Arc<dyn Concatenator>,
    seed: Option<u64>,
}

impl ProductionAssembler {
    pub fn new(prober: Arc<dyn MediaProber>, concatenator: Arc<dyn Concatenator>) -> Self {
        Self {
            prober,
            concatenator,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn rng(&self) -> ChaCha20Rng {
        match self.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        }
    }

    /// Assembles a production music file whose duration meets or exceeds
    /// the request, then writes its companion record.
    pub async fn assemble_music(&self, request: &MusicRequest) -> AssemblyResult<ProductionOutput> {
        let target_seconds = f64::from(request.duration_minutes) * 60.0;

        let mut clips = Vec::with_capacity(request.clips.len());
        for path in &request.clips {
            let duration = self.prober.duration_seconds(path).await;
            if duration <= 0.0 {
                warn!(file = %path.display(), "clip duration unreadable, dropping from selection");
            }
            clips.push(ClipAsset::audio(path.clone(), duration));
        }

        let mut rng = self.rng();
        let playlist =
            build_audio_playlist(&clips, target_seconds, request.exclude.as_deref(), &mut rng)?;

        let created_at = Utc::now();
        let stem = artifact_stem("production", request.duration_minutes, created_at);
        let extension = playlist
            .first()
            .and_then(|clip| clip.path.extension())
            .and_then(|ext| ext.to_str())
            .unwrap_or("mp3");
        let output_path = request.output_dir.join(format!("{stem}.{extension}"));
        ensure_dir(&request.output_dir).await?;

        info!(
            tracks = playlist.len(),
            target_seconds,
            output = %output_path.display(),
            "concatenating production music"
        );
        let inputs: Vec<PathBuf> = playlist.iter().map(|clip| clip.path.clone()).collect();
        if let Err(err) = self.concatenator.concat(&inputs, &output_path).await {
            remove_artifact(&output_path).await;
            return Err(err.into());
        }

        let actual_seconds = self.prober.duration_seconds(&output_path).await;
        let record = music_record(
            &output_path,
            created_at,
            request.duration_minutes,
            actual_seconds,
            &playlist,
        );
        let record_path = record_path_for(&output_path);
        if let Err(err) = write_record(&record_path, &record).await {
            remove_artifact(&output_path).await;
            return Err(err);
        }

        Ok(ProductionOutput {
            output_path,
            record_path,
            requested_seconds: target_seconds,
            actual_seconds,
            clips_used: inputs,
            target_resolution: None,
            created_at,
        })
    }

    /// Assembles a production video by looping each clip toward an equal
    /// share of the target, shuffling the looped segments and
    /// concatenating them.
    ///
    /// Looped intermediates live in a scoped temporary directory that is
    /// removed whether or not the build succeeds.
    pub async fn assemble_video(&self, request: &VideoRequest) -> AssemblyResult<ProductionOutput> {
        let target_seconds = f64::from(request.duration_minutes) * 60.0;

        let mut clips = Vec::with_capacity(request.clips.len());
        for path in &request.clips {
            let duration = self.prober.duration_seconds(path).await;
            let resolution = self.prober.resolution(path).await;
            if duration <= 0.0 {
                warn!(file = %path.display(), "clip duration unreadable, dropping from selection");
            }
            clips.push(ClipAsset::video(path.clone(), duration, resolution));
        }

        let plan = plan_video_segments(&clips, target_seconds)?;
        info!(
            segments = plan.segments.len(),
            target_resolution = %plan.target_resolution,
            planned_seconds = plan.planned_duration(),
            "planned video segments"
        );

        ensure_dir(&request.output_dir).await?;
        let workdir = tempfile::Builder::new()
            .prefix("loopforge_segments_")
            .tempdir()
            .map_err(|source| AssemblyError::Io {
                path: std::env::temp_dir(),
                source,
            })?;

        let mut segment_paths = Vec::with_capacity(plan.segments.len());
        for (index, segment) in plan.segments.iter().enumerate() {
            if segment.repeat_count > 1 {
                let looped = workdir
                    .path()
                    .join(format!("looped_{index:02}_{}", segment.clip.file_name()));
                let inputs = vec![segment.clip.path.clone(); segment.repeat_count as usize];
                self.concatenator.concat(&inputs, &looped).await?;
                segment_paths.push(looped);
            } else {
                segment_paths.push(segment.clip.path.clone());
            }
        }

        let mut rng = self.rng();
        segment_paths.shuffle(&mut rng);

        let created_at = Utc::now();
        let stem = artifact_stem("production", request.duration_minutes, created_at);
        let extension = plan
            .segments
            .first()
            .and_then(|segment| segment.clip.path.extension())
            .and_then(|ext| ext.to_str())
            .unwrap_or("mp4");
        let output_path = request.output_dir.join(format!("{stem}.{extension}"));

        info!(
            segments = segment_paths.len(),
            output = %output_path.display(),
            "concatenating production video"
        );
        if let Err(err) = self.concatenator.concat(&segment_paths, &output_path).await {
            remove_artifact(&output_path).await;
            return Err(err.into());
        }

        let actual_seconds = self.prober.duration_seconds(&output_path).await;
        let record = video_record(
            &output_path,
            created_at,
            request.duration_minutes,
            actual_seconds,
            &plan,
        );
        let record_path = record_path_for(&output_path);
        if let Err(err) = write_record(&record_path, &record).await {
            remove_artifact(&output_path).await;
            return Err(err);
        }

        if let Err(err) = workdir.close() {
            warn!(error = %err, "failed to remove segment workdir");
        }

        Ok(ProductionOutput {
            output_path,
            record_path,
            requested_seconds: target_seconds,
            actual_seconds,
            clips_used: plan
                .segments
                .iter()
                .map(|segment| segment.clip.path.clone())
                .collect(),
            target_resolution: Some(plan.target_resolution),
            created_at,
        })
    }
}

/// Artifact stem encoding the requested duration, a creation timestamp
/// and a random suffix so re-runs never collide.
pub(crate) fn artifact_stem(
    prefix: &str,
    duration_minutes: u32,
    created_at: DateTime<Utc>,
) -> String {
    let unique = Uuid::new_v4().simple().to_string();
    format!(
        "{prefix}_{duration_minutes}min_{}_{}",
        created_at.format("%Y%m%d_%H%M%S"),
        &unique[..8]
    )
}

pub(crate) fn record_path_for(output_path: &Path) -> PathBuf {
    let stem = output_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "production".to_string());
    output_path.with_file_name(format!("metadata_{stem}.txt"))
}

pub(crate) async fn write_record(path: &Path, contents: &str) -> AssemblyResult<()> {
    fs::write(path, contents)
        .await
        .map_err(|source| AssemblyError::Io {
            path: path.to_path_buf(),
            source,
        })
}

pub(crate) async fn ensure_dir(dir: &Path) -> AssemblyResult<()> {
    fs::create_dir_all(dir)
        .await
        .map_err(|source| AssemblyError::Io {
            path: dir.to_path_buf(),
            source,
        })
}

pub(crate) async fn remove_artifact(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(file = %path.display(), error = %err, "failed to remove artifact"),
    }
}

fn music_record(
    output_path: &Path,
    created_at: DateTime<Utc>,
    duration_minutes: u32,
    actual_seconds: f64,
    playlist: &[ClipAsset],
) -> String {
    let mut record = String::new();
    let name = file_name(output_path);
    let _ = writeln!(record, "Production Music File: {name}");
    let _ = writeln!(
        record,
        "Created: {}",
        created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(record, "Target Duration: {duration_minutes} minutes");
    let _ = writeln!(
        record,
        "Actual Duration: {:.2} minutes ({:.2} seconds)",
        actual_seconds / 60.0,
        actual_seconds
    );
    let _ = writeln!(record, "Number of Tracks: {}", playlist.len());
    let _ = writeln!(record);
    let _ = writeln!(record, "Tracks Used:");
    for (index, clip) in playlist.iter().enumerate() {
        let _ = writeln!(record, "{}. {}", index + 1, clip.file_name());
    }
    record
}

fn video_record(
    output_path: &Path,
    created_at: DateTime<Utc>,
    duration_minutes: u32,
    actual_seconds: f64,
    plan: &SegmentPlan,
) -> String {
    let mut record = String::new();
    let name = file_name(output_path);
    let _ = writeln!(record, "Production Video File: {name}");
    let _ = writeln!(
        record,
        "Created: {}",
        created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(record, "Target Duration: {duration_minutes} minutes");
    let _ = writeln!(
        record,
        "Actual Duration: {:.2} minutes ({:.2} seconds)",
        actual_seconds / 60.0,
        actual_seconds
    );
    let _ = writeln!(record, "Target Resolution: {}", plan.target_resolution);
    let _ = writeln!(record, "Number of Source Videos: {}", plan.segments.len());
    let _ = writeln!(record);
    let _ = writeln!(record, "Videos Used:");
    for (index, segment) in plan.segments.iter().enumerate() {
        let _ = writeln!(
            record,
            "{}. {} (x{})",
            index + 1,
            segment.clip.file_name(),
            segment.repeat_count
        );
    }
    record
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_stems_are_unique_per_invocation() {
        let now = Utc::now();
        let first = artifact_stem("production", 10, now);
        let second = artifact_stem("production", 10, now);
        assert!(first.starts_with("production_10min_"));
        assert_ne!(first, second);
    }

    #[test]
    fn record_path_sits_next_to_output() {
        let record = record_path_for(Path::new(
            "channels/Cafe/music/production/production_10min_20240101_120000_ab12cd34.mp3",
        ));
        assert_eq!(
            record,
            PathBuf::from(
                "channels/Cafe/music/production/metadata_production_10min_20240101_120000_ab12cd34.txt"
            )
        );
    }

    #[test]
    fn music_record_lists_tracks_in_order() {
        let playlist = vec![
            ClipAsset::audio("raw/first.mp3", 120.0),
            ClipAsset::audio("raw/second.mp3", 90.0),
        ];
        let record = music_record(
            Path::new("production_5min_x.mp3"),
            Utc::now(),
            5,
            210.0,
            &playlist,
        );
        assert!(record.contains("Target Duration: 5 minutes"));
        assert!(record.contains("1. first.mp3"));
        assert!(record.contains("2. second.mp3"));
        assert!(record.contains("(210.00 seconds)"));
    }
}
