use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::Utc;
use tracing::info;

use super::error::AssemblyResult;
use super::{
    artifact_stem, ensure_dir, file_name, record_path_for, remove_artifact, write_record,
    ProductionOutput,
};
use crate::concat::Muxer;
use crate::config::ChannelSpec;
use crate::probe::MediaProber;

/// Inputs for the final mux combining one production video and one
/// production music file.
#[derive(Debug, Clone)]
pub struct FinalizeRequest {
    pub video_file: PathBuf,
    pub music_file: PathBuf,
    pub duration_minutes: u32,
    pub output_dir: PathBuf,
    /// Channel described in the companion record, when known.
    pub channel: Option<ChannelSpec>,
}

/// Muxes the production video and music into the final deliverable and
/// writes its companion record.
pub async fn finalize_production(
    request: &FinalizeRequest,
    muxer: &dyn Muxer,
    prober: &dyn MediaProber,
) -> AssemblyResult<ProductionOutput> {
    let created_at = Utc::now();
    let stem = artifact_stem("final", request.duration_minutes, created_at);
    let output_path = request.output_dir.join(format!("{stem}.mp4"));
    ensure_dir(&request.output_dir).await?;

    info!(
        video = %request.video_file.display(),
        music = %request.music_file.display(),
        output = %output_path.display(),
        "muxing final video"
    );
    if let Err(err) = muxer
        .mux(&request.video_file, &request.music_file, &output_path)
        .await
    {
        remove_artifact(&output_path).await;
        return Err(err.into());
    }

    let actual_seconds = prober.duration_seconds(&output_path).await;
    let record = final_record(request, &output_path, created_at, actual_seconds);
    let record_path = record_path_for(&output_path);
    if let Err(err) = write_record(&record_path, &record).await {
        remove_artifact(&output_path).await;
        return Err(err);
    }

    Ok(ProductionOutput {
        clips_used: vec![request.video_file.clone(), request.music_file.clone()],
        output_path,
        record_path,
        requested_seconds: f64::from(request.duration_minutes) * 60.0,
        actual_seconds,
        target_resolution: None,
        created_at,
    })
}

fn final_record(
    request: &FinalizeRequest,
    output_path: &std::path::Path,
    created_at: chrono::DateTime<Utc>,
    actual_seconds: f64,
) -> String {
    let mut record = String::new();
    let _ = writeln!(record, "Final Video: {}", file_name(output_path));
    let _ = writeln!(
        record,
        "Created: {}",
        created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(channel) = &request.channel {
        let _ = writeln!(record, "Channel: {}", channel.name);
    }
    let _ = writeln!(
        record,
        "Target Duration: {} minutes",
        request.duration_minutes
    );
    let _ = writeln!(
        record,
        "Actual Duration: {:.2} minutes ({:.2} seconds)",
        actual_seconds / 60.0,
        actual_seconds
    );
    let _ = writeln!(record, "Music File: {}", file_name(&request.music_file));
    let _ = writeln!(record, "Video File: {}", file_name(&request.video_file));
    if let Some(channel) = &request.channel {
        let _ = writeln!(record, "Music Genre: {}", channel.music_genre);
        let _ = writeln!(record, "Vibe: {}", channel.vibe);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn final_record_includes_channel_details() {
        let request = FinalizeRequest {
            video_file: PathBuf::from("videos/production/production_10min_a.mp4"),
            music_file: PathBuf::from("music/production/production_10min_b.mp3"),
            duration_minutes: 10,
            output_dir: PathBuf::from("final"),
            channel: Some(ChannelSpec {
                id: 1,
                name: "Rainy Jazz Cafe".into(),
                youtube_handle: "@rainyjazzcafe".into(),
                music_genre: "jazz".into(),
                vibe: "cozy".into(),
                target_keywords: vec![],
                concept: String::new(),
            }),
        };
        let record = final_record(
            &request,
            Path::new("final/final_10min_x.mp4"),
            Utc::now(),
            598.2,
        );
        assert!(record.contains("Channel: Rainy Jazz Cafe"));
        assert!(record.contains("Music File: production_10min_b.mp3"));
        assert!(record.contains("Music Genre: jazz"));
    }
}
