use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use loopforge_core::{
    finalize_production, AssemblyError, ConcatError, ConcatResult, Concatenator, FinalizeRequest,
    MediaProber, MusicRequest, Muxer, ProductionAssembler, VideoRequest, UNKNOWN_RESOLUTION,
};

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().to_string()
}

#[derive(Default)]
struct FakeProber {
    durations: HashMap<String, f64>,
    resolutions: HashMap<String, String>,
}

impl FakeProber {
    fn with_duration(mut self, name: &str, seconds: f64) -> Self {
        self.durations.insert(name.to_string(), seconds);
        self
    }

    fn with_resolution(mut self, name: &str, resolution: &str) -> Self {
        self.resolutions
            .insert(name.to_string(), resolution.to_string());
        self
    }
}

#[async_trait]
impl MediaProber for FakeProber {
    async fn duration_seconds(&self, path: &Path) -> f64 {
        self.durations
            .get(&file_name(path))
            .copied()
            .unwrap_or(0.0)
    }

    async fn resolution(&self, path: &Path) -> String {
        self.resolutions
            .get(&file_name(path))
            .cloned()
            .unwrap_or_else(|| UNKNOWN_RESOLUTION.to_string())
    }
}

/// Concatenator that records every call and writes a plain-text stand-in
/// for the joined output. Optionally fails on the nth call without
/// producing the destination file.
#[derive(Default)]
struct FakeConcatenator {
    calls: Mutex<Vec<(Vec<PathBuf>, PathBuf)>>,
    fail_on_call: Option<usize>,
    counter: AtomicUsize,
}

impl FakeConcatenator {
    fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<(Vec<PathBuf>, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Concatenator for FakeConcatenator {
    async fn concat(&self, inputs: &[PathBuf], dest: &Path) -> ConcatResult<()> {
        let call = self.counter.fetch_add(1, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push((inputs.to_vec(), dest.to_path_buf()));
        if self.fail_on_call == Some(call) {
            return Err(ConcatError::ToolFailure {
                tool: "fake-ffmpeg".into(),
                status: Some(1),
                stderr: "simulated failure".into(),
            });
        }
        let manifest: String = inputs
            .iter()
            .map(|input| format!("{}\n", input.display()))
            .collect();
        std::fs::write(dest, manifest).map_err(|source| ConcatError::Manifest { source })?;
        Ok(())
    }
}

struct FakeMuxer;

#[async_trait]
impl Muxer for FakeMuxer {
    async fn mux(&self, video: &Path, audio: &Path, dest: &Path) -> ConcatResult<()> {
        let contents = format!("{}\n{}\n", video.display(), audio.display());
        std::fs::write(dest, contents).map_err(|source| ConcatError::Manifest { source })?;
        Ok(())
    }
}

struct Fixture {
    _root: tempfile::TempDir,
    raw_dir: PathBuf,
    output_dir: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let raw_dir = root.path().join("raw");
        let output_dir = root.path().join("production");
        std::fs::create_dir_all(&raw_dir).unwrap();
        Self {
            _root: root,
            raw_dir,
            output_dir,
        }
    }

    fn clip(&self, name: &str) -> PathBuf {
        let path = self.raw_dir.join(name);
        std::fs::write(&path, b"media").unwrap();
        path
    }

    fn output_entries(&self) -> Vec<String> {
        match std::fs::read_dir(&self.output_dir) {
            Ok(entries) => entries
                .map(|entry| file_name(&entry.unwrap().path()))
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

fn music_fixture() -> (Fixture, MusicRequest, Arc<FakeProber>) {
    let fixture = Fixture::new();
    let clips = vec![
        fixture.clip("track_a.mp3"),
        fixture.clip("track_b.mp3"),
        fixture.clip("track_c.mp3"),
    ];
    let prober = Arc::new(
        FakeProber::default()
            .with_duration("track_a.mp3", 200.0)
            .with_duration("track_b.mp3", 150.0)
            .with_duration("track_c.mp3", 100.0),
    );
    let request = MusicRequest {
        clips,
        duration_minutes: 5,
        output_dir: fixture.output_dir.clone(),
        exclude: None,
    };
    (fixture, request, prober)
}

#[tokio::test]
async fn music_build_reaches_target_and_writes_record() {
    let (_fixture, request, prober) = music_fixture();
    let concatenator = Arc::new(FakeConcatenator::default());
    let assembler = ProductionAssembler::new(prober.clone(), concatenator.clone()).with_seed(7);

    let output = assembler.assemble_music(&request).await.unwrap();

    assert!(output.output_path.exists());
    assert!(output.record_path.exists());
    assert_eq!(output.requested_seconds, 300.0);

    let mut selected = 0.0;
    for clip in &output.clips_used {
        selected += prober.duration_seconds(clip).await;
    }
    assert!(selected >= 300.0);
    for pair in output.clips_used.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }

    let record = std::fs::read_to_string(&output.record_path).unwrap();
    assert!(record.contains("Production Music File:"));
    assert!(record.contains("Target Duration: 5 minutes"));
    assert!(record.contains("Tracks Used:"));

    let calls = concatenator.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, output.clips_used);
}

#[tokio::test]
async fn music_build_excludes_named_track() {
    let (_fixture, mut request, prober) = music_fixture();
    request.exclude = Some("track_b".into());
    let concatenator = Arc::new(FakeConcatenator::default());
    let assembler = ProductionAssembler::new(prober, concatenator).with_seed(7);

    let output = assembler.assemble_music(&request).await.unwrap();
    assert!(!output.clips_used.is_empty());
    assert!(output
        .clips_used
        .iter()
        .all(|clip| !clip.to_string_lossy().contains("track_b")));
}

#[tokio::test]
async fn music_build_fails_cleanly_without_usable_durations() {
    let (fixture, request, _) = music_fixture();
    let prober = Arc::new(FakeProber::default());
    let concatenator = Arc::new(FakeConcatenator::default());
    let assembler = ProductionAssembler::new(prober, concatenator.clone());

    let err = assembler.assemble_music(&request).await.unwrap_err();
    assert!(matches!(err, AssemblyError::NoUsableDurations));
    assert!(concatenator.calls().is_empty());
    assert!(fixture.output_entries().is_empty());
}

#[tokio::test]
async fn music_build_failure_leaves_no_artifacts() {
    let (fixture, request, prober) = music_fixture();
    let concatenator = Arc::new(FakeConcatenator::failing_on(0));
    let assembler = ProductionAssembler::new(prober, concatenator).with_seed(7);

    let err = assembler.assemble_music(&request).await.unwrap_err();
    assert!(matches!(err, AssemblyError::ConcatenationFailed(_)));
    assert!(fixture.output_entries().is_empty());
}

#[tokio::test]
async fn reruns_produce_distinct_artifacts() {
    let (_fixture, request, prober) = music_fixture();
    let concatenator = Arc::new(FakeConcatenator::default());
    let assembler = ProductionAssembler::new(prober, concatenator);

    let first = assembler.assemble_music(&request).await.unwrap();
    let second = assembler.assemble_music(&request).await.unwrap();
    assert_ne!(first.output_path, second.output_path);
    assert!(first.output_path.exists());
    assert!(second.output_path.exists());
}

#[tokio::test]
async fn seeded_builds_are_reproducible() {
    let (_fixture, request, prober) = music_fixture();
    let concatenator = Arc::new(FakeConcatenator::default());

    let first = ProductionAssembler::new(prober.clone(), concatenator.clone())
        .with_seed(9)
        .assemble_music(&request)
        .await
        .unwrap();
    let second = ProductionAssembler::new(prober, concatenator)
        .with_seed(9)
        .assemble_music(&request)
        .await
        .unwrap();
    assert_eq!(first.clips_used, second.clips_used);
}

fn video_fixture() -> (Fixture, VideoRequest, Arc<FakeProber>) {
    let fixture = Fixture::new();
    let clips = vec![fixture.clip("scene_a.mp4"), fixture.clip("scene_b.mp4")];
    let prober = Arc::new(
        FakeProber::default()
            .with_duration("scene_a.mp4", 60.0)
            .with_duration("scene_b.mp4", 90.0)
            .with_resolution("scene_a.mp4", "1920x1080")
            .with_resolution("scene_b.mp4", "1920x1080"),
    );
    let request = VideoRequest {
        clips,
        duration_minutes: 5,
        output_dir: fixture.output_dir.clone(),
    };
    (fixture, request, prober)
}

#[tokio::test]
async fn video_build_loops_clips_toward_their_portion() {
    let (_fixture, request, prober) = video_fixture();
    let concatenator = Arc::new(FakeConcatenator::default());
    let assembler = ProductionAssembler::new(prober, concatenator.clone()).with_seed(3);

    let output = assembler.assemble_video(&request).await.unwrap();
    assert_eq!(output.target_resolution.as_deref(), Some("1920x1080"));

    // 150s portion each: scene_a loops 3 times, scene_b twice, then one
    // final join of both segments.
    let calls = concatenator.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].0.len(), 3);
    assert!(calls[0].0.iter().all(|input| input.ends_with("scene_a.mp4")));
    assert_eq!(calls[1].0.len(), 2);
    assert!(calls[1].0.iter().all(|input| input.ends_with("scene_b.mp4")));
    assert_eq!(calls[2].0.len(), 2);
    assert_eq!(calls[2].1, output.output_path);

    // Looped intermediates are scoped to the build.
    assert!(!calls[0].1.exists());
    assert!(!calls[1].1.exists());

    let record = std::fs::read_to_string(&output.record_path).unwrap();
    assert!(record.contains("Target Resolution: 1920x1080"));
    assert!(record.contains("(x3)"));
    assert!(record.contains("(x2)"));
}

#[tokio::test]
async fn video_build_failure_cleans_up_temporaries() {
    let (fixture, request, prober) = video_fixture();
    // Loop joins succeed, the final join fails.
    let concatenator = Arc::new(FakeConcatenator::failing_on(2));
    let assembler = ProductionAssembler::new(prober, concatenator.clone()).with_seed(3);

    let err = assembler.assemble_video(&request).await.unwrap_err();
    assert!(matches!(err, AssemblyError::ConcatenationFailed(_)));
    assert!(fixture.output_entries().is_empty());

    let calls = concatenator.calls();
    assert_eq!(calls.len(), 3);
    assert!(!calls[0].1.exists());
    assert!(!calls[1].1.exists());
}

#[tokio::test]
async fn video_build_fails_without_clips() {
    let fixture = Fixture::new();
    let request = VideoRequest {
        clips: Vec::new(),
        duration_minutes: 5,
        output_dir: fixture.output_dir.clone(),
    };
    let assembler = ProductionAssembler::new(
        Arc::new(FakeProber::default()),
        Arc::new(FakeConcatenator::default()),
    );
    let err = assembler.assemble_video(&request).await.unwrap_err();
    assert!(matches!(err, AssemblyError::NoAssetsAvailable));
}

#[tokio::test]
async fn finalize_muxes_and_records() {
    let fixture = Fixture::new();
    let video = fixture.clip("production_10min_video.mp4");
    let music = fixture.clip("production_10min_music.mp3");
    let request = FinalizeRequest {
        video_file: video,
        music_file: music,
        duration_minutes: 10,
        output_dir: fixture.output_dir.clone(),
        channel: None,
    };
    let prober = FakeProber::default();

    let output = finalize_production(&request, &FakeMuxer, &prober)
        .await
        .unwrap();
    assert!(output.output_path.exists());
    let name = file_name(&output.output_path);
    assert!(name.starts_with("final_10min_"));

    let record = std::fs::read_to_string(&output.record_path).unwrap();
    assert!(record.contains("Final Video:"));
    assert!(record.contains("Music File: production_10min_music.mp3"));
}
