use std::fs;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::Serialize;
use thiserror::Error;

use loopforge_core::{
    finalize_production, inventory, load_channel_catalog, AssemblyError, ChannelCatalog,
    ChannelPaths, ChannelSpec, FfmpegConcatenator, FfmpegMuxer, FfprobeProber, FinalizeRequest,
    MusicRequest, ProductionAssembler, ProductionOutput, VideoRequest,
};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] loopforge_core::ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("assembly failed: {0}")]
    Assembly(#[from] AssemblyError),
    #[error("channel {0} not found in catalogue")]
    UnknownChannel(u32),
    #[error("required resource missing: {0}")]
    MissingResource(String),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Loopforge command-line control interface", long_about = None)]
pub struct Cli {
    /// Path to the channel catalogue
    #[arg(long, default_value = "channels.toml")]
    pub config: PathBuf,
    /// Base directory holding per-channel content
    #[arg(long, default_value = "channels")]
    pub base_dir: PathBuf,
    /// Seed for reproducible clip ordering
    #[arg(long)]
    pub seed: Option<u64>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List channel concepts from the catalogue
    Channels,
    /// Create the folder structure for a channel
    Init(ChannelArgs),
    /// Production music operations
    #[command(subcommand)]
    Music(MusicCommands),
    /// Production video operations
    #[command(subcommand)]
    Video(VideoCommands),
    /// Final video operations
    #[command(subcommand)]
    Final(FinalCommands),
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
pub struct ChannelArgs {
    /// Channel ID
    pub channel_id: u32,
}

#[derive(Subcommand, Debug)]
pub enum MusicCommands {
    /// List raw music clips for a channel
    List(ChannelArgs),
    /// Assemble a production music file
    Create(MusicCreateArgs),
}

#[derive(Args, Debug)]
pub struct MusicCreateArgs {
    /// Channel ID
    pub channel_id: u32,
    /// Target duration in minutes
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub duration: u32,
    /// Skip clips whose path contains this fragment
    #[arg(long)]
    pub exclude: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum VideoCommands {
    /// List raw video clips for a channel
    List(ChannelArgs),
    /// Assemble a production video file
    Create(VideoCreateArgs),
}

#[derive(Args, Debug)]
pub struct VideoCreateArgs {
    /// Channel ID
    pub channel_id: u32,
    /// Target duration in minutes
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub duration: u32,
}

#[derive(Subcommand, Debug)]
pub enum FinalCommands {
    /// Check that production music and video are available
    Check(ChannelArgs),
    /// Mux the latest production video and music into a final file
    Create(VideoCreateArgs),
}

pub fn run(cli: Cli) -> Result<()> {
    init_tracing();
    let context = AppContext::new(&cli)?;

    match &cli.command {
        Commands::Channels => {
            let report = context.channels_report();
            render(&report, cli.format)
        }
        Commands::Init(args) => {
            let report = context.init_channel(args.channel_id)?;
            render(&report, cli.format)
        }
        Commands::Music(MusicCommands::List(args)) => {
            let report = context.music_list(args.channel_id)?;
            render(&report, cli.format)
        }
        Commands::Music(MusicCommands::Create(args)) => {
            let report = context.music_create(args)?;
            render(&report, cli.format)
        }
        Commands::Video(VideoCommands::List(args)) => {
            let report = context.video_list(args.channel_id)?;
            render(&report, cli.format)
        }
        Commands::Video(VideoCommands::Create(args)) => {
            let report = context.video_create(args)?;
            render(&report, cli.format)
        }
        Commands::Final(FinalCommands::Check(args)) => {
            let report = context.final_check(args.channel_id)?;
            render(&report, cli.format)
        }
        Commands::Final(FinalCommands::Create(args)) => {
            let report = context.final_create(args)?;
            render(&report, cli.format)
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                *shell,
                &mut Cli::command(),
                "loopforgectl",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            println!("{}", value.display());
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
            Ok(())
        }
    }
}

trait DisplayFallback {
    fn display(&self) -> String;
}

struct AppContext {
    catalog: ChannelCatalog,
    base_dir: PathBuf,
    seed: Option<u64>,
}

impl AppContext {
    fn new(cli: &Cli) -> Result<Self> {
        let catalog = load_channel_catalog(&cli.config)?;
        Ok(Self {
            catalog,
            base_dir: cli.base_dir.clone(),
            seed: cli.seed,
        })
    }

    fn channel(&self, id: u32) -> Result<&ChannelSpec> {
        self.catalog.channel(id).ok_or(AppError::UnknownChannel(id))
    }

    fn channel_paths(&self, id: u32) -> Result<(ChannelSpec, ChannelPaths)> {
        let channel = self.channel(id)?;
        Ok((channel.clone(), channel.paths(&self.base_dir)))
    }

    fn assembler(&self) -> ProductionAssembler {
        let assembler = ProductionAssembler::new(
            Arc::new(FfprobeProber::new()),
            Arc::new(FfmpegConcatenator::new()),
        );
        match self.seed {
            Some(seed) => assembler.with_seed(seed),
            None => assembler,
        }
    }

    fn channels_report(&self) -> ChannelsReport {
        ChannelsReport {
            channels: self
                .catalog
                .channels
                .iter()
                .map(|channel| ChannelSummary {
                    id: channel.id,
                    name: channel.name.clone(),
                    youtube_handle: channel.youtube_handle.clone(),
                    music_genre: channel.music_genre.clone(),
                    vibe: channel.vibe.clone(),
                    target_keywords: channel.target_keywords.clone(),
                })
                .collect(),
        }
    }

    fn init_channel(&self, id: u32) -> Result<InitReport> {
        let (channel, paths) = self.channel_paths(id)?;
        let mut created = Vec::new();
        for dir in paths.all() {
            fs::create_dir_all(dir)?;
            created.push(dir.display().to_string());
        }

        let info_path = paths.root.join("channel_info.txt");
        let info = format!(
            "Channel: {}\nYouTube Handle: {}\nMusic Genre: {}\nVibe: {}\nTarget Keywords: {}\nConcept: {}\n\nCreated: {}\n",
            channel.name,
            channel.youtube_handle,
            channel.music_genre,
            channel.vibe,
            channel.target_keywords.join(", "),
            channel.concept,
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        );
        fs::write(&info_path, info)?;

        Ok(InitReport {
            channel: channel.name,
            root: paths.root.display().to_string(),
            created,
        })
    }

    fn music_list(&self, id: u32) -> Result<ClipListReport> {
        let (channel, paths) = self.channel_paths(id)?;
        let clips = inventory::scan_clips(&paths.music_raw, inventory::AUDIO_EXTENSIONS)?;
        Ok(ClipListReport {
            channel: channel.name,
            directory: paths.music_raw.display().to_string(),
            clips: file_names(&clips),
        })
    }

    fn video_list(&self, id: u32) -> Result<ClipListReport> {
        let (channel, paths) = self.channel_paths(id)?;
        let clips = inventory::scan_clips(&paths.videos_raw, inventory::VIDEO_EXTENSIONS)?;
        Ok(ClipListReport {
            channel: channel.name,
            directory: paths.videos_raw.display().to_string(),
            clips: file_names(&clips),
        })
    }

    fn music_create(&self, args: &MusicCreateArgs) -> Result<BuildReport> {
        let (channel, paths) = self.channel_paths(args.channel_id)?;
        let clips = inventory::scan_clips(&paths.music_raw, inventory::AUDIO_EXTENSIONS)?;
        if clips.is_empty() {
            return Err(AppError::MissingResource(format!(
                "no raw music clips in {}",
                paths.music_raw.display()
            )));
        }

        let request = MusicRequest {
            clips,
            duration_minutes: args.duration,
            output_dir: paths.music_production,
            exclude: args.exclude.clone(),
        };
        let assembler = self.assembler();
        let output = block_on(async { assembler.assemble_music(&request).await })??;
        Ok(BuildReport::new(channel.name, args.duration, output))
    }

    fn video_create(&self, args: &VideoCreateArgs) -> Result<BuildReport> {
        let (channel, paths) = self.channel_paths(args.channel_id)?;
        let clips = inventory::scan_clips(&paths.videos_raw, inventory::VIDEO_EXTENSIONS)?;
        if clips.is_empty() {
            return Err(AppError::MissingResource(format!(
                "no raw video clips in {}",
                paths.videos_raw.display()
            )));
        }

        let request = VideoRequest {
            clips,
            duration_minutes: args.duration,
            output_dir: paths.videos_production,
        };
        let assembler = self.assembler();
        let output = block_on(async { assembler.assemble_video(&request).await })??;
        Ok(BuildReport::new(channel.name, args.duration, output))
    }

    fn final_check(&self, id: u32) -> Result<CheckReport> {
        let (channel, paths) = self.channel_paths(id)?;
        let music =
            inventory::production_files(&paths.music_production, inventory::AUDIO_EXTENSIONS)?;
        let videos =
            inventory::production_files(&paths.videos_production, inventory::VIDEO_EXTENSIONS)?;
        Ok(CheckReport {
            channel: channel.name,
            ready: !music.is_empty() && !videos.is_empty(),
            music: file_names(&music),
            videos: file_names(&videos),
        })
    }

    fn final_create(&self, args: &VideoCreateArgs) -> Result<BuildReport> {
        let (channel, paths) = self.channel_paths(args.channel_id)?;
        let music_file = inventory::latest_production_file(
            &paths.music_production,
            inventory::AUDIO_EXTENSIONS,
        )?
        .ok_or_else(|| {
            AppError::MissingResource(format!(
                "no production music in {}",
                paths.music_production.display()
            ))
        })?;
        let video_file = inventory::latest_production_file(
            &paths.videos_production,
            inventory::VIDEO_EXTENSIONS,
        )?
        .ok_or_else(|| {
            AppError::MissingResource(format!(
                "no production video in {}",
                paths.videos_production.display()
            ))
        })?;

        let request = FinalizeRequest {
            video_file,
            music_file,
            duration_minutes: args.duration,
            output_dir: paths.final_dir,
            channel: Some(channel.clone()),
        };
        let muxer = FfmpegMuxer::new();
        let prober = FfprobeProber::new();
        let output = block_on(async { finalize_production(&request, &muxer, &prober).await })??;
        Ok(BuildReport::new(channel.name, args.duration, output))
    }
}

fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string())
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct ChannelsReport {
    pub channels: Vec<ChannelSummary>,
}

#[derive(Debug, Serialize)]
pub struct ChannelSummary {
    pub id: u32,
    pub name: String,
    pub youtube_handle: String,
    pub music_genre: String,
    pub vibe: String,
    pub target_keywords: Vec<String>,
}

impl DisplayFallback for ChannelsReport {
    fn display(&self) -> String {
        let mut lines = Vec::new();
        for channel in &self.channels {
            lines.push(format!(
                "{}. {} ({})",
                channel.id, channel.name, channel.youtube_handle
            ));
            lines.push(format!("   Music: {}", channel.music_genre));
            lines.push(format!("   Vibe: {}", channel.vibe));
            if !channel.target_keywords.is_empty() {
                lines.push(format!(
                    "   Keywords: {}",
                    channel.target_keywords.join(", ")
                ));
            }
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct InitReport {
    pub channel: String,
    pub root: String,
    pub created: Vec<String>,
}

impl DisplayFallback for InitReport {
    fn display(&self) -> String {
        let mut lines = vec![format!("Channel structure created for {}", self.channel)];
        for dir in &self.created {
            lines.push(format!("  {dir}"));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct ClipListReport {
    pub channel: String,
    pub directory: String,
    pub clips: Vec<String>,
}

impl DisplayFallback for ClipListReport {
    fn display(&self) -> String {
        if self.clips.is_empty() {
            return format!("No clips found in {}", self.directory);
        }
        let mut lines = vec![format!("Clips in {}:", self.directory)];
        for (index, clip) in self.clips.iter().enumerate() {
            lines.push(format!("{}. {clip}", index + 1));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct BuildReport {
    pub channel: String,
    pub requested_minutes: u32,
    pub actual_seconds: f64,
    pub output: String,
    pub record: String,
    pub clips_used: usize,
    pub target_resolution: Option<String>,
}

impl BuildReport {
    fn new(channel: String, requested_minutes: u32, output: ProductionOutput) -> Self {
        Self {
            channel,
            requested_minutes,
            actual_seconds: output.actual_seconds,
            output: output.output_path.display().to_string(),
            record: output.record_path.display().to_string(),
            clips_used: output.clips_used.len(),
            target_resolution: output.target_resolution,
        }
    }
}

impl DisplayFallback for BuildReport {
    fn display(&self) -> String {
        let mut lines = vec![
            format!("Created: {}", self.output),
            format!("Record: {}", self.record),
            format!(
                "Requested {} minutes, actual {:.2} minutes",
                self.requested_minutes,
                self.actual_seconds / 60.0
            ),
            format!("Clips used: {}", self.clips_used),
        ];
        if let Some(resolution) = &self.target_resolution {
            lines.push(format!("Target resolution: {resolution}"));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub channel: String,
    pub ready: bool,
    pub music: Vec<String>,
    pub videos: Vec<String>,
}

impl DisplayFallback for CheckReport {
    fn display(&self) -> String {
        let mut lines = vec![format!(
            "Channel {}: {}",
            self.channel,
            if self.ready {
                "ready for final assembly"
            } else {
                "missing production files"
            }
        )];
        lines.push(format!("Production music files: {}", self.music.len()));
        for name in &self.music {
            lines.push(format!("  {name}"));
        }
        lines.push(format!("Production video files: {}", self.videos.len()));
        for name in &self.videos {
            lines.push(format!("  {name}"));
        }
        lines.join("\n")
    }
}
