pub mod assembly;
pub mod concat;
pub mod config;
pub mod error;
pub mod inventory;
pub mod probe;

pub use assembly::{
    build_audio_playlist, finalize_production, plan_video_segments, AssemblyError, AssemblyResult,
    ClipAsset, FinalizeRequest, MusicRequest, ProductionAssembler, ProductionOutput,
    SegmentDescriptor, SegmentPlan, VideoRequest,
};
pub use concat::{ConcatError, ConcatResult, Concatenator, FfmpegConcatenator, FfmpegMuxer, Muxer};
pub use config::{load_channel_catalog, ChannelCatalog, ChannelPaths, ChannelSpec};
pub use error::{ConfigError, Result};
pub use probe::{FfprobeProber, MediaProber, UNKNOWN_RESOLUTION};
