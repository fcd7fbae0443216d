//! Remux engine: transcoding capability, asset staging and effect execution.
mod assets;
mod engine;
mod ffmpeg;
mod persist;
mod progress;
mod transcoder;
mod types;

pub use assets::{
    AssetConfig, AssetError, AssetSettings, AssetSource, AssetSpec, AssetStager, StagedAsset,
    StagedAssets,
};
pub use engine::{run_remux, EngineConfig, EngineHandle};
pub use ffmpeg::{FfmpegCliTranscoder, FfmpegSettings};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use progress::StderrMonitor;
pub use transcoder::{ChannelProgressSink, ProgressSink, Transcoder};
pub use types::{EngineError, EngineEvent, FailureKind};
