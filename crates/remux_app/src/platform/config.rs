//! Command line and config file handling.
//!
//! Settings come from an optional RON file (`webm2mp4.ron` in the working
//! directory unless `--config` names another one); command line flags win.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use remux_engine::{AssetConfig, AssetSource};
use serde::Deserialize;

use super::logging::LogDestination;

const DEFAULT_CONFIG_FILENAME: &str = "webm2mp4.ron";
const DEFAULT_ASSET_DIR: &str = "./public";

/// Re-package a WebM video as MP4 without re-encoding the video stream.
#[derive(Debug, Parser)]
#[command(name = "webm2mp4", version)]
pub struct Cli {
    /// The .webm file to convert.
    pub input: PathBuf,
    /// RON config file.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Directory or base URL holding ffmpeg-core.js and ffmpeg-core.wasm; both
    /// are looked up below its path.
    #[arg(long)]
    pub assets: Option<String>,
    /// ffmpeg program to run.
    #[arg(long)]
    pub ffmpeg: Option<PathBuf>,
    /// Where the converted file is saved.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub log: Option<LogDestination>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    ffmpeg_program: Option<PathBuf>,
    assets: Option<String>,
    output_dir: Option<PathBuf>,
    log_destination: Option<LogDestination>,
    asset_max_bytes: Option<u64>,
    asset_request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub input: PathBuf,
    pub ffmpeg_program: PathBuf,
    pub assets: AssetConfig,
    pub output_dir: PathBuf,
    pub log_destination: LogDestination,
}

impl AppConfig {
    pub fn resolve(cli: Cli) -> anyhow::Result<Self> {
        let file = load_file_config(cli.config.as_deref())?;

        let asset_location = cli
            .assets
            .or(file.assets)
            .unwrap_or_else(|| DEFAULT_ASSET_DIR.to_string());
        let source: AssetSource = asset_location
            .parse()
            .with_context(|| format!("invalid asset location {asset_location:?}"))?;
        let mut assets = AssetConfig::new(source);
        if let Some(max_bytes) = file.asset_max_bytes {
            assets.settings.max_bytes = max_bytes;
        }
        if let Some(secs) = file.asset_request_timeout_secs {
            assets.settings.request_timeout = Duration::from_secs(secs);
        }

        Ok(Self {
            input: cli.input,
            ffmpeg_program: cli
                .ffmpeg
                .or(file.ffmpeg_program)
                .unwrap_or_else(|| PathBuf::from("ffmpeg")),
            assets,
            output_dir: cli
                .output_dir
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            log_destination: cli.log.or(file.log_destination).unwrap_or_default(),
        })
    }
}

fn load_file_config(explicit: Option<&Path>) -> anyhow::Result<FileConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILENAME);
            if !default.is_file() {
                return Ok(FileConfig::default());
            }
            default
        }
    };
    if !path.is_file() {
        bail!("config file {:?} does not exist", path);
    }
    let content =
        fs::read_to_string(&path).with_context(|| format!("failed to read {:?}", path))?;
    parse_file_config(&content).with_context(|| format!("failed to parse {:?}", path))
}

fn parse_file_config(content: &str) -> anyhow::Result<FileConfig> {
    Ok(ron::from_str(content)?)
}
