//! Transcoder backed by a native `ffmpeg` program.
//!
//! The engine's file system is a private temporary directory created on load;
//! logical names map to files directly inside it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;

use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use engine_logging::{engine_debug, engine_info, engine_warn};

use crate::{EngineError, FailureKind, ProgressSink, StagedAssets, StderrMonitor, Transcoder};

/// Flags that keep the program from waiting on a terminal.
const NON_INTERACTIVE_ARGS: [&str; 3] = ["-nostdin", "-y", "-hide_banner"];

#[derive(Debug, Clone)]
pub struct FfmpegSettings {
    /// Program name resolved through `PATH`, or a path to the executable.
    pub program: PathBuf,
    /// Parent of the working directory; the system temp dir when `None`.
    pub work_root: Option<PathBuf>,
}

impl Default for FfmpegSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            work_root: None,
        }
    }
}

#[derive(Debug)]
pub struct FfmpegCliTranscoder {
    settings: FfmpegSettings,
    workspace: OnceLock<TempDir>,
}

impl FfmpegCliTranscoder {
    pub fn new(settings: FfmpegSettings) -> Self {
        Self {
            settings,
            workspace: OnceLock::new(),
        }
    }

    fn work_dir(&self) -> Result<&Path, EngineError> {
        self.workspace
            .get()
            .map(TempDir::path)
            .ok_or_else(|| EngineError::new(FailureKind::NotLoaded, "engine is not loaded"))
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, EngineError> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0']);
        if !valid {
            return Err(EngineError::new(
                FailureKind::InvalidName,
                format!("invalid file name {name:?}"),
            ));
        }
        Ok(self.work_dir()?.join(name))
    }

    async fn probe_program(&self) -> Result<(), EngineError> {
        let program = self.settings.program.display().to_string();
        let output = Command::new(&self.settings.program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|err| {
                if err.kind() == ErrorKind::NotFound {
                    EngineError::new(FailureKind::Load, format!("{program} not found"))
                } else {
                    EngineError::new(FailureKind::Load, format!("cannot run {program}: {err}"))
                }
            })?;

        if !output.status.success() {
            return Err(EngineError::new(
                FailureKind::Load,
                format!("{program} -version failed ({})", output.status),
            ));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        if let Some(version) = stdout.lines().next() {
            engine_info!("Using {}", version);
        }
        Ok(())
    }

    fn create_workspace(&self) -> Result<TempDir, EngineError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("webm2mp4-fs-");
        let created = match &self.settings.work_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        created.map_err(|err| EngineError::io("cannot create engine working directory", err))
    }
}

#[async_trait::async_trait]
impl Transcoder for FfmpegCliTranscoder {
    async fn load(&self, assets: &StagedAssets) -> Result<(), EngineError> {
        if self.workspace.get().is_some() {
            return Ok(());
        }
        for asset in [assets.runtime(), assets.binary()] {
            if asset.byte_len == 0 || !asset.path.is_file() {
                return Err(EngineError::new(
                    FailureKind::Load,
                    format!("staged asset {:?} is unusable", asset.path),
                ));
            }
        }
        self.probe_program().await?;

        let workspace = self.create_workspace()?;
        engine_debug!("Engine working directory {:?}", workspace.path());
        // A concurrent load may have won; its directory is kept and ours is dropped.
        let _ = self.workspace.set(workspace);
        Ok(())
    }

    async fn write_input(&self, name: &str, bytes: &[u8]) -> Result<(), EngineError> {
        let path = self.resolve(name)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|err| EngineError::io(format!("cannot write {name}"), err))
    }

    async fn execute(
        &self,
        args: &[String],
        progress: &dyn ProgressSink,
    ) -> Result<(), EngineError> {
        let work_dir = self.work_dir()?;
        let program = self.settings.program.display().to_string();
        engine_info!("Executing {} {}", program, args.join(" "));

        let mut child = Command::new(&self.settings.program)
            .args(NON_INTERACTIVE_ARGS)
            .args(args)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| EngineError::io(format!("cannot start {program}"), err))?;

        let mut monitor = StderrMonitor::new();
        if let Some(mut stderr) = child.stderr.take() {
            let mut buf = [0u8; 4096];
            loop {
                let read = stderr
                    .read(&mut buf)
                    .await
                    .map_err(|err| EngineError::io(format!("cannot read {program} output"), err))?;
                if read == 0 {
                    break;
                }
                for fraction in monitor.feed(&buf[..read]) {
                    progress.report(fraction);
                }
            }
        }
        for fraction in monitor.finish() {
            progress.report(fraction);
        }

        let status = child
            .wait()
            .await
            .map_err(|err| EngineError::io(format!("cannot wait for {program}"), err))?;
        if !status.success() {
            let reason = monitor.last_diagnostic().unwrap_or("no diagnostic output");
            engine_warn!("{} failed ({}): {}", program, status, reason);
            return Err(EngineError::new(
                FailureKind::Execution {
                    exit_code: status.code(),
                },
                format!("{program} failed ({status}): {reason}"),
            ));
        }

        progress.report(1.0);
        Ok(())
    }

    async fn read_output(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        let path = self.resolve(name)?;
        tokio::fs::read(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                EngineError::new(FailureKind::MissingOutput, format!("{name} was not produced"))
            } else {
                EngineError::io(format!("cannot read {name}"), err)
            }
        })
    }

    async fn delete_file(&self, name: &str) -> Result<(), EngineError> {
        let path = self.resolve(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(EngineError::io(format!("cannot delete {name}"), err)),
        }
    }
}
