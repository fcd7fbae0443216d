use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::{engine_error, engine_info, engine_warn};
use remux_core::{Effect, Msg};
use remux_engine::{AtomicFileWriter, EngineError, EngineEvent, EngineHandle};

/// Executes core effects against the engine and the download directory, and
/// turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
    downloads: AtomicFileWriter,
    last_saved: Option<PathBuf>,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, output_dir: PathBuf) -> Self {
        Self {
            engine,
            downloads: AtomicFileWriter::new(output_dir),
            last_saved: None,
        }
    }

    /// Runs one effect. Failures that the user must see come back as a message.
    pub fn run(&mut self, effect: Effect) -> Option<Msg> {
        match effect {
            Effect::LoadEngine => {
                engine_info!("LoadEngine");
                self.engine.load();
                None
            }
            Effect::StartConversion(request) => {
                engine_info!(
                    "StartConversion run_id={} input_len={}",
                    request.run_id,
                    request.input.len()
                );
                self.engine.convert(request.run_id, request.input);
                None
            }
            Effect::DeliverDownload { filename, bytes } => {
                match self.downloads.write(&filename, &bytes) {
                    Ok(path) => {
                        engine_info!("Saved {} bytes to {:?}", bytes.len(), path);
                        self.last_saved = Some(path);
                        None
                    }
                    Err(err) => {
                        engine_error!("Failed to save {}: {}", filename, err);
                        Some(Msg::DownloadFailed {
                            filename,
                            message: err.to_string(),
                        })
                    }
                }
            }
        }
    }

    /// Waits up to `timeout` for the next engine event.
    pub fn next_msg(&self, timeout: Duration) -> Result<Option<Msg>, EngineError> {
        Ok(self.engine.recv_timeout(timeout)?.map(map_event))
    }

    /// Path of the most recent download written to disk.
    pub fn last_saved(&self) -> Option<&Path> {
        self.last_saved.as_deref()
    }
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::LoadCompleted(Ok(())) => Msg::EngineReady,
        EngineEvent::LoadCompleted(Err(err)) => Msg::EngineLoadFailed(err.to_string()),
        EngineEvent::Progress { run_id, fraction } => Msg::ConversionProgress { run_id, fraction },
        EngineEvent::ConversionCompleted {
            run_id,
            result: Ok(output),
        } => Msg::ConversionSucceeded { run_id, output },
        EngineEvent::ConversionCompleted {
            run_id,
            result: Err(err),
        } => {
            engine_warn!("Run {} failed ({}): {}", run_id, err.kind, err.message);
            Msg::ConversionFailed {
                run_id,
                message: err.to_string(),
            }
        }
    }
}
