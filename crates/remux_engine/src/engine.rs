use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use futures_util::FutureExt;

use engine_logging::{
    clear_run_context, engine_error, engine_info, engine_warn, set_run_context,
};
use remux_core::{remux_args, Payload, RunId, INPUT_LOGICAL_NAME, OUTPUT_LOGICAL_NAME};

use crate::transcoder::ChannelProgressSink;
use crate::{
    AssetConfig, AssetStager, EngineError, EngineEvent, FailureKind, ProgressSink, StagedAssets,
    Transcoder,
};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub assets: AssetConfig,
}

enum EngineCommand {
    Load,
    Convert { run_id: RunId, input: Payload },
}

/// Handle to the engine's execution context. Commands are processed one at a
/// time, in order, on a dedicated thread; results come back as events.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(transcoder: Arc<dyn Transcoder>, config: EngineConfig) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|err| EngineError::new(FailureKind::Runtime, err.to_string()))?;

        let mut worker = Worker {
            stager: AssetStager::new(config.assets.settings.clone()),
            config,
            transcoder,
            staged: None,
            event_tx,
        };
        thread::Builder::new()
            .name("remux-engine".to_string())
            .spawn(move || {
                while let Ok(command) = cmd_rx.recv() {
                    let event = runtime.block_on(worker.handle(command));
                    if worker.event_tx.send(event).is_err() {
                        break;
                    }
                }
            })
            .map_err(|err| EngineError::new(FailureKind::Runtime, err.to_string()))?;

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn load(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Load);
    }

    pub fn convert(&self, run_id: RunId, input: Payload) {
        let _ = self.cmd_tx.send(EngineCommand::Convert { run_id, input });
    }

    /// `Ok(None)` when nothing arrived within `timeout`. Fails once the
    /// engine thread is gone, since no further events can arrive.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<EngineEvent>, EngineError> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(EngineError::new(
                FailureKind::Runtime,
                "engine thread stopped",
            )),
        }
    }
}

struct Worker {
    config: EngineConfig,
    stager: AssetStager,
    transcoder: Arc<dyn Transcoder>,
    /// Kept alive for as long as the engine may refer to the staged files.
    staged: Option<StagedAssets>,
    event_tx: mpsc::Sender<EngineEvent>,
}

impl Worker {
    /// Runs one command to completion. A panic inside the transcoder ends
    /// the command with a `Runtime` failure and leaves the worker running.
    async fn handle(&mut self, command: EngineCommand) -> EngineEvent {
        match command {
            EngineCommand::Load => {
                let result = AssertUnwindSafe(self.load())
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(panicked(panic)));
                if let Err(err) = &result {
                    engine_error!("Engine load failed: {}", err);
                }
                EngineEvent::LoadCompleted(result)
            }
            EngineCommand::Convert { run_id, input } => {
                set_run_context(run_id);
                let result = AssertUnwindSafe(self.convert(run_id, &input))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(panicked(panic)));
                match &result {
                    Ok(output) => engine_info!("Conversion produced {} bytes", output.len()),
                    Err(err) => engine_warn!("Conversion failed: {}", err),
                }
                clear_run_context();
                EngineEvent::ConversionCompleted {
                    run_id,
                    result: result.map(Payload::from),
                }
            }
        }
    }

    async fn load(&mut self) -> Result<(), EngineError> {
        if self.staged.is_some() {
            return Ok(());
        }
        let staged = self.stager.stage_all(&self.config.assets).await?;
        self.transcoder.load(&staged).await?;
        self.staged = Some(staged);
        engine_info!("Engine ready");
        Ok(())
    }

    async fn convert(&self, run_id: RunId, input: &[u8]) -> Result<Vec<u8>, EngineError> {
        if self.staged.is_none() {
            return Err(EngineError::new(
                FailureKind::NotLoaded,
                "engine is not loaded",
            ));
        }
        engine_info!("Converting {} input bytes", input.len());
        let sink = ChannelProgressSink::new(run_id, self.event_tx.clone());
        run_remux(self.transcoder.as_ref(), input, &sink).await
    }
}

fn panicked(payload: Box<dyn Any + Send>) -> EngineError {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|text| text.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    EngineError::new(FailureKind::Runtime, format!("engine panicked: {detail}"))
}

/// Stages `input`, runs the fixed remux request and returns the output.
/// Both logical files are removed afterwards, whatever the outcome.
pub async fn run_remux(
    transcoder: &dyn Transcoder,
    input: &[u8],
    progress: &dyn ProgressSink,
) -> Result<Vec<u8>, EngineError> {
    let result = async {
        transcoder.write_input(INPUT_LOGICAL_NAME, input).await?;
        transcoder.execute(&remux_args(), progress).await?;
        transcoder.read_output(OUTPUT_LOGICAL_NAME).await
    }
    .await;

    for name in [INPUT_LOGICAL_NAME, OUTPUT_LOGICAL_NAME] {
        if let Err(err) = transcoder.delete_file(name).await {
            engine_warn!("Could not remove {}: {}", name, err);
        }
    }
    result
}
