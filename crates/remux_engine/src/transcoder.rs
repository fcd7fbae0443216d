use std::sync::mpsc;

use remux_core::RunId;

use crate::{EngineError, EngineEvent, StagedAssets};

/// Receives progress for a single run. A fresh sink is handed to every
/// `execute` call and dropped when it returns.
pub trait ProgressSink: Send + Sync {
    fn report(&self, fraction: f64);
}

/// Forwards progress of one run to the engine event channel.
pub struct ChannelProgressSink {
    run_id: RunId,
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(run_id: RunId, tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { run_id, tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn report(&self, fraction: f64) {
        let _ = self.tx.send(EngineEvent::Progress {
            run_id: self.run_id,
            fraction,
        });
    }
}

/// The external transcoding capability. Files are addressed by logical name
/// inside the engine's private file system.
#[async_trait::async_trait]
pub trait Transcoder: Send + Sync {
    /// Must succeed before any other call.
    async fn load(&self, assets: &StagedAssets) -> Result<(), EngineError>;

    async fn write_input(&self, name: &str, bytes: &[u8]) -> Result<(), EngineError>;

    async fn execute(&self, args: &[String], progress: &dyn ProgressSink)
        -> Result<(), EngineError>;

    async fn read_output(&self, name: &str) -> Result<Vec<u8>, EngineError>;

    async fn delete_file(&self, _name: &str) -> Result<(), EngineError> {
        Ok(())
    }
}
