use crate::{Payload, RunId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Stage the engine assets and load the transcoding capability.
    LoadEngine,
    StartConversion(ConversionRequest),
    /// Hand the converted bytes to the user under `filename`.
    DeliverDownload { filename: String, bytes: Payload },
}

/// Everything the engine needs to perform one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub run_id: RunId,
    pub input: Payload,
}
