#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Session start: ask for the engine to be loaded.
    EngineLoadRequested,
    /// Engine finished loading and accepts work.
    EngineReady,
    /// Engine could not be loaded; the session cannot convert anything.
    EngineLoadFailed(String),
    /// User picked a file.
    FileSelected(crate::InputSelection),
    /// User pressed the convert button.
    ConvertClicked,
    /// Engine progress for a run, as a fraction in `[0, 1]`.
    ConversionProgress { run_id: crate::RunId, fraction: f64 },
    /// Engine produced the output for a run.
    ConversionSucceeded {
        run_id: crate::RunId,
        output: crate::Payload,
    },
    /// Engine failed while staging, executing or reading back a run.
    ConversionFailed { run_id: crate::RunId, message: String },
    /// The converted file could not be handed to the user.
    DownloadFailed { filename: String, message: String },
}

