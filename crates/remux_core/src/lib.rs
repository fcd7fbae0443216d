//! Remux core: pure session state machine and view-model helpers.
mod command;
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use command::{
    download_filename, is_webm_name, percent_from_fraction, remux_args, INPUT_LOGICAL_NAME,
    OUTPUT_LOGICAL_NAME,
};
pub use effect::{ConversionRequest, Effect};
pub use msg::Msg;
pub use state::{
    AppState, ConversionRun, EngineStatus, InputSelection, Payload, RunId, SessionState,
    SkipReason, CONVERSION_ERROR_LABEL, DOWNLOAD_ERROR_LABEL, ENGINE_LOAD_ERROR_LABEL,
};
pub use update::update;
pub use view_model::{AppViewModel, BUTTON_LABEL_BUSY, BUTTON_LABEL_IDLE};
