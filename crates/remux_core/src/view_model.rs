use crate::{AppState, SessionState, SkipReason};

pub const BUTTON_LABEL_IDLE: &str = "Convert to MP4";
pub const BUTTON_LABEL_BUSY: &str = "Converting...";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub session: SessionState,
    pub input_name: Option<String>,
    pub button_label: &'static str,
    pub button_enabled: bool,
    /// Only present while a conversion is running.
    pub progress: Option<u8>,
    pub error: Option<String>,
    pub last_skip: Option<SkipReason>,
    pub completed_runs: u32,
    pub dirty: bool,
}

impl AppViewModel {
    pub(crate) fn from_state(state: &AppState, dirty: bool) -> Self {
        let session = state.session();
        let converting = session == SessionState::Converting;
        Self {
            session,
            input_name: state.input().map(|input| input.name.clone()),
            button_label: if converting {
                BUTTON_LABEL_BUSY
            } else {
                BUTTON_LABEL_IDLE
            },
            button_enabled: state.convert_guard().is_ok(),
            progress: converting.then(|| state.progress()),
            error: state.error().map(ToOwned::to_owned),
            last_skip: state.last_skip(),
            completed_runs: state.completed_runs(),
            dirty,
        }
    }
}
