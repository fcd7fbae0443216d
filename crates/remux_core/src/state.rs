use std::fmt;
use std::sync::Arc;

use crate::command::{download_filename, percent_from_fraction};
use crate::effect::ConversionRequest;
use crate::view_model::AppViewModel;

pub type RunId = u64;

/// Binary payload shared between the session and the engine without copying.
pub type Payload = Arc<[u8]>;

pub const ENGINE_LOAD_ERROR_LABEL: &str = "Failed to load the transcoding engine: ";
pub const CONVERSION_ERROR_LABEL: &str = "Conversion failed: ";
pub const DOWNLOAD_ERROR_LABEL: &str = "Could not save ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineStatus {
    #[default]
    Uninitialized,
    Loading,
    Ready,
    /// Load failed; there is no recovery within the session.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    EngineLoading,
    Ready,
    Converting,
    EngineFailed,
}

/// Why a convert request did not start a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EngineNotReady,
    NoInput,
    RunInProgress,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EngineNotReady => write!(f, "engine not ready"),
            SkipReason::NoInput => write!(f, "no input selected"),
            SkipReason::RunInProgress => write!(f, "a conversion is already running"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSelection {
    pub name: String,
    pub bytes: Payload,
}

impl InputSelection {
    pub fn new(name: impl Into<String>, bytes: impl Into<Payload>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRun {
    pub run_id: RunId,
    /// Whole percentage, never decreasing within the run.
    pub progress: u8,
    /// Name of the file this run was started for.
    pub input_name: String,
    pub input: Payload,
    pub download_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    engine: EngineStatus,
    input: Option<InputSelection>,
    run: Option<ConversionRun>,
    error: Option<String>,
    last_skip: Option<SkipReason>,
    last_run_id: RunId,
    completed_runs: u32,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> SessionState {
        match self.engine {
            EngineStatus::Uninitialized => SessionState::Uninitialized,
            EngineStatus::Loading => SessionState::EngineLoading,
            EngineStatus::Failed => SessionState::EngineFailed,
            EngineStatus::Ready if self.run.is_some() => SessionState::Converting,
            EngineStatus::Ready => SessionState::Ready,
        }
    }

    pub fn engine_status(&self) -> EngineStatus {
        self.engine
    }

    pub fn input(&self) -> Option<&InputSelection> {
        self.input.as_ref()
    }

    pub fn run(&self) -> Option<&ConversionRun> {
        self.run.as_ref()
    }

    /// Progress of the active run, 0 when idle.
    pub fn progress(&self) -> u8 {
        self.run.as_ref().map_or(0, |run| run.progress)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn last_skip(&self) -> Option<SkipReason> {
        self.last_skip
    }

    pub fn completed_runs(&self) -> u32 {
        self.completed_runs
    }

    /// Preconditions for starting a run.
    pub fn convert_guard(&self) -> Result<(), SkipReason> {
        if self.engine != EngineStatus::Ready {
            return Err(SkipReason::EngineNotReady);
        }
        if self.run.is_some() {
            return Err(SkipReason::RunInProgress);
        }
        if self.input.is_none() {
            return Err(SkipReason::NoInput);
        }
        Ok(())
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel::from_state(self, self.dirty)
    }

    /// Returns whether anything changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn begin_engine_load(&mut self) -> bool {
        if self.engine != EngineStatus::Uninitialized {
            return false;
        }
        self.engine = EngineStatus::Loading;
        self.dirty = true;
        true
    }

    pub(crate) fn engine_ready(&mut self) {
        if self.engine == EngineStatus::Loading {
            self.engine = EngineStatus::Ready;
            self.dirty = true;
        }
    }

    pub(crate) fn engine_failed(&mut self, message: &str) {
        if self.engine == EngineStatus::Loading {
            self.engine = EngineStatus::Failed;
            self.error = Some(format!("{ENGINE_LOAD_ERROR_LABEL}{message}"));
            self.dirty = true;
        }
    }

    pub(crate) fn select_input(&mut self, selection: InputSelection) {
        self.input = Some(selection);
        self.dirty = true;
    }

    pub(crate) fn record_skip(&mut self, reason: SkipReason) {
        if self.last_skip != Some(reason) {
            self.last_skip = Some(reason);
            self.dirty = true;
        }
    }

    /// Starts a run for the current selection. Callers check `convert_guard` first.
    pub(crate) fn start_run(&mut self) -> Option<ConversionRequest> {
        let input = self.input.clone()?;
        self.last_run_id += 1;
        let run_id = self.last_run_id;
        let request = ConversionRequest {
            run_id,
            input: input.bytes.clone(),
        };
        self.run = Some(ConversionRun {
            run_id,
            progress: 0,
            download_name: download_filename(&input.name),
            input_name: input.name,
            input: input.bytes,
        });
        self.error = None;
        self.last_skip = None;
        self.dirty = true;
        Some(request)
    }

    pub(crate) fn apply_progress(&mut self, run_id: RunId, fraction: f64) {
        let Some(run) = self.run.as_mut().filter(|run| run.run_id == run_id) else {
            return;
        };
        let percent = percent_from_fraction(fraction);
        if percent > run.progress {
            run.progress = percent;
            self.dirty = true;
        }
    }

    /// Ends the active run successfully and returns it. The selection that
    /// produced it is discarded unless the user already picked another file.
    pub(crate) fn finish_success(&mut self, run_id: RunId) -> Option<ConversionRun> {
        let run = self.take_run(run_id)?;
        if self
            .input
            .as_ref()
            .is_some_and(|input| Arc::ptr_eq(&input.bytes, &run.input))
        {
            self.input = None;
        }
        self.completed_runs += 1;
        Some(run)
    }

    /// Ends the active run with an error. The selection is kept for a retry.
    pub(crate) fn finish_failure(&mut self, run_id: RunId, message: &str) -> bool {
        if self.take_run(run_id).is_none() {
            return false;
        }
        self.error = Some(format!("{CONVERSION_ERROR_LABEL}{message}"));
        true
    }

    pub(crate) fn record_download_failure(&mut self, filename: &str, message: &str) {
        self.error = Some(format!("{DOWNLOAD_ERROR_LABEL}{filename}: {message}"));
        self.dirty = true;
    }

    fn take_run(&mut self, run_id: RunId) -> Option<ConversionRun> {
        if self.run.as_ref()?.run_id != run_id {
            return None;
        }
        self.dirty = true;
        self.run.take()
    }
}
