use std::collections::VecDeque;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use engine_logging::{engine_info, engine_warn};
use remux_core::{is_webm_name, update, AppState, AppViewModel, InputSelection, Msg, SessionState};
use remux_engine::{EngineConfig, EngineError, EngineHandle, FfmpegCliTranscoder, FfmpegSettings};

use super::config::{AppConfig, Cli};
use super::effects::EffectRunner;
use super::logging;
use super::ui::render::TerminalRenderer;

/// How long to wait for an engine event before redrawing.
const TICK_INTERVAL: Duration = Duration::from_millis(75);

pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = AppConfig::resolve(cli)?;
    logging::initialize(config.log_destination);

    let input = pick_input(&config.input)?;

    let transcoder = Arc::new(FfmpegCliTranscoder::new(FfmpegSettings {
        program: config.ffmpeg_program.clone(),
        work_root: None,
    }));
    let engine = EngineHandle::new(
        transcoder,
        EngineConfig {
            assets: config.assets.clone(),
        },
    )
    .context("failed to start the transcoding engine")?;

    let mut session = Session::new(EffectRunner::new(engine, config.output_dir.clone()));
    let mut renderer = TerminalRenderer::new();

    renderer.render(&session.dispatch(Msg::EngineLoadRequested));
    // Picking a file while the engine loads only replaces the selection.
    renderer.render(&session.dispatch(Msg::FileSelected(input)));
    session.run_until(&mut renderer, |state| {
        state.session() != SessionState::EngineLoading
    })?;
    if session.state().session() == SessionState::EngineFailed {
        return Ok(ExitCode::FAILURE);
    }

    renderer.render(&session.dispatch(Msg::ConvertClicked));
    if let Some(reason) = session.state().last_skip() {
        engine_warn!("Conversion skipped: {}", reason);
        eprintln!("Nothing to do: {reason}");
        return Ok(ExitCode::FAILURE);
    }
    session.run_until(&mut renderer, |state| {
        state.session() != SessionState::Converting
    })?;

    if session.state().error().is_some() {
        return Ok(ExitCode::FAILURE);
    }
    if let Some(path) = session.effects.last_saved() {
        println!("Saved {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

/// The file picker: only `.webm` names are accepted, the content is not inspected.
fn pick_input(path: &Path) -> anyhow::Result<InputSelection> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?;
    if !is_webm_name(name) {
        bail!("{} is not a .webm file", path.display());
    }
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    engine_info!("Selected {} ({} bytes)", name, bytes.len());
    Ok(InputSelection::new(name, bytes))
}

/// One conversion session: the state, and the effect runner that acts on it.
pub struct Session {
    state: AppState,
    effects: EffectRunner,
}

impl Session {
    pub fn new(effects: EffectRunner) -> Self {
        Self {
            state: AppState::new(),
            effects,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Applies `msg` and every message its effects produce, then returns the
    /// resulting view.
    pub fn dispatch(&mut self, msg: Msg) -> AppViewModel {
        let mut inbox = VecDeque::from([msg]);
        while let Some(msg) = inbox.pop_front() {
            let state = std::mem::take(&mut self.state);
            let (state, effects) = update(state, msg);
            self.state = state;
            for effect in effects {
                inbox.extend(self.effects.run(effect));
            }
        }
        let view = self.state.view();
        self.state.consume_dirty();
        view
    }

    /// Waits up to `timeout` for one engine event and applies it. Returns the
    /// new view if anything visible changed.
    pub fn pump(&mut self, timeout: Duration) -> Result<Option<AppViewModel>, EngineError> {
        let Some(msg) = self.effects.next_msg(timeout)? else {
            return Ok(None);
        };
        let view = self.dispatch(msg);
        Ok(view.dirty.then_some(view))
    }

    /// Processes engine events until `done` holds for the state. Fails if
    /// the engine goes away first.
    pub fn run_until(
        &mut self,
        renderer: &mut TerminalRenderer,
        done: impl Fn(&AppState) -> bool,
    ) -> anyhow::Result<()> {
        while !done(&self.state) {
            let view = self
                .pump(TICK_INTERVAL)
                .context("lost the transcoding engine")?;
            if let Some(view) = view {
                renderer.render(&view);
            }
        }
        Ok(())
    }
}
