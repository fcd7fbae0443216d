use crate::{AppState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::EngineLoadRequested => {
            // The engine is loaded once per session; later requests are ignored.
            if state.begin_engine_load() {
                vec![Effect::LoadEngine]
            } else {
                Vec::new()
            }
        }
        Msg::EngineReady => {
            state.engine_ready();
            Vec::new()
        }
        Msg::EngineLoadFailed(message) => {
            state.engine_failed(&message);
            Vec::new()
        }
        Msg::FileSelected(selection) => {
            state.select_input(selection);
            Vec::new()
        }
        Msg::ConvertClicked => match state.convert_guard() {
            Ok(()) => state
                .start_run()
                .map(Effect::StartConversion)
                .into_iter()
                .collect(),
            Err(reason) => {
                state.record_skip(reason);
                Vec::new()
            }
        },
        Msg::ConversionProgress { run_id, fraction } => {
            state.apply_progress(run_id, fraction);
            Vec::new()
        }
        Msg::ConversionSucceeded { run_id, output } => match state.finish_success(run_id) {
            Some(run) => vec![Effect::DeliverDownload {
                filename: run.download_name,
                bytes: output,
            }],
            None => Vec::new(),
        },
        Msg::ConversionFailed { run_id, message } => {
            state.finish_failure(run_id, &message);
            Vec::new()
        }
        Msg::DownloadFailed { filename, message } => {
            state.record_download_failure(&filename, &message);
            Vec::new()
        }
    };

    (state, effects)
}
