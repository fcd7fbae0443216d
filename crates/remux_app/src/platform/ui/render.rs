use indicatif::{ProgressBar, ProgressStyle};
use remux_core::{AppViewModel, SessionState};

const BAR_TEMPLATE: &str = "{msg} [{bar:40.cyan/blue}] {pos:>3}%";

/// Draws view models on the terminal. The progress bar exists only while a
/// conversion is running.
#[derive(Default)]
pub struct TerminalRenderer {
    bar: Option<ProgressBar>,
    last_session: Option<SessionState>,
    last_error: Option<String>,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, view: &AppViewModel) {
        match view.progress {
            Some(percent) => {
                let bar = self.bar.get_or_insert_with(new_bar);
                bar.set_message(view.button_label);
                bar.set_position(u64::from(percent));
            }
            None => {
                if let Some(bar) = self.bar.take() {
                    bar.finish_and_clear();
                }
            }
        }

        if self.last_session != Some(view.session) {
            self.last_session = Some(view.session);
            if let Some(line) = status_line(view) {
                self.println(&line);
            }
        }

        if view.error != self.last_error {
            self.last_error = view.error.clone();
            if let Some(error) = &view.error {
                self.println(&format!("error: {error}"));
            }
        }
    }

    fn println(&self, line: &str) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }
}

fn new_bar() -> ProgressBar {
    let style = ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    ProgressBar::new(100).with_style(style)
}

fn status_line(view: &AppViewModel) -> Option<String> {
    match view.session {
        SessionState::Uninitialized => None,
        SessionState::EngineLoading => Some("Loading transcoding engine...".to_string()),
        SessionState::Ready if view.completed_runs > 0 && view.error.is_none() => {
            Some(format!("Done ({} conversion(s))", view.completed_runs))
        }
        SessionState::Ready => view
            .input_name
            .as_ref()
            .map(|name| format!("Ready: {name}")),
        SessionState::Converting => None,
        SessionState::EngineFailed => Some("Transcoding engine unavailable".to_string()),
    }
}
