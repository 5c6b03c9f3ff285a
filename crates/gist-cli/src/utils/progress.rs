use gistpp::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK: Duration = Duration::from_millis(100);

const PHASE_TEMPLATE: &str = "{spinner:.green} {prefix:.bold} {msg}";
const FRAMES_TEMPLATE: &str =
    "{prefix:<22.bold} [{bar:36.cyan/blue}] {pos}/{len} frames · {per_sec} · ETA {eta}";
const STREAM_TEMPLATE: &str = "{spinner:.green} {prefix:.bold} {pos} frames · {per_sec}";

/// What the terminal currently shows for a GIST run.
struct RunDisplay {
    bar: ProgressBar,
    phase: &'static str,
    completed_phases: usize,
}

impl RunDisplay {
    fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr())
            .with_style(style(PHASE_TEMPLATE));
        bar.finish_and_clear();
        Self {
            bar,
            phase: "",
            completed_phases: 0,
        }
    }

    fn apply(&mut self, event: Progress) {
        match event {
            Progress::PhaseStart { name } => {
                self.phase = name;
                self.bar.reset();
                self.bar.set_length(0);
                self.bar.set_style(style(PHASE_TEMPLATE));
                self.bar.set_prefix(name);
                self.bar.set_message("");
                self.bar.enable_steady_tick(SPINNER_TICK);
            }
            Progress::TaskStart { total_steps } => {
                self.bar.reset();
                match total_steps {
                    Some(frames) => {
                        self.bar.disable_steady_tick();
                        self.bar.set_length(frames);
                        self.bar.set_style(style(FRAMES_TEMPLATE));
                    }
                    None => {
                        self.bar.unset_length();
                        self.bar.set_style(style(STREAM_TEMPLATE));
                    }
                }
            }
            Progress::TaskIncrement => self.bar.inc(1),
            Progress::TaskFinish => {
                // A trajectory may end before its length hint.
                if let Some(frames) = self.bar.length() {
                    self.bar.set_position(self.bar.position().max(frames));
                }
                self.bar.finish();
            }
            Progress::PhaseFinish => {
                self.completed_phases += 1;
                self.bar.disable_steady_tick();
                self.bar.set_style(style(PHASE_TEMPLATE));
                self.bar.finish_with_message("✓");
            }
            Progress::Message(text) if self.bar.is_finished() => self.bar.set_message(text),
            Progress::Message(text) => self.bar.println(format!("  [{}] {}", self.phase, text)),
        }
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .expect("progress templates are static and valid")
        .progress_chars("=> ")
}

/// Renders the engine's progress events for the `run` command on stderr.
#[derive(Clone)]
pub struct CliProgressHandler {
    display: Arc<Mutex<RunDisplay>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self {
            display: Arc::new(Mutex::new(RunDisplay::new())),
        }
    }

    pub fn callback(&self) -> ProgressCallback<'static> {
        let display = Arc::clone(&self.display);
        Box::new(move |event: Progress| match display.lock() {
            Ok(mut display) => display.apply(event),
            Err(_) => warn!("Progress display lock was poisoned; dropping a progress update."),
        })
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn frames_phase(callback: &ProgressCallback<'static>, total: Option<u64>) {
        callback(Progress::PhaseStart {
            name: "Accumulating Frames",
        });
        callback(Progress::TaskStart { total_steps: total });
    }

    #[test]
    fn new_handler_shows_nothing() {
        let handler = CliProgressHandler::new();
        let display = handler.display.lock().unwrap();
        assert!(display.bar.is_finished());
        assert_eq!(display.phase, "");
        assert_eq!(display.completed_phases, 0);
    }

    #[test]
    fn known_trajectory_length_drives_a_frame_bar() {
        let handler = CliProgressHandler::new();
        let callback = handler.callback();

        frames_phase(&callback, Some(12));
        {
            let display = handler.display.lock().unwrap();
            assert_eq!(display.phase, "Accumulating Frames");
            assert_eq!(display.bar.prefix(), "Accumulating Frames");
            assert_eq!(display.bar.length(), Some(12));
            assert_eq!(display.bar.position(), 0);
        }

        for _ in 0..5 {
            callback(Progress::TaskIncrement);
        }
        assert_eq!(handler.display.lock().unwrap().bar.position(), 5);

        callback(Progress::TaskFinish);
        callback(Progress::PhaseFinish);
        let display = handler.display.lock().unwrap();
        assert!(display.bar.is_finished());
        assert_eq!(display.bar.position(), 12);
        assert_eq!(display.bar.message(), "✓");
        assert_eq!(display.completed_phases, 1);
    }

    #[test]
    fn streamed_trajectory_counts_frames() {
        let handler = CliProgressHandler::new();
        let callback = handler.callback();

        frames_phase(&callback, None);
        for _ in 0..7 {
            callback(Progress::TaskIncrement);
        }
        callback(Progress::TaskFinish);

        let display = handler.display.lock().unwrap();
        assert_eq!(display.bar.length(), None);
        assert_eq!(display.bar.position(), 7);
        assert!(display.bar.is_finished());
    }

    #[test]
    fn messages_after_a_phase_replace_the_status() {
        let handler = CliProgressHandler::new();
        let callback = handler.callback();

        callback(Progress::PhaseStart { name: "Setup" });
        callback(Progress::PhaseFinish);
        callback(Progress::Message("Grid totals logged".to_string()));

        let display = handler.display.lock().unwrap();
        assert_eq!(display.bar.message(), "Grid totals logged");
    }

    #[test]
    fn callback_can_run_on_a_worker_thread() {
        let handler = CliProgressHandler::new();
        let callback = handler.callback();

        thread::spawn(move || {
            for name in ["Setup", "Accumulating Frames", "Reduction", "Writing Output"] {
                callback(Progress::PhaseStart { name });
                callback(Progress::PhaseFinish);
            }
        })
        .join()
        .unwrap();

        let display = handler.display.lock().unwrap();
        assert_eq!(display.completed_phases, 4);
        assert_eq!(display.phase, "Writing Output");
    }
}
