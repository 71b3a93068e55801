use afcluster::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

const SPINNER_TICK_MS: u64 = 80;

/// What the terminal currently shows: one line per phase, prefixed with the phase name.
///
/// Tasks inside a phase turn the line into a bar. The remote search counts polling seconds
/// and the radius sweep counts candidates, so the bar shows elapsed time next to its position.
/// Status updates (ticket states, refinement steps) become the trailing message, and repeats
/// of the same status are dropped so a long `RUNNING` poll does not redraw the line.
struct Display {
    bar: ProgressBar,
    phase: Option<&'static str>,
    last_status: Option<String>,
}

impl Display {
    fn start_phase(&mut self, name: &'static str) {
        self.bar.reset();
        self.bar.set_length(0);
        self.bar.set_style(CliProgressHandler::spinner_style());
        self.bar.set_prefix(name);
        self.bar.set_message("");
        self.bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
        self.phase = Some(name);
        self.last_status = None;
    }

    fn finish_phase(&mut self) {
        let elapsed = self.bar.elapsed().as_secs_f64();
        self.bar.disable_steady_tick();
        self.bar.set_style(CliProgressHandler::spinner_style());
        self.bar.finish_with_message(format!("✓ done in {:.1}s", elapsed));
        self.phase = None;
        self.last_status = None;
    }

    fn start_task(&mut self, total: u64) {
        if self.bar.is_finished() {
            self.bar.reset();
        }
        self.bar.disable_steady_tick();
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(CliProgressHandler::bar_style());
    }

    /// Fills the bar and hands the line back to the phase spinner; the phase may still have
    /// work left after its counted part (downloading and unpacking after polling).
    fn finish_task(&mut self) {
        let length = self.bar.length().unwrap_or(0);
        if self.bar.position() < length {
            self.bar.set_position(length);
        }
        if self.phase.is_some() {
            self.bar.set_style(CliProgressHandler::spinner_style());
            self.bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
        } else {
            self.bar.finish();
        }
    }

    fn status(&mut self, text: String) {
        if self.last_status.as_deref() == Some(text.as_str()) {
            return;
        }
        debug!(phase = ?self.phase, status = %text, "Progress status changed");
        self.bar.set_message(text.clone());
        self.last_status = Some(text);
    }

    fn message(&self, msg: String) {
        if self.bar.is_finished() {
            self.bar.set_message(msg);
        } else {
            self.bar.println(format!("  {}", msg));
        }
    }
}

/// Renders library progress events on stderr.
#[derive(Clone)]
pub struct CliProgressHandler {
    display: Arc<Mutex<Display>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr())
            .with_style(Self::spinner_style());
        bar.finish_and_clear();

        Self {
            display: Arc::new(Mutex::new(Display {
                bar,
                phase: None,
                last_status: None,
            })),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let display = self.display.clone();

        Box::new(move |progress: Progress| {
            let Ok(mut display) = display.lock() else {
                warn!("Progress display mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } => display.start_phase(name),
                Progress::PhaseFinish => display.finish_phase(),
                Progress::TaskStart { total } => display.start_task(total),
                Progress::TaskIncrement { amount } => display.bar.inc(amount),
                Progress::TaskFinish => display.finish_task(),
                Progress::StatusUpdate { text } => display.status(text),
                Progress::Message(msg) => display.message(msg),
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {prefix:.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{prefix:.bold:<14} [{bar:30.cyan/blue}] {pos}/{len} {elapsed_secs} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .with_key(
            "elapsed_secs",
            |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                let _ = write!(w, "{}s", state.elapsed().as_secs());
            },
        )
        .progress_chars("##-")
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

    #[test]
    fn handler_starts_idle() {
        let handler = CliProgressHandler::new();
        let display = handler.display.lock().unwrap();
        assert_eq!(display.bar.length(), Some(0));
        assert!(display.bar.is_finished());
        assert!(display.phase.is_none());
    }

    #[test]
    fn remote_search_events_drive_one_phase_line() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart { name: "MSA Search" });
        {
            let display = handler.display.lock().unwrap();
            assert_eq!(display.bar.prefix(), "MSA Search");
            assert_eq!(display.phase, Some("MSA Search"));
            assert!(!display.bar.is_finished());
        }

        callback(Progress::TaskStart { total: 150 });
        callback(Progress::StatusUpdate {
            text: "PENDING".to_string(),
        });
        callback(Progress::TaskIncrement { amount: 7 });
        callback(Progress::StatusUpdate {
            text: "RUNNING".to_string(),
        });
        {
            let display = handler.display.lock().unwrap();
            assert_eq!(display.bar.length(), Some(150));
            assert_eq!(display.bar.position(), 7);
            assert_eq!(display.bar.message(), "RUNNING");
        }

        callback(Progress::TaskFinish);
        {
            let display = handler.display.lock().unwrap();
            assert_eq!(display.bar.position(), 150);
            assert!(!display.bar.is_finished());
        }

        callback(Progress::StatusUpdate {
            text: "DOWNLOAD".to_string(),
        });
        callback(Progress::PhaseFinish);
        {
            let display = handler.display.lock().unwrap();
            assert!(display.bar.is_finished());
            assert!(display.bar.message().starts_with("✓ done in "));
            assert!(display.phase.is_none());
        }
    }

    #[test]
    fn repeated_status_is_recorded_once() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart { name: "MSA Search" });
        for _ in 0..3 {
            callback(Progress::StatusUpdate {
                text: "RUNNING".to_string(),
            });
        }
        let display = handler.display.lock().unwrap();
        assert_eq!(display.last_status.as_deref(), Some("RUNNING"));
        assert_eq!(display.bar.message(), "RUNNING");
    }

    #[test]
    fn new_phase_forgets_previous_status() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart { name: "MSA Search" });
        callback(Progress::StatusUpdate {
            text: "COMPLETE".to_string(),
        });
        callback(Progress::PhaseFinish);
        callback(Progress::PhaseStart {
            name: "Radius Search",
        });

        let display = handler.display.lock().unwrap();
        assert_eq!(display.bar.prefix(), "Radius Search");
        assert_eq!(display.bar.message(), "");
        assert!(display.last_status.is_none());
    }

    #[test]
    fn task_outside_a_phase_finishes_the_bar() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::TaskStart { total: 4 });
        callback(Progress::TaskIncrement { amount: 1 });
        callback(Progress::TaskFinish);

        let display = handler.display.lock().unwrap();
        assert!(display.bar.is_finished());
        assert_eq!(display.bar.position(), 4);
    }

    #[test]
    fn callback_is_thread_safe() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::PhaseStart {
                name: "Clustering",
            });
            callback(Progress::TaskIncrement { amount: 1 });
            callback(Progress::PhaseFinish);
        })
        .join()
        .unwrap();

        let display = handler.display.lock().unwrap();
        assert!(display.bar.is_finished());
    }
}
