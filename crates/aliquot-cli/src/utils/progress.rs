use aliquot::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

const TICK: Duration = Duration::from_millis(100);

/// Terminal view of a running workflow.
///
/// A phase without a step count shows a spinner labelled with the phase
/// name. Once the transfer announces its steps the same line becomes a step
/// bar, still prefixed by the phase.
#[derive(Clone)]
pub struct TransferProgress {
    state: Arc<Mutex<BarState>>,
}

struct BarState {
    bar: ProgressBar,
    phase: Option<&'static str>,
    finished_phases: Vec<&'static str>,
}

impl TransferProgress {
    pub fn stderr() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        Self::with_bar(bar)
    }

    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        bar.set_style(spinner_style());
        bar.finish_and_clear();
        Self {
            state: Arc::new(Mutex::new(BarState {
                bar,
                phase: None,
                finished_phases: Vec::new(),
            })),
        }
    }

    pub fn callback(&self) -> ProgressCallback<'static> {
        let state = Arc::clone(&self.state);
        Box::new(move |event: Progress| match state.lock() {
            Ok(mut state) => state.apply(event),
            Err(_) => warn!("Progress state lock was poisoned; dropping {:?}.", event),
        })
    }

    /// Phases that reported `PhaseFinish`, in order. A phase that failed
    /// part-way is not listed.
    pub fn finished_phases(&self) -> Vec<&'static str> {
        self.state
            .lock()
            .map(|state| state.finished_phases.clone())
            .unwrap_or_default()
    }
}

impl BarState {
    fn apply(&mut self, event: Progress) {
        match event {
            Progress::PhaseStart { name } => {
                self.phase = Some(name);
                self.bar.reset();
                self.bar.set_length(0);
                self.bar.set_style(spinner_style());
                self.bar.set_prefix(name);
                self.bar.set_message("");
                self.bar.enable_steady_tick(TICK);
            }
            Progress::TaskStart { total_steps } => {
                self.bar.disable_steady_tick();
                self.bar.reset();
                self.bar.set_length(total_steps);
                self.bar.set_style(steps_style());
            }
            Progress::TaskIncrement => self.bar.inc(1),
            Progress::TaskFinish => {
                let total = self.bar.length().unwrap_or(0);
                if self.bar.position() < total {
                    self.bar.set_position(total);
                }
            }
            Progress::PhaseFinish => {
                self.bar.disable_steady_tick();
                if let Some(name) = self.phase.take() {
                    self.finished_phases.push(name);
                }
                self.bar.finish_with_message("done");
            }
            Progress::Message(note) => {
                info!("{}", note);
                self.bar.set_message(note);
            }
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {prefix:.bold} {msg}")
        .expect("spinner template is valid")
}

fn steps_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:.bold:<13} [{bar:32.cyan/blue}] {pos}/{len} steps {msg}")
        .expect("step bar template is valid")
        .progress_chars("=> ")
}
