use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

// The trailing blank is what a finished bar shows
const TICK_STRINGS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", " "];
const TICK: Duration = Duration::from_millis(80);
const TEMPLATE: &str = "{spinner:.blue} {msg:.dim}";

type MakeTarget = Box<dyn Fn() -> ProgressDrawTarget + Send>;

/// Busy indicator animated by an indicatif ticker thread.
///
/// `start` returns immediately. `stop` disables the steady tick, which joins
/// the ticker, and then clears the line, so nothing the spinner draws can land
/// after output that follows the call.
pub struct Spinner {
    make_target: MakeTarget,
    bar: Option<ProgressBar>,
}

impl Spinner {
    /// Each start draws a fresh bar on a target built by `make_target`
    pub fn new<F>(make_target: F) -> Self
    where
        F: Fn() -> ProgressDrawTarget + Send + 'static,
    {
        Self {
            make_target: Box::new(make_target),
            bar: None,
        }
    }

    pub fn stderr() -> Self {
        Self::new(ProgressDrawTarget::stderr)
    }

    /// A spinner that never draws
    pub fn hidden() -> Self {
        Self::new(ProgressDrawTarget::hidden)
    }

    pub fn is_running(&self) -> bool {
        self.bar.is_some()
    }

    /// Start animating `message`, unless already running
    pub fn start(&mut self, message: &str) {
        if self.bar.is_some() {
            return;
        }
        let bar = ProgressBar::with_draw_target(None, (self.make_target)());
        bar.set_style(spinner_style());
        bar.set_message(message.to_string());
        bar.enable_steady_tick(TICK);
        self.bar = Some(bar);
    }

    pub fn stop(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spinner_style() -> ProgressStyle {
    match ProgressStyle::with_template(TEMPLATE) {
        Ok(style) => style.tick_strings(TICK_STRINGS),
        Err(e) => {
            tracing::warn!(error = %e, "bad spinner template");
            ProgressStyle::default_spinner()
        }
    }
}
