use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str =
    "{msg}\n{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} days ({eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";
const TICK: Duration = Duration::from_millis(100);

/// Terminal progress for long derivations; a hidden reporter draws nothing
pub struct ProgressReporter {
    progress_bar: Option<ProgressBar>,
}

impl ProgressReporter {
    /// Bar counting processed days
    pub fn new(total_days: u64, message: &str, hidden: bool) -> Self {
        if hidden {
            return Self::hidden();
        }

        let style = ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        Self::start(ProgressBar::new(total_days).with_style(style), message)
    }

    pub fn new_spinner(message: &str, hidden: bool) -> Self {
        if hidden {
            return Self::hidden();
        }

        let style = ProgressStyle::default_spinner()
            .template(SPINNER_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        Self::start(ProgressBar::new_spinner().with_style(style), message)
    }

    pub fn hidden() -> Self {
        Self { progress_bar: None }
    }

    fn start(pb: ProgressBar, message: &str) -> Self {
        pb.set_message(message.to_string());
        pb.enable_steady_tick(TICK);
        Self {
            progress_bar: Some(pb),
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.progress_bar.is_none()
    }

    pub fn position(&self) -> u64 {
        self.progress_bar.as_ref().map_or(0, |pb| pb.position())
    }

    pub fn increment(&self, days: u64) {
        if let Some(pb) = &self.progress_bar {
            pb.inc(days);
        }
    }

    pub fn set_message(&self, message: &str) {
        if let Some(pb) = &self.progress_bar {
            pb.set_message(message.to_string());
        }
    }

    pub fn finish_with_message(&self, message: &str) {
        if let Some(pb) = &self.progress_bar {
            pb.finish_with_message(message.to_string());
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Some(pb) = &self.progress_bar {
            if !pb.is_finished() {
                pb.finish_and_clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_reporter_ignores_updates() {
        let progress = ProgressReporter::new(10, "Deriving", true);
        assert!(progress.is_hidden());

        progress.increment(5);
        progress.set_message("halfway");
        progress.finish_with_message("done");
        assert_eq!(progress.position(), 0);
    }

    #[test]
    fn test_bar_counts_days() {
        let progress = ProgressReporter::new(10, "Deriving", false);
        progress.increment(4);
        progress.increment(3);
        assert_eq!(progress.position(), 7);
    }
}
