//! CLI presenter for output formatting

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::application::ViewSnapshot;

const BAR_WIDTH: usize = 20;

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
}

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    /// Update spinner message
    pub fn update_spinner(&self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    /// Mark spinner as success and finish
    pub fn spinner_success(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✓".green(), message));
        }
    }

    /// Mark spinner as failed and finish
    pub fn spinner_fail(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✗".red(), message));
        }
    }

    /// Stop spinner without status
    pub fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        self.println_stderr(format!("{} {}", "ℹ".cyan(), message));
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        self.println_stderr(format!("{} {}", "✓".green(), message));
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        self.println_stderr(format!("{} {}", "⚠".yellow(), message));
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        self.println_stderr(format!("{} {}", "✗".red(), message));
    }

    /// Output text to stdout (paths, info, config values)
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Print a key-value pair (for config list and info)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }

    // Route through the spinner so the status line is not torn.
    fn println_stderr(&self, line: String) {
        match self.spinner {
            Some(ref spinner) => spinner.suspend(|| eprintln!("{}", line)),
            None => eprintln!("{}", line),
        }
    }

    /// Playback bar: `[████░░░░] 00:05:20 / 00:10:00`
    pub fn format_progress(&self, ratio: f32, position: &str, duration: &str) -> String {
        let filled = filled_cells(ratio);
        format!(
            "[{}{}] {} / {}",
            "█".repeat(filled).cyan(),
            "░".repeat(BAR_WIDTH - filled),
            position,
            duration
        )
    }

    /// Level meter for a normalized `0.0..=1.0` value
    pub fn format_meter(&self, level: f32) -> String {
        let filled = filled_cells(level);
        let bar = "▮".repeat(filled);
        let bar = if level > 0.9 {
            bar.red()
        } else if level > 0.6 {
            bar.yellow()
        } else {
            bar.green()
        };
        format!("{}{}", bar, "▯".repeat(BAR_WIDTH - filled))
    }

    /// Status line while recording
    pub fn recording_line(&self, view: &ViewSnapshot, metering: bool) -> String {
        let label = if view.is_recording_paused {
            "Paused".yellow()
        } else {
            "Recording".red()
        };
        let mut line = format!("{} {}", label, view.record_time);
        if metering {
            line.push(' ');
            line.push_str(&self.format_meter(view.metering_level));
        }
        line
    }

    /// Status line while playing
    pub fn playback_line(&self, view: &ViewSnapshot) -> String {
        let label = if view.is_playing_paused {
            "Paused".yellow()
        } else {
            "Playing".green()
        };
        let mut line = format!(
            "{} {}",
            label,
            self.format_progress(view.play_progress, &view.play_time, &view.duration)
        );
        if (view.playback_speed - 1.0).abs() > f32::EPSILON {
            line.push_str(&format!(" x{:.2}", view.playback_speed));
        }
        line
    }

    /// Update the spinner with the recording status line
    pub fn update_recording_progress(&self, view: &ViewSnapshot, metering: bool) {
        self.update_spinner(&self.recording_line(view, metering));
    }

    /// Update the spinner with the playback status line
    pub fn update_playback_progress(&self, view: &ViewSnapshot) {
        self.update_spinner(&self.playback_line(view));
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

fn filled_cells(ratio: f32) -> usize {
    let ratio = if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        0.0
    };
    (ratio * BAR_WIDTH as f32).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_progress_at_start() {
        let presenter = Presenter::new();
        let progress = presenter.format_progress(0.0, "00:00:00", "00:10:00");
        assert!(progress.contains("00:00:00 / 00:10:00"));
        assert_eq!(progress.matches('░').count(), BAR_WIDTH);
    }

    #[test]
    fn format_progress_at_half() {
        let presenter = Presenter::new();
        let progress = presenter.format_progress(0.5, "00:05:00", "00:10:00");
        assert!(progress.contains("00:05:00 / 00:10:00"));
        assert_eq!(progress.matches('░').count(), BAR_WIDTH / 2);
    }

    #[test]
    fn format_progress_clamps() {
        let presenter = Presenter::new();
        assert_eq!(
            presenter
                .format_progress(3.0, "a", "b")
                .matches('░')
                .count(),
            0
        );
        assert_eq!(
            presenter
                .format_progress(f32::NAN, "a", "b")
                .matches('░')
                .count(),
            BAR_WIDTH
        );
    }

    #[test]
    fn meter_fills_with_level() {
        let presenter = Presenter::new();
        assert_eq!(presenter.format_meter(0.0).matches('▯').count(), BAR_WIDTH);
        assert_eq!(presenter.format_meter(1.0).matches('▮').count(), BAR_WIDTH);
    }

    #[test]
    fn recording_line_shows_pause_and_meter() {
        let presenter = Presenter::new();
        let view = ViewSnapshot {
            record_time: "00:03:50".to_string(),
            is_recording: true,
            is_recording_paused: true,
            metering_level: 0.5,
            ..Default::default()
        };
        let line = presenter.recording_line(&view, true);
        assert!(line.contains("Paused"));
        assert!(line.contains("00:03:50"));
        assert!(line.contains('▮'));
        assert!(!presenter.recording_line(&view, false).contains('▮'));
    }

    #[test]
    fn playback_line_shows_speed_when_changed() {
        let presenter = Presenter::new();
        let mut view = ViewSnapshot {
            is_playing: true,
            ..Default::default()
        };
        assert!(!presenter.playback_line(&view).contains('x'));
        view.playback_speed = 1.5;
        assert!(presenter.playback_line(&view).contains("x1.50"));
    }
}
