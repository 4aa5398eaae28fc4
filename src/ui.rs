//! Terminal feedback for the binaries: stage spinners and session progress.

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::session::SampleUpdate;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

impl UiMode {
    pub fn parse(flag: Option<&str>) -> Self {
        match flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self { mode, is_tty }
    }

    /// Build from the `--ui` flag, checking whether stderr is a terminal.
    pub fn detect(flag: Option<&str>) -> Self {
        use std::io::IsTerminal;
        Self::new(UiMode::parse(flag), std::io::stderr().is_terminal())
    }

    fn pretty(&self) -> bool {
        match self.mode {
            UiMode::Pretty => true,
            UiMode::Auto => self.is_tty,
            UiMode::Plain => false,
        }
    }

    /// Announce a named step; its duration is printed when the guard drops.
    pub fn stage(&self, name: &str) -> StageGuard {
        if !self.pretty() {
            eprintln!("==> {}", name);
            return StageGuard::new(name, None);
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_draw_target(ProgressDrawTarget::stderr());
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(format!("{name}…"));
        StageGuard::new(name, Some(spinner))
    }

    /// Progress display for one video session. `frame_count` of 0 means the
    /// length is unknown and only counters are shown.
    pub fn session_progress(&self, frame_count: u64) -> SessionProgress {
        if !self.pretty() {
            return SessionProgress {
                bar: None,
                last_report: Instant::now(),
            };
        }
        let (bar, template) = if frame_count > 0 {
            (
                ProgressBar::new(frame_count),
                "{bar:30} {pos}/{len} frames [{elapsed_precise}] {msg}",
            )
        } else {
            (
                ProgressBar::new_spinner(),
                "{spinner} {pos} frames [{elapsed_precise}] {msg}",
            )
        };
        bar.set_draw_target(ProgressDrawTarget::stderr());
        bar.set_style(
            ProgressStyle::with_template(template)
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        SessionProgress {
            bar: Some(bar),
            last_report: Instant::now(),
        }
    }
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl StageGuard {
    fn new(name: &str, spinner: Option<ProgressBar>) -> Self {
        Self {
            name: name.to_string(),
            start: Instant::now(),
            spinner,
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let message = format!("✔ {} ({})", self.name, format_duration(self.start.elapsed()));
        match &self.spinner {
            Some(spinner) => spinner.finish_with_message(message),
            None => eprintln!("{message}"),
        }
    }
}

pub struct SessionProgress {
    bar: Option<ProgressBar>,
    last_report: Instant,
}

impl SessionProgress {
    pub fn update(&mut self, sample: &SampleUpdate<'_>) {
        let message = format!("{} detections", sample.total_detections);
        match &self.bar {
            Some(bar) => {
                bar.set_position(sample.frames_read);
                bar.set_message(message);
            }
            None => {
                // Plain mode prints at most every few seconds.
                if self.last_report.elapsed() >= Duration::from_secs(5) {
                    self.last_report = Instant::now();
                    eprintln!("    {} frames, {}", sample.frames_read, message);
                }
            }
        }
    }

    pub fn finish(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
