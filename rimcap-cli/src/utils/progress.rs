use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use rimcap::prelude::{EventSink, TestEvent};

use crate::utils::{LogLevel, log_level, pretty_bytes, pretty_rate};

const TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.white}] {bytes}/{total_bytes} (ETA {eta_precise}) {msg}";

/// Renders test events as one progress bar per phase.
#[derive(Default)]
pub struct ProgressReporter {
    bar: Option<ProgressBar>,
    phase: &'static str,
    total: u64,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn open(&mut self, phase: &'static str) {
        self.close();
        let pb = if log_level() == LogLevel::Quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(self.total)
        };
        pb.set_style(
            ProgressStyle::with_template(TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█░░"),
        );
        pb.set_message(phase);
        self.phase = phase;
        self.bar = Some(pb);
    }

    fn advance(&mut self, reached: u64, mb_per_sec: f64) {
        if let Some(pb) = &self.bar {
            pb.set_position(reached);
            pb.set_message(format!("{} {}", self.phase, pretty_rate(mb_per_sec)));
        }
    }

    fn close(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
            crate::log_verbose!("{} done: {}", self.phase, pretty_bytes(pb.position()));
        }
    }
}

impl EventSink for ProgressReporter {
    fn on_event(&mut self, event: &TestEvent) {
        match *event {
            TestEvent::InitializationStarted { total } => {
                self.total = total;
                crate::log_verbose!("Testing {}", pretty_bytes(total));
                self.open("initializing");
            }
            TestEvent::WriteStarted => self.open("writing"),
            TestEvent::VerifyStarted => self.open("verifying"),
            TestEvent::Initialized {
                reached,
                mb_per_sec,
            }
            | TestEvent::Written {
                reached,
                mb_per_sec,
            }
            | TestEvent::Verified {
                reached,
                mb_per_sec,
            } => self.advance(reached, mb_per_sec),
            TestEvent::CreateFailed { file_index, offset } => {
                self.close();
                crate::log_info!(
                    "{} Could not create test file #{} at {}",
                    "✗".red(),
                    file_index,
                    pretty_bytes(offset)
                );
            }
            TestEvent::WriteFailed { offset, size } => {
                self.close();
                crate::log_info!(
                    "{} Write failed at {} ({} bytes)",
                    "✗".red(),
                    pretty_bytes(offset),
                    size
                );
            }
            TestEvent::VerifyFailed { offset, size } => {
                self.close();
                crate::log_info!(
                    "{} Data mismatch at {} ({} bytes)",
                    "✗".red(),
                    pretty_bytes(offset),
                    size
                );
            }
            TestEvent::Canceled => {
                self.close();
                crate::log_info!("{} Test canceled", "!".yellow());
            }
            TestEvent::Succeeded | TestEvent::Failed(_) | TestEvent::Finished => self.close(),
        }
    }
}
