//! Progress reporting

use crate::executor::TransferSummary;
use crate::types::{TransferResult, TransferStatus};
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::time::Instant;

/// Progress bar advanced once per transfer result
pub struct ProgressReporter {
    transfer_bar: ProgressBar,
    transfer_started_at: Option<Instant>,
    transferred_bytes: u64,
    failures: u64,
}

impl ProgressReporter {
    /// Create a progress reporter drawing to stderr
    pub fn new() -> Self {
        let transfer_bar = ProgressBar::new(0);
        if let Ok(style) =
            ProgressStyle::with_template("[{elapsed_precise}] {bar:30.green/white} {pos}/{len} tasks | {msg}")
        {
            transfer_bar.set_style(style.progress_chars("##-"));
        }
        Self::with_bar(transfer_bar)
    }

    /// Reporter that tracks counts but never draws
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    /// Visible or hidden depending on `enabled`
    pub fn for_terminal(enabled: bool) -> Self {
        if enabled {
            Self::new()
        } else {
            Self::hidden()
        }
    }

    fn with_bar(transfer_bar: ProgressBar) -> Self {
        Self {
            transfer_bar,
            transfer_started_at: None,
            transferred_bytes: 0,
            failures: 0,
        }
    }

    /// Reset counters and size the bar for `total_tasks` results.
    pub fn start_transfer(&mut self, total_tasks: u64) {
        self.transfer_started_at = Some(Instant::now());
        self.transferred_bytes = 0;
        self.failures = 0;
        self.transfer_bar.set_length(total_tasks);
        self.transfer_bar.set_position(0);
        self.transfer_bar
            .set_message("Connecting workers...".to_string());
    }

    /// Account one finished task and refresh the throughput display.
    pub fn record_result(&mut self, result: &TransferResult) {
        match result.status {
            TransferStatus::Done => {
                self.transferred_bytes = self.transferred_bytes.saturating_add(result.size);
            }
            TransferStatus::Failed => {
                self.failures += 1;
                let reason = result
                    .error
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                self.transfer_bar
                    .println(format!("FAILED {}: {}", result.task.from, reason));
            }
            TransferStatus::AlreadyExists => {}
        }
        self.transfer_bar.inc(1);

        let throughput = self.current_throughput_bps();
        self.transfer_bar.set_message(format!(
            "{} transferred | {}/s | {} failed",
            HumanBytes(self.transferred_bytes),
            HumanBytes(throughput),
            self.failures
        ));
    }

    /// Replace the live message with the final counts.
    pub fn finish_transfer(&self, summary: &TransferSummary) {
        self.transfer_bar.finish_with_message(format!(
            "{} done, {} already there, {} failed | {}",
            summary.done,
            summary.already_exists,
            summary.failed,
            HumanBytes(summary.total_bytes)
        ));
    }

    /// Leave the bar where it stopped
    pub fn abandon(&self) {
        self.transfer_bar.abandon_with_message("Transfer aborted".to_string());
    }

    fn current_throughput_bps(&self) -> u64 {
        match self.transfer_started_at {
            Some(started) => {
                let secs = started.elapsed().as_secs_f64();
                if secs > 0.0 {
                    (self.transferred_bytes as f64 / secs) as u64
                } else {
                    0
                }
            }
            None => 0,
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}
