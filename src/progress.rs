//! Progress reporting for apply runs

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use reconcile::{OperationStatus, ProgressCallback, ResourceResult};

/// One progress bar per stage, with failures printed above the bar
pub struct StageBars {
    bar: Option<ProgressBar>,
    hidden: bool,
}

impl StageBars {
    pub fn new(hidden: bool) -> Self {
        Self { bar: None, hidden }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:<22} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }
}

impl ProgressCallback for StageBars {
    fn on_stage_start(&mut self, label: &str, count: usize) {
        let bar = if self.hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(count as u64)
        };
        bar.set_style(Self::style());
        bar.set_prefix(label.to_string());
        self.bar = Some(bar);
    }

    fn on_operation_complete(&mut self, result: &ResourceResult) {
        let Some(bar) = &self.bar else {
            return;
        };
        let symbol = match result.status {
            OperationStatus::Success => result.status.symbol().green(),
            OperationStatus::Failed | OperationStatus::Partial => result.status.symbol().red(),
            OperationStatus::Skipped | OperationStatus::Cancelled => {
                result.status.symbol().yellow()
            }
        };
        bar.set_message(format!("{} {}", symbol, result.name));
        if result.status.is_failure() {
            bar.suspend(|| println!("  {}", result.line().red()));
        }
        bar.inc(1);
    }

    fn on_stage_complete(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}
